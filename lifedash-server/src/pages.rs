//! Server-rendered HTML for the form-driven UI.
//!
//! Pages are plain strings built from the same stats/context types the JSON
//! API returns. All user text goes through [`escape`].

use std::fmt::Write;

use chrono::NaiveDate;
use lifedash_core::future_chat::{ChatContext, Horizon, Tone};
use lifedash_core::stats::{Dashboard, Overview};
use lifedash_core::{Category, ChatMessage, Goal, LogEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nav {
    Home,
    Goals,
    Log,
    Dashboard,
    Chat,
}

const NAV_ITEMS: [(Nav, &str, &str); 5] = [
    (Nav::Home, "/", "Home"),
    (Nav::Goals, "/goals", "Set Goals"),
    (Nav::Log, "/log", "Log Today"),
    (Nav::Dashboard, "/dashboard", "Dashboard"),
    (Nav::Chat, "/chat", "Chat with Future You"),
];

/// Inline message shown above page content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flash {
    Success(String),
    Info(String),
    Warning(String),
    Error(String),
}

impl Flash {
    fn render(&self) -> String {
        let (class, text) = match self {
            Flash::Success(t) => ("success", t),
            Flash::Info(t) => ("info", t),
            Flash::Warning(t) => ("warning", t),
            Flash::Error(t) => ("error", t),
        };
        format!("<div class=\"flash {}\">{}</div>\n", class, escape(text))
    }
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const STYLE: &str = "body{font-family:system-ui,sans-serif;margin:0;display:flex;color:#222}\
nav{width:220px;min-height:100vh;background:#f3f4f6;padding:1rem}\
nav a{display:block;padding:.4rem .6rem;color:#333;text-decoration:none;border-radius:4px}\
nav a.active{background:#d1fae5;font-weight:600}\
main{flex:1;padding:1.5rem 2rem;max-width:960px}\
.metrics{display:flex;gap:1rem}.metric{flex:1;background:#f9fafb;padding:1rem;border-radius:6px}\
.metric .value{font-size:1.8rem;font-weight:600}\
.flash{padding:.6rem .9rem;border-radius:4px;margin:.6rem 0}\
.success{background:#d1fae5}.info{background:#dbeafe}.warning{background:#fef3c7}.error{background:#fee2e2}\
.caption{color:#6b7280;font-size:.9rem}\
table{border-collapse:collapse;width:100%}td,th{border-bottom:1px solid #e5e7eb;padding:.35rem;text-align:left}\
.bar{background:#34d399;height:1rem;border-radius:2px}\
form label{display:block;margin:.5rem 0 .2rem}input,select,textarea{width:100%;padding:.3rem}\
.cols{display:flex;gap:2rem}.cols>div:first-child{flex:1}.cols>div:last-child{flex:2}";

fn layout(title: &str, active: Nav, flashes: &[Flash], body: &str) -> String {
    let mut nav = String::new();
    for (item, href, label) in NAV_ITEMS {
        let class = if item == active { " class=\"active\"" } else { "" };
        let _ = writeln!(nav, "<a href=\"{}\"{}>{}</a>", href, class, label);
    }

    let flashes: String = flashes.iter().map(Flash::render).collect();

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title} · Lifedash</title>\n<style>{STYLE}</style>\n</head>\n<body>\n\
         <nav><h3>Navigation</h3>\n{nav}</nav>\n<main>\n{flashes}{body}</main>\n</body>\n</html>\n",
        title = escape(title),
    )
}

fn metric(label: &str, value: impl std::fmt::Display) -> String {
    format!(
        "<div class=\"metric\"><div class=\"caption\">{}</div><div class=\"value\">{}</div></div>",
        escape(label),
        escape(&value.to_string())
    )
}

fn category_list(categories: &[Category]) -> String {
    categories
        .iter()
        .map(Category::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn home(overview: &Overview, flashes: &[Flash]) -> String {
    let mut body = String::from(
        "<h1>🌱 Life Progress Dashboard</h1>\n\
         <p>Welcome. This is your space to design the person you are becoming.<br>\
         Set goals, log small steps, and let future you react to your progress.</p>\n\
         <h2>Today at a glance</h2>\n",
    );

    let _ = writeln!(
        body,
        "<div class=\"metrics\">{}{}{}</div>",
        metric("Active goals", overview.active_goals),
        metric("Total log entries", overview.total_logs),
        metric("Last logged day", overview.last_logged.label()),
    );

    if overview.categories.is_empty() {
        body.push_str(
            "<p class=\"caption\">Goal areas will appear here once you create your first goal.</p>\n",
        );
    } else {
        let _ = writeln!(
            body,
            "<p class=\"caption\">Goal areas: {}</p>",
            escape(&category_list(&overview.categories))
        );
    }

    body.push_str(
        "<hr>\n<h2>How this app works</h2>\n<dl>\n\
         <dt><b>Set Goals</b></dt><dd>Define what you want to work on in areas like career, \
         education, finance, health, hobbies, and relationships</dd>\n\
         <dt><b>Log Today</b></dt><dd>Record what you actually did each day so you can see your real habits</dd>\n\
         <dt><b>Dashboard</b></dt><dd>Track how often you show up for each goal and see where your energy is going</dd>\n\
         <dt><b>Chat with Future You</b></dt><dd>Talk to a future version of yourself who reacts to \
         your data, not just to your words</dd>\n</dl>\n",
    );
    body.push_str(
        &Flash::Info(
            "Tip: Start by creating one small, easy goal in the Set Goals section. Future you will notice."
                .to_string(),
        )
        .render(),
    );

    layout("Home", Nav::Home, flashes, &body)
}

pub fn goals(goals: &[Goal], flashes: &[Flash]) -> String {
    let mut body = String::from(
        "<h1>🎯 Set Your Goals</h1>\n\
         <p>Define the habits and routines that build a balanced and meaningful life.<br>\
         Small steps today shape future you 🌱</p>\n\
         <h2>Add a New Goal</h2>\n\
         <form method=\"post\" action=\"/goals\">\n\
         <label for=\"name\">Goal Name</label>\
         <input id=\"name\" name=\"name\" placeholder=\"Run a marathon\">\n\
         <label for=\"category\">Category</label><select id=\"category\" name=\"category\">\n",
    );
    for category in Category::ALL {
        let _ = writeln!(body, "<option>{}</option>", category);
    }
    body.push_str(
        "</select>\n<label for=\"description\">Why is this goal important</label>\
         <input id=\"description\" name=\"description\" \
         placeholder=\"I want more energy and a healthier routine\">\n\
         <p><button type=\"submit\">➕ Add Goal</button></p>\n</form>\n<hr>\n\
         <h2>Your Current Goals</h2>\n",
    );

    if goals.is_empty() {
        body.push_str(
            &Flash::Info("You do not have any goals yet. Add one above to get started.".to_string())
                .render(),
        );
    } else {
        body.push_str("<table>\n");
        for (index, goal) in goals.iter().enumerate() {
            let description = if goal.description.is_empty() {
                String::new()
            } else {
                format!("<div class=\"caption\">{}</div>", escape(&goal.description))
            };
            let _ = writeln!(
                body,
                "<tr><td><b>{}</b>{}</td><td>Category: <code>{}</code></td>\
                 <td><form method=\"post\" action=\"/goals/{}/delete\">\
                 <button type=\"submit\">Delete</button></form></td></tr>",
                escape(&goal.name),
                description,
                goal.category,
                index
            );
        }
        body.push_str(
            "</table>\n<p class=\"caption\">Tip: Good goals are simple, clear, and repeatable.</p>\n",
        );
    }

    layout("Set Goals", Nav::Goals, flashes, &body)
}

pub fn log_today(
    goals: &[Goal],
    recent: &[LogEntry],
    today: NaiveDate,
    flashes: &[Flash],
) -> String {
    if goals.is_empty() {
        let notice = Flash::Info(
            "You do not have any goals yet. Go to Set Goals to create one before logging progress."
                .to_string(),
        );
        return layout("Log Today", Nav::Log, flashes, &notice.render());
    }

    let mut body = String::from(
        "<h1>📝 Log Today's Progress</h1>\n\
         <p>Record what you did today for your goals.<br>\
         Future-you will look back at these small steps 🌱</p>\n\
         <h2>Add a New Entry</h2>\n\
         <form method=\"post\" action=\"/log\">\n\
         <label for=\"goal\">Which goal did you work on today</label>\
         <select id=\"goal\" name=\"goal\">\n",
    );
    for goal in goals {
        let name = escape(&goal.name);
        let _ = writeln!(body, "<option value=\"{}\">{}</option>", name, name);
    }
    let _ = write!(
        body,
        "</select>\n<label for=\"date\">Date</label>\
         <input id=\"date\" type=\"date\" name=\"date\" value=\"{}\">\n\
         <label for=\"note\">Short note</label><input id=\"note\" name=\"note\" \
         placeholder=\"Easy run, heavy day at work, studied grammar, etc.\">\n\
         <p><button type=\"submit\">💾 Save Log</button></p>\n</form>\n<hr>\n\
         <h2>Recent Entries</h2>\n",
        today.format("%Y-%m-%d")
    );

    if recent.is_empty() {
        body.push_str(
            &Flash::Info("No progress logged yet. Add your first entry above.".to_string()).render(),
        );
    } else {
        body.push_str("<table>\n<tr><th>Goal</th><th>Date</th><th>Note</th></tr>\n");
        for entry in recent {
            let _ = writeln!(
                body,
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape(&entry.goal),
                escape(&entry.date),
                escape(&entry.note)
            );
        }
        body.push_str(
            "</table>\n<p class=\"caption\">These recent logs will feed your dashboard and future-you chat.</p>\n",
        );
    }

    layout("Log Today", Nav::Log, flashes, &body)
}

/// `dashboard` is `Err(notice)` when there are no goals or no logs yet.
pub fn dashboard(dashboard: Result<&Dashboard, &str>, flashes: &[Flash]) -> String {
    let mut body = String::from("<h1>📊 Your Progress Overview</h1>\n");

    let d = match dashboard {
        Ok(d) => d,
        Err(notice) => {
            body.push_str(&Flash::Info(notice.to_string()).render());
            return layout("Dashboard", Nav::Dashboard, flashes, &body);
        }
    };

    let _ = writeln!(
        body,
        "<div class=\"metrics\">{}{}{}</div>\n<p class=\"caption\">Goal areas: {}</p>\n<hr>",
        metric("Active goals", d.active_goals),
        metric("Total log entries", d.total_logs),
        metric("Days with activity", d.days_with_activity),
        escape(&category_list(&d.categories)),
    );

    body.push_str(
        "<h2>Progress by Goal</h2>\n<table>\n\
         <tr><th>Goal</th><th>Category</th><th>Entries</th><th>Last Activity</th></tr>\n",
    );
    for row in &d.progress {
        let last = row
            .last_activity
            .map(|day| day.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        let _ = writeln!(
            body,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&row.goal),
            row.category,
            row.entries,
            last
        );
    }
    body.push_str(
        "</table>\n<p class=\"caption\">Entries is the number of times you logged progress for each goal.</p>\n\
         <hr>\n<h2>Where Your Effort Has Gone</h2>\n<table>\n",
    );

    let max = d.effort.iter().map(|(_, n)| *n).max().unwrap_or(0).max(1);
    for (goal, entries) in &d.effort {
        let width = entries * 100 / max;
        let _ = writeln!(
            body,
            "<tr><td style=\"width:30%\">{}</td><td><div class=\"bar\" style=\"width:{}%\"></div></td>\
             <td style=\"width:3rem\">{}</td></tr>",
            escape(goal),
            width,
            entries
        );
    }
    body.push_str(
        "</table>\n<p class=\"caption\">This chart shows how often you have shown up for each goal so far.</p>\n",
    );

    layout("Dashboard", Nav::Dashboard, flashes, &body)
}

pub struct ChatView<'a> {
    pub history: &'a [ChatMessage],
    /// `Err(notice)` when there is not enough data to chat yet.
    pub context: Result<&'a ChatContext, &'a str>,
    pub chat_available: bool,
    pub horizon: Horizon,
    pub tone: Tone,
}

fn options<T: Copy + PartialEq + std::fmt::Display>(all: &[T], selected: T) -> String {
    all.iter()
        .map(|v| {
            let sel = if *v == selected { " selected" } else { "" };
            format!("<option{}>{}</option>", sel, v)
        })
        .collect()
}

pub fn chat(view: &ChatView<'_>, flashes: &[Flash]) -> String {
    let mut body = String::from("<h1>🧭 Chat with Future You</h1>\n");

    if !view.chat_available {
        body.push_str(
            &Flash::Error("No OPENAI_API_KEY found in environment or configuration.".to_string())
                .render(),
        );
        return layout("Chat with Future You", Nav::Chat, flashes, &body);
    }

    let context = match view.context {
        Ok(c) => c,
        Err(notice) => {
            body.push_str(&Flash::Info(notice.to_string()).render());
            return layout("Chat with Future You", Nav::Chat, flashes, &body);
        }
    };

    let _ = write!(
        body,
        "<div class=\"cols\">\n<div>\n<h2>Ask Future You</h2>\n\
         <form method=\"post\" action=\"/chat/ask\">\n\
         <label for=\"horizon\">Time horizon</label><select id=\"horizon\" name=\"horizon\">{}</select>\n\
         <label for=\"tone\">Tone of future you</label><select id=\"tone\" name=\"tone\">{}</select>\n\
         <label for=\"question\">Your question</label>\
         <textarea id=\"question\" name=\"question\" rows=\"4\" \
         placeholder=\"Example: Am I on the right track?\"></textarea>\n\
         <p><button type=\"submit\">✨ Talk to Future Me</button></p>\n</form>\n\
         <form method=\"post\" action=\"/chat/clear\"><button type=\"submit\">🧹 Clear conversation</button></form>\n\
         <details><summary>Current goals &amp; activity</summary>\n\
         <p><b>Goals:</b></p><pre>{}</pre>\n<p><b>Last {} days:</b></p><pre>{}</pre>\n</details>\n\
         </div>\n<div>\n<h2>Conversation</h2>\n",
        options(&Horizon::ALL, view.horizon),
        options(&Tone::ALL, view.tone),
        escape(if context.goals_text.is_empty() { "No goals." } else { context.goals_text.as_str() }),
        context.window_days,
        escape(&context.progress_text),
    );

    if view.history.is_empty() {
        body.push_str(&Flash::Info("Your conversation will appear here.".to_string()).render());
    } else {
        for message in view.history {
            let _ = writeln!(
                body,
                "<p><b>{}:</b> {}</p>",
                message.speaker(),
                escape(&message.content).replace('\n', "<br>")
            );
        }
    }
    body.push_str("</div>\n</div>\n");

    layout("Chat with Future You", Nav::Chat, flashes, &body)
}
