//! Progress aggregation over goals and log entries.
//!
//! Everything here is pure: callers pass the current collections and, where a
//! recency window matters, today's date.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::models::{Category, Goal, LogEntry};

pub const DEFAULT_RECENT_LIMIT: usize = 20;
pub const DEFAULT_WINDOW_DAYS: i64 = 30;

/// Most recent logged day, as shown on the home page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "date", rename_all = "snake_case")]
pub enum LastLogged {
    NoLogs,
    Day(NaiveDate),
    /// At least one stored date could not be parsed.
    Unknown,
}

impl LastLogged {
    pub fn label(&self) -> String {
        match self {
            LastLogged::NoLogs => "No logs yet".to_string(),
            LastLogged::Day(d) => d.format("%Y-%m-%d").to_string(),
            LastLogged::Unknown => "Unknown".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub active_goals: usize,
    pub total_logs: usize,
    pub last_logged: LastLogged,
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalProgress {
    pub goal: String,
    pub category: Category,
    pub entries: usize,
    pub last_activity: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub active_goals: usize,
    pub total_logs: usize,
    pub days_with_activity: usize,
    pub categories: Vec<Category>,
    pub progress: Vec<GoalProgress>,
    /// Bar-chart series: entries per goal, in `progress` order.
    pub effort: Vec<(String, usize)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentGoalActivity {
    pub goal: String,
    pub entries: usize,
    pub last_activity: NaiveDate,
}

/// Distinct goal categories, sorted.
pub fn categories(goals: &[Goal]) -> Vec<Category> {
    goals
        .iter()
        .map(|g| g.category)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn overview(goals: &[Goal], logs: &[LogEntry]) -> Overview {
    let last_logged = if logs.is_empty() {
        LastLogged::NoLogs
    } else {
        logs.iter()
            .map(LogEntry::parsed_date)
            .collect::<Option<Vec<_>>>()
            .and_then(|dates| dates.into_iter().max())
            .map_or(LastLogged::Unknown, LastLogged::Day)
    };

    Overview {
        active_goals: goals.len(),
        total_logs: logs.len(),
        last_logged,
        categories: categories(goals),
    }
}

/// Entries newest first, at most `limit`. Entries with unparseable dates sort last.
pub fn recent_entries(logs: &[LogEntry], limit: usize) -> Vec<LogEntry> {
    let mut sorted: Vec<&LogEntry> = logs.iter().collect();
    // Option<NaiveDate> orders None first, so reversing puts it last.
    sorted.sort_by(|a, b| b.parsed_date().cmp(&a.parsed_date()));
    sorted.into_iter().take(limit).cloned().collect()
}

/// Per-goal totals for the dashboard.
///
/// Logs are joined to goals by name. A log whose goal no longer exists does
/// not appear in the table; a goal name defined under two categories yields a
/// row for each.
pub fn goal_progress(goals: &[Goal], logs: &[LogEntry]) -> Vec<GoalProgress> {
    let mut categories_by_name: BTreeMap<&str, BTreeSet<Category>> = BTreeMap::new();
    for goal in goals {
        categories_by_name
            .entry(goal.name.as_str())
            .or_default()
            .insert(goal.category);
    }

    let mut grouped: BTreeMap<(Category, &str), (usize, Option<NaiveDate>)> = BTreeMap::new();
    for log in logs {
        let Some(cats) = categories_by_name.get(log.goal.as_str()) else {
            continue;
        };
        let date = log.parsed_date();
        for &category in cats {
            let slot = grouped.entry((category, log.goal.as_str())).or_default();
            slot.0 += 1;
            slot.1 = slot.1.max(date);
        }
    }

    grouped
        .into_iter()
        .map(|((category, goal), (entries, last_activity))| GoalProgress {
            goal: goal.to_string(),
            category,
            entries,
            last_activity,
        })
        .collect()
}

pub fn dashboard(goals: &[Goal], logs: &[LogEntry]) -> Dashboard {
    let progress = goal_progress(goals, logs);
    let effort = progress
        .iter()
        .map(|p| (p.goal.clone(), p.entries))
        .collect();
    let days_with_activity = logs
        .iter()
        .filter_map(LogEntry::parsed_date)
        .collect::<BTreeSet<_>>()
        .len();

    Dashboard {
        active_goals: goals.len(),
        total_logs: logs.len(),
        days_with_activity,
        categories: categories(goals),
        progress,
        effort,
    }
}

/// Activity per goal for logs dated on or after `today - window_days`,
/// sorted by goal name.
pub fn recent_summary(
    logs: &[LogEntry],
    today: NaiveDate,
    window_days: i64,
) -> Vec<RecentGoalActivity> {
    // Negative windows count as today only; windows past the calendar start cover everything.
    let cutoff = today
        .checked_sub_days(Days::new(window_days.max(0).unsigned_abs()))
        .unwrap_or(NaiveDate::MIN);

    let mut grouped: BTreeMap<&str, (usize, NaiveDate)> = BTreeMap::new();
    for log in logs {
        let Some(date) = log.parsed_date() else {
            continue;
        };
        if date < cutoff {
            continue;
        }
        grouped
            .entry(log.goal.as_str())
            .and_modify(|slot| {
                slot.0 += 1;
                slot.1 = slot.1.max(date);
            })
            .or_insert((1, date));
    }

    grouped
        .into_iter()
        .map(|(goal, (entries, last_activity))| RecentGoalActivity {
            goal: goal.to_string(),
            entries,
            last_activity,
        })
        .collect()
}

/// Goals as a bullet list for the prompt and the context panel.
pub fn goals_text(goals: &[Goal]) -> String {
    goals
        .iter()
        .map(|g| {
            let mut line = format!("- {} (Category: {})", g.name, g.category);
            if !g.description.is_empty() {
                line.push_str(" — ");
                line.push_str(&g.description);
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn progress_text(summary: &[RecentGoalActivity], window_days: i64) -> String {
    if summary.is_empty() {
        return format!("No activity logged in the last {} days.", window_days);
    }

    summary
        .iter()
        .map(|row| {
            format!(
                "- {}: {} log(s), last activity {}.",
                row.goal,
                row.entries,
                row.last_activity.format("%Y-%m-%d")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
