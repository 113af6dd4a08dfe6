//! lifedash — terminal client for the Lifedash goal tracker
//!
//! Talks to a running `lifedash-server` over its JSON API.
//!
//! # Subcommands
//! - `status`                                         — server health
//! - `goals`                                          — list goals with their index
//! - `add-goal <name> --category <c> [--why <text>]`  — create a goal
//! - `delete-goal <index>`                            — remove a goal
//! - `log <goal> [--date YYYY-MM-DD] [--note <text>]` — record progress
//! - `recent [-n <limit>]`                            — most recent entries
//! - `dashboard`                                      — per-goal statistics
//! - `ask <question> [--horizon] [--tone]`            — chat with future you
//! - `history` / `clear-chat`                         — show / reset the conversation

use clap::{Parser, Subcommand};
use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};

const DEFAULT_SERVER: &str = "http://127.0.0.1:8787";
const DEFAULT_LIMIT: usize = 20;

// Labels as the server spells them.
const CATEGORIES: [&str; 6] = [
    "Career",
    "Education",
    "Finance",
    "Health",
    "Hobbies",
    "Relationships",
];
const HORIZONS: [&str; 4] = ["6 months", "1 year", "2 years", "5 years"];
const TONES: [&str; 4] = ["Supportive coach", "Tough love", "Best friend", "Stoic mentor"];

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(name = "lifedash", version, about = "Lifedash goal tracker — terminal client")]
struct Cli {
    /// Lifedash server URL (overrides LIFEDASH_HTTP_URL env var)
    #[arg(long, env = "LIFEDASH_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    /// Print the raw JSON response instead of formatted text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show Lifedash server status
    Status,

    /// List goals
    Goals,

    /// Add a goal
    AddGoal {
        name: String,

        #[arg(short, long, value_parser = parse_category)]
        category: String,

        /// Why this goal is important
        #[arg(long)]
        why: Option<String>,
    },

    /// Delete a goal by its index (see `goals`)
    DeleteGoal { index: usize },

    /// Log progress for a goal (date defaults to today on the server)
    Log {
        goal: String,

        #[arg(short, long)]
        date: Option<String>,

        #[arg(short, long)]
        note: Option<String>,
    },

    /// Show the most recent log entries
    Recent {
        #[arg(short = 'n', long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,
    },

    /// Show progress statistics
    Dashboard,

    /// Ask your future self a question
    Ask {
        question: String,

        #[arg(long, default_value = "1 year", value_parser = parse_horizon)]
        horizon: String,

        #[arg(long, default_value = "Supportive coach", value_parser = parse_tone)]
        tone: String,
    },

    /// Show the conversation with future you
    History,

    /// Clear the conversation with future you
    ClearChat,
}

/// Case-insensitive match onto one of the server's labels.
fn pick_label(options: &[&str], input: &str) -> Result<String, String> {
    let input = input.trim();
    options
        .iter()
        .find(|o| o.eq_ignore_ascii_case(input))
        .map(|o| o.to_string())
        .ok_or_else(|| format!("expected one of: {}", options.join(", ")))
}

fn parse_category(s: &str) -> Result<String, String> {
    pick_label(&CATEGORIES, s)
}

fn parse_horizon(s: &str) -> Result<String, String> {
    pick_label(&HORIZONS, s)
}

fn parse_tone(s: &str) -> Result<String, String> {
    pick_label(&TONES, s)
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct GoalRow {
    #[serde(rename = "Goal")]
    pub name: String,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Description", default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct LogRow {
    #[serde(rename = "Goal")]
    pub goal: String,
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Note", default)]
    pub note: String,
}

#[derive(Debug, Deserialize)]
pub struct ProgressRow {
    pub goal: String,
    pub category: String,
    pub entries: usize,
    pub last_activity: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DashboardResponse {
    pub active_goals: usize,
    pub total_logs: usize,
    pub days_with_activity: usize,
    pub categories: Vec<String>,
    pub progress: Vec<ProgressRow>,
}

#[derive(Debug, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

// ============================================================================
// Formatting
// ============================================================================

pub fn format_goals(goals: &[GoalRow]) -> String {
    if goals.is_empty() {
        return "You do not have any goals yet. Add one with `lifedash add-goal`.".to_string();
    }

    goals
        .iter()
        .enumerate()
        .map(|(i, g)| {
            let mut line = format!("[{}] {} ({})", i, g.name, g.category);
            if !g.description.is_empty() {
                line.push_str(&format!("\n    {}", g.description));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_recent(entries: &[LogRow]) -> String {
    if entries.is_empty() {
        return "No progress logged yet.".to_string();
    }

    let width = entries.iter().map(|e| e.goal.chars().count()).max().unwrap_or(0);
    entries
        .iter()
        .map(|e| format!("{}  {:<width$}  {}", e.date, e.goal, e.note, width = width))
        .map(|l| l.trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_dashboard(d: &DashboardResponse) -> String {
    let mut out = format!(
        "Active goals:       {}\nTotal log entries:  {}\nDays with activity: {}\nGoal areas:         {}\n",
        d.active_goals,
        d.total_logs,
        d.days_with_activity,
        d.categories.join(", ")
    );

    let max = d.progress.iter().map(|p| p.entries).max().unwrap_or(0).max(1);
    for p in &d.progress {
        let bar = "█".repeat((p.entries * 30).div_ceil(max));
        out.push_str(&format!(
            "\n{:<24} {:<14} {:>4}  {:<10}  {}",
            truncate(&p.goal, 24),
            p.category,
            p.entries,
            p.last_activity.as_deref().unwrap_or("-"),
            bar
        ));
    }
    out
}

pub fn format_history(turns: &[ChatTurn]) -> String {
    if turns.is_empty() {
        return "Your conversation will appear here.".to_string();
    }

    turns
        .iter()
        .map(|t| {
            let speaker = if t.role == "user" { "You" } else { "Future You" };
            format!("{}: {}", speaker, t.content)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

struct Api {
    client: Client,
    server: String,
}

impl Api {
    fn new(server: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            // future-you replies can take a while
            .timeout(std::time::Duration::from_secs(120))
            .build()?;
        Ok(Self {
            client,
            server: server.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.server, path)
    }

    /// Send and return the JSON body; non-2xx becomes an error with the server's message.
    fn call(&self, req: RequestBuilder) -> anyhow::Result<Value> {
        let resp = req
            .send()
            .map_err(|e| anyhow::anyhow!("connection failed to {}: {}", self.server, e))?;

        let status = resp.status();
        let body: Value = resp.json().unwrap_or(Value::Null);

        if !status.is_success() {
            let msg = body["error"].as_str().unwrap_or("no details");
            anyhow::bail!("server returned {}: {}", status, msg);
        }
        Ok(body)
    }

    fn get(&self, path: &str) -> anyhow::Result<Value> {
        self.call(self.client.get(self.url(path)))
    }

    fn post(&self, path: &str, body: Value) -> anyhow::Result<Value> {
        self.call(self.client.post(self.url(path)).json(&body))
    }

    fn delete(&self, path: &str) -> anyhow::Result<Value> {
        self.call(self.client.delete(self.url(path)))
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let api = Api::new(&cli.server)?;

    let body = match &cli.command {
        Commands::Status => api.get("/health")?,
        Commands::Goals => api.get("/goals")?,
        Commands::AddGoal {
            name,
            category,
            why,
        } => api.post(
            "/goals",
            json!({ "name": name, "category": category, "description": why }),
        )?,
        Commands::DeleteGoal { index } => api.delete(&format!("/goals/{}", index))?,
        Commands::Log { goal, date, note } => {
            if let Some(d) = date {
                chrono::NaiveDate::parse_from_str(d, "%Y-%m-%d")
                    .map_err(|_| anyhow::anyhow!("'{}' is not a valid date (expected YYYY-MM-DD)", d))?;
            }
            api.post("/logs", json!({ "goal": goal, "date": date, "note": note }))?
        }
        Commands::Recent { limit } => api.get(&format!("/logs?limit={}", limit))?,
        Commands::Dashboard => api.get("/dashboard")?,
        Commands::Ask {
            question,
            horizon,
            tone,
        } => api.post(
            "/chat",
            json!({ "question": question, "horizon": horizon, "tone": tone }),
        )?,
        Commands::History => api.get("/chat")?,
        Commands::ClearChat => api.delete("/chat")?,
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    match cli.command {
        Commands::Status => {
            println!("Lifedash server: {}", body["status"].as_str().unwrap_or("unknown"));
            println!("Version:         {}", body["version"].as_str().unwrap_or("?"));
            println!("Data dir:        {}", body["data_dir"].as_str().unwrap_or("?"));
            println!("Goals / logs:    {} / {}", body["goals"], body["logs"]);
            println!(
                "Chat backend:    {}",
                body["chat_backend"].as_str().unwrap_or("disabled (no API key)")
            );
        }
        Commands::Goals => {
            let goals: Vec<GoalRow> = serde_json::from_value(body["goals"].clone())?;
            println!("{}", format_goals(&goals));
        }
        Commands::Recent { .. } => {
            let entries: Vec<LogRow> = serde_json::from_value(body["entries"].clone())?;
            println!("{}", format_recent(&entries));
        }
        Commands::Dashboard => {
            let dashboard: DashboardResponse = serde_json::from_value(body)?;
            println!("{}", format_dashboard(&dashboard));
        }
        Commands::Ask { .. } => {
            println!("Future You: {}", body["answer"].as_str().unwrap_or_default());
        }
        Commands::History => {
            if let Some(notice) = body["notice"].as_str() {
                eprintln!("{}", notice);
            }
            let turns: Vec<ChatTurn> = serde_json::from_value(body["history"].clone())?;
            println!("{}", format_history(&turns));
        }
        Commands::DeleteGoal { .. } => {
            println!("Deleted goal '{}'", body["deleted"]["Goal"].as_str().unwrap_or("?"));
        }
        Commands::ClearChat => println!("Conversation cleared."),
        Commands::AddGoal { .. } | Commands::Log { .. } => {
            println!("{}", body["message"].as_str().unwrap_or("Done."));
        }
    }

    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("lifedash: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================
