use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::future_chat::{Horizon, Tone};
use crate::models::Category;

/// Every operation the UI and the JSON API can ask of the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum LifedashRequest {
    Health,
    ListGoals,
    AddGoal {
        name: String,
        category: Category,
        #[serde(default)]
        description: Option<String>,
    },
    DeleteGoal {
        index: usize,
    },
    RecentLogs {
        limit: Option<usize>,
    },
    AddLog {
        goal: String,
        /// Defaults to today.
        date: Option<NaiveDate>,
        #[serde(default)]
        note: Option<String>,
    },
    Overview,
    Dashboard,
    ChatState,
    AskFutureSelf {
        question: String,
        #[serde(default)]
        horizon: Horizon,
        #[serde(default)]
        tone: Tone,
    },
    ClearChat,
}

/// Failure classes; the HTTP layer maps each to a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad input, e.g. a blank goal name.
    Invalid,
    NotFound,
    /// The page has nothing to work with yet (no goals, no logs, no API key).
    Precondition,
    /// The chat-completion API failed.
    Upstream,
    Internal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifedashResponse {
    pub status: String,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    pub version: String,
}

impl LifedashResponse {
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            status: "ok".to_string(),
            data: Some(data),
            error: None,
            kind: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn err(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            data: None,
            error: Some(msg.into()),
            kind: Some(kind),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}
