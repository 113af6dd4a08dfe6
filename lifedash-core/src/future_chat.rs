//! Prompt construction for the "future you" persona.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::LifedashError;
use crate::models::{Goal, LogEntry};
use crate::stats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Horizon {
    #[serde(rename = "6 months")]
    SixMonths,
    #[default]
    #[serde(rename = "1 year")]
    OneYear,
    #[serde(rename = "2 years")]
    TwoYears,
    #[serde(rename = "5 years")]
    FiveYears,
}

impl Horizon {
    pub const ALL: [Horizon; 4] = [
        Horizon::SixMonths,
        Horizon::OneYear,
        Horizon::TwoYears,
        Horizon::FiveYears,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Horizon::SixMonths => "6 months",
            Horizon::OneYear => "1 year",
            Horizon::TwoYears => "2 years",
            Horizon::FiveYears => "5 years",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Tone {
    #[default]
    #[serde(rename = "Supportive coach")]
    SupportiveCoach,
    #[serde(rename = "Tough love")]
    ToughLove,
    #[serde(rename = "Best friend")]
    BestFriend,
    #[serde(rename = "Stoic mentor")]
    StoicMentor,
}

impl Tone {
    pub const ALL: [Tone; 4] = [
        Tone::SupportiveCoach,
        Tone::ToughLove,
        Tone::BestFriend,
        Tone::StoicMentor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::SupportiveCoach => "Supportive coach",
            Tone::ToughLove => "Tough love",
            Tone::BestFriend => "Best friend",
            Tone::StoicMentor => "Stoic mentor",
        }
    }
}

macro_rules! label_enum_impls {
    ($ty:ident, $what:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = LifedashError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim();
                $ty::ALL
                    .into_iter()
                    .find(|v| v.as_str().eq_ignore_ascii_case(wanted))
                    .ok_or_else(|| {
                        LifedashError::validation(format!("Unknown {} '{}'", $what, wanted))
                    })
            }
        }
    };
}

label_enum_impls!(Horizon, "time horizon");
label_enum_impls!(Tone, "tone");

/// Goals and recent activity rendered as text, shared by the prompt and the
/// "Current goals & activity" panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatContext {
    pub goals_text: String,
    pub progress_text: String,
    pub window_days: i64,
}

impl ChatContext {
    pub fn build(goals: &[Goal], logs: &[LogEntry], today: NaiveDate, window_days: i64) -> Self {
        let summary = stats::recent_summary(logs, today, window_days);
        Self {
            goals_text: stats::goals_text(goals),
            progress_text: stats::progress_text(&summary, window_days),
            window_days,
        }
    }
}

/// Fail with the user-facing message when the page has nothing to reason from.
pub fn ensure_ready(goals: &[Goal], logs: &[LogEntry]) -> Result<(), LifedashError> {
    if goals.is_empty() {
        return Err(LifedashError::validation(
            "Please create at least one goal before using this page.",
        ));
    }
    if logs.is_empty() {
        return Err(LifedashError::validation(
            "Please add at least one log entry before chatting with future you.",
        ));
    }
    Ok(())
}

/// The two messages sent to the chat-completion API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FutureSelfPrompt {
    pub system: String,
    pub user: String,
}

impl FutureSelfPrompt {
    pub fn build(
        context: &ChatContext,
        horizon: Horizon,
        tone: Tone,
        question: &str,
    ) -> Result<Self, LifedashError> {
        if question.trim().is_empty() {
            return Err(LifedashError::validation("Enter a question first."));
        }

        let system = format!(
            "\nYou are the user's future self from {horizon}.\n\
             You reason only from their goals and recent activity.\n\
             Your tone is: {tone}.\n\
             Respond in 3–6 short paragraphs.\n"
        );

        let user = format!(
            "\nGoals:\n{}\n\nRecent progress:\n{}\n\nMy question to my future self:\n\"{}\"\n",
            context.goals_text, context.progress_text, question
        );

        Ok(Self { system, user })
    }
}
