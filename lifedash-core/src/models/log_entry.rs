use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A dated record of progress against a goal, referenced by goal name.
///
/// `date` keeps the text exactly as stored so that a hand-edited file with an
/// odd value still loads; use [`LogEntry::parsed_date`] for arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(rename = "Goal")]
    pub goal: String,
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Note", default)]
    pub note: String,
}

impl LogEntry {
    pub fn new(goal: &str, date: NaiveDate, note: &str) -> Self {
        Self {
            goal: goal.to_string(),
            date: date.format("%Y-%m-%d").to_string(),
            note: note.trim().to_string(),
        }
    }

    /// Accepts `YYYY-MM-DD` or an ISO date-time, keeping the date part.
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        let raw = self.date.trim();
        if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Some(d);
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|dt| dt.date())
    }
}
