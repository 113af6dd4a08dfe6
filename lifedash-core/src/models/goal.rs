use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LifedashError;

/// Life area a goal belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Career,
    Education,
    Finance,
    Health,
    Hobbies,
    Relationships,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Career,
        Category::Education,
        Category::Finance,
        Category::Health,
        Category::Hobbies,
        Category::Relationships,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Career => "Career",
            Category::Education => "Education",
            Category::Finance => "Finance",
            Category::Health => "Health",
            Category::Hobbies => "Hobbies",
            Category::Relationships => "Relationships",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = LifedashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| LifedashError::validation(format!("Unknown category '{}'", wanted)))
    }
}

/// A user-defined objective. Field names on disk follow the `goals.json`
/// layout: `Goal`, `Category`, `Description`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    #[serde(rename = "Goal")]
    pub name: String,
    #[serde(rename = "Category")]
    pub category: Category,
    #[serde(rename = "Description", default)]
    pub description: String,
}

impl Goal {
    pub fn new(
        name: &str,
        category: Category,
        description: Option<&str>,
    ) -> Result<Self, LifedashError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LifedashError::validation(
                "Please enter a goal name before adding.",
            ));
        }

        Ok(Self {
            name: name.to_string(),
            category,
            description: description.map(str::trim).unwrap_or_default().to_string(),
        })
    }
}
