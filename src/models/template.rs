use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateCategory {
    Application,
    FollowUp,
    ThankYou,
}

impl FromStr for TemplateCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "application" => Ok(TemplateCategory::Application),
            "follow_up" => Ok(TemplateCategory::FollowUp),
            "thank_you" => Ok(TemplateCategory::ThankYou),
            other => Err(format!("Unknown template category: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: i64,
    pub name: String,
    pub subject: String,
    pub body: String,
    /// Derived from subject and body on every write.
    pub variables: Vec<String>,
    pub category: TemplateCategory,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateFields {
    pub name: String,
    pub subject: String,
    pub body: String,
    pub category: TemplateCategory,
}
