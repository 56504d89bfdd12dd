use serde::{Deserialize, Serialize};

/// Sender identity used when composing emails. Stored as a single document,
/// last write wins. The CV itself is never stored, only its name and URL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub cv_name: Option<String>,
    pub cv_url: Option<String>,
    pub signature: String,
}

impl UserProfile {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}
