use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::candidature::CandidatureStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub id: i64,
    pub candidature_id: i64,
    pub previous_status: Option<CandidatureStatus>,
    pub new_status: CandidatureStatus,
    pub changed_at: DateTime<Utc>,
}
