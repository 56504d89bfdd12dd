use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CandidatureStatus {
    #[default]
    Draft,
    Sent,
    FollowedUp,
    ResponseReceived,
    Rejected,
    InterviewOffered,
    Accepted,
}

impl CandidatureStatus {
    pub const ALL: [CandidatureStatus; 7] = [
        CandidatureStatus::Draft,
        CandidatureStatus::Sent,
        CandidatureStatus::FollowedUp,
        CandidatureStatus::ResponseReceived,
        CandidatureStatus::Rejected,
        CandidatureStatus::InterviewOffered,
        CandidatureStatus::Accepted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CandidatureStatus::Draft => "draft",
            CandidatureStatus::Sent => "sent",
            CandidatureStatus::FollowedUp => "followed_up",
            CandidatureStatus::ResponseReceived => "response_received",
            CandidatureStatus::Rejected => "rejected",
            CandidatureStatus::InterviewOffered => "interview_offered",
            CandidatureStatus::Accepted => "accepted",
        }
    }

    /// Counted as a success in the statistics.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            CandidatureStatus::Accepted | CandidatureStatus::InterviewOffered
        )
    }

    /// The company has answered in some way.
    pub fn has_response(&self) -> bool {
        matches!(
            self,
            CandidatureStatus::ResponseReceived
                | CandidatureStatus::InterviewOffered
                | CandidatureStatus::Accepted
                | CandidatureStatus::Rejected
        )
    }
}

impl fmt::Display for CandidatureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CandidatureStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CandidatureStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Unknown candidature status: {}", s))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidature {
    pub id: i64,
    pub company: String,
    pub contact_name: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub job_title: String,
    pub submitted_on: NaiveDate,
    pub status: CandidatureStatus,
    pub notes: Option<String>,
    #[serde(default)]
    pub last_email_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The user-editable part of a candidature; updates replace all of it.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidatureFields {
    pub company: String,
    pub contact_name: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub job_title: String,
    pub submitted_on: NaiveDate,
    /// `None` keeps the current status, or starts as draft on insert.
    pub status: Option<CandidatureStatus>,
    pub notes: Option<String>,
}

impl Candidature {
    pub fn fields(&self) -> CandidatureFields {
        CandidatureFields {
            company: self.company.clone(),
            contact_name: self.contact_name.clone(),
            contact_email: self.contact_email.clone(),
            contact_phone: self.contact_phone.clone(),
            job_title: self.job_title.clone(),
            submitted_on: self.submitted_on,
            status: Some(self.status),
            notes: self.notes.clone(),
        }
    }

    pub fn apply(&mut self, fields: CandidatureFields, at: DateTime<Utc>) {
        self.company = fields.company;
        self.contact_name = fields.contact_name;
        self.contact_email = fields.contact_email;
        self.contact_phone = fields.contact_phone;
        self.job_title = fields.job_title;
        self.submitted_on = fields.submitted_on;
        if let Some(status) = fields.status {
            self.status = status;
        }
        self.notes = fields.notes;
        self.updated_at = at;
    }
}
