use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{Error, Result};
use crate::models::candidature::{CandidatureFields, CandidatureStatus};
use crate::utils::{time, validation::not_blank};

/// Body of create and full-replace update requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CandidaturePayload {
    #[validate(custom(function = "not_blank"))]
    pub company: String,
    #[validate(custom(function = "not_blank"))]
    pub contact_name: String,
    #[validate(email(message = "contact_email must be a valid email address"))]
    pub contact_email: String,
    pub contact_phone: Option<String>,
    #[validate(custom(function = "not_blank"))]
    pub job_title: String,
    /// `YYYY-MM-DD`
    #[validate(custom(function = "not_blank"))]
    pub submitted_on: String,
    pub status: Option<String>,
    pub notes: Option<String>,
}

impl CandidaturePayload {
    /// An omitted status is left as `None`: draft on create, unchanged on update.
    pub fn into_fields(self) -> Result<CandidatureFields> {
        let submitted_on = time::parse_date(self.submitted_on.trim()).ok_or_else(|| {
            Error::BadRequest(format!(
                "submitted_on must be a YYYY-MM-DD date, got '{}'",
                self.submitted_on
            ))
        })?;
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<CandidatureStatus>().map_err(Error::BadRequest)?),
        };

        Ok(CandidatureFields {
            company: self.company.trim().to_string(),
            contact_name: self.contact_name.trim().to_string(),
            contact_email: self.contact_email.trim().to_string(),
            contact_phone: non_empty(self.contact_phone),
            job_title: self.job_title.trim().to_string(),
            submitted_on,
            status,
            notes: non_empty(self.notes),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: i64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SendCandidatureEmailPayload {
    pub template_id: Option<i64>,
    /// Replaces the template body when set.
    pub body: Option<String>,
    pub include_cv: Option<bool>,
}
