use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::services::email_service::EmailData;
use crate::utils::validation::not_blank;

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SendEmailPayload {
    #[validate(email(message = "to_email must be a valid email address"))]
    pub to_email: String,
    pub to_name: Option<String>,
    #[validate(custom(function = "not_blank"))]
    pub subject: String,
    #[validate(custom(function = "not_blank"))]
    pub message: String,
    pub from_name: Option<String>,
    pub from_email: Option<String>,
    pub reply_to: Option<String>,
    pub cv_url: Option<String>,
    pub include_cv: Option<bool>,
}

impl SendEmailPayload {
    pub fn into_email(self, default_from: &str) -> EmailData {
        let from_email = self
            .from_email
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| default_from.to_string());
        let reply_to = self
            .reply_to
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| from_email.clone());

        EmailData {
            to_name: self.to_name.unwrap_or_default(),
            to_email: self.to_email,
            from_name: self.from_name.unwrap_or_else(|| from_email.clone()),
            from_email,
            subject: self.subject,
            message: self.message,
            reply_to,
            cv_url: self.cv_url,
            include_cv: self.include_cv.unwrap_or(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_to_defaults_to_sender() {
        let payload = SendEmailPayload {
            to_email: "jo@acme.test".into(),
            subject: "Hello".into(),
            message: "Body".into(),
            from_email: Some("sam@example.com".into()),
            ..Default::default()
        };
        assert!(payload.validate().is_ok());
        let email = payload.into_email("tracker@localhost");
        assert_eq!(email.reply_to, "sam@example.com");
        assert_eq!(email.from_name, "sam@example.com");
        assert!(!email.include_cv);
    }

    #[test]
    fn missing_recipient_is_invalid() {
        let payload = SendEmailPayload {
            subject: "Hello".into(),
            message: "Body".into(),
            ..Default::default()
        };
        assert!(payload.validate().is_err());
    }
}
