use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{Error, Result};
use crate::models::template::{TemplateCategory, TemplateFields};
use crate::utils::validation::not_blank;

/// Any `variables` sent by the client are ignored; they are derived.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TemplatePayload {
    #[validate(custom(function = "not_blank"))]
    pub name: String,
    #[validate(custom(function = "not_blank"))]
    pub subject: String,
    #[validate(custom(function = "not_blank"))]
    pub body: String,
    #[validate(custom(function = "not_blank"))]
    pub category: String,
}

impl TemplatePayload {
    pub fn into_fields(self) -> Result<TemplateFields> {
        let category = self
            .category
            .trim()
            .parse::<TemplateCategory>()
            .map_err(Error::BadRequest)?;
        Ok(TemplateFields {
            name: self.name,
            subject: self.subject,
            body: self.body,
            category,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_must_be_known() {
        let payload = TemplatePayload {
            name: "Relance".into(),
            subject: "Relance".into(),
            body: "Bonjour".into(),
            category: "relance".into(),
        };
        assert!(payload.validate().is_ok());
        assert!(matches!(payload.into_fields(), Err(Error::BadRequest(_))));
    }

    #[test]
    fn blank_text_fails_validation() {
        let payload = TemplatePayload {
            name: "  ".into(),
            subject: "Relance".into(),
            body: "\n".into(),
            category: "follow_up".into(),
        };
        let errors = payload.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("body"));
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn empty_payload_fails_validation() {
        let errors = TemplatePayload::default().validate().unwrap_err();
        assert_eq!(errors.field_errors().len(), 4);
    }
}
