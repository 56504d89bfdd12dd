use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{candidature::Candidature, profile::UserProfile, template::Template};
use crate::services::template_engine::{self, Bindings};
use crate::utils::time;

const DEFAULT_SUBJECT: &str = "Candidature pour le poste de {{poste}}";
const DEFAULT_BODY: &str = "Madame, Monsieur,\n\n\
Je vous adresse ma candidature pour le poste de {{poste}} au sein de {{entreprise}}.\n\n\
Vous trouverez mon CV en pièce jointe. Je reste à votre disposition pour tout \
complément d'information.";
const CV_REMINDER: &str =
    "\n\n---\nPensez à joindre votre CV depuis votre client mail avant l'envoi.";
const CV_FILENAME: &str = "CV.pdf";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailData {
    pub to_email: String,
    pub to_name: String,
    pub from_name: String,
    pub from_email: String,
    pub subject: String,
    pub message: String,
    pub reply_to: String,
    pub cv_url: Option<String>,
    pub include_cv: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub filename: String,
    /// Base64 of the file bytes.
    pub content: String,
}

/// What a provider actually receives: the email plus the fetched CV, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub data: EmailData,
    pub attachment: Option<Attachment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    Provider,
    Simulated,
    MailClient,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendOutcome {
    pub success: bool,
    pub method: DeliveryMethod,
    pub service: String,
    pub provider_id: Option<String>,
    /// Prefilled compose link, only for the mail-client handoff.
    pub mailto: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailProvider: Send + Sync {
    fn name(&self) -> String;

    /// Returns the provider's message id.
    async fn send(&self, email: &OutgoingEmail) -> Result<String>;
}

/// Transactional email over an HTTP API authenticated with a bearer key.
pub struct ResendProvider {
    client: Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl ResendProvider {
    pub fn new(client: Client, api_url: String, api_key: String, from: String) -> Self {
        Self {
            client,
            api_url,
            api_key,
            from,
        }
    }
}

#[async_trait]
impl MailProvider for ResendProvider {
    fn name(&self) -> String {
        "Resend".to_string()
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<String> {
        let data = &email.data;
        let mut payload = json!({
            "from": self.from,
            "to": [data.to_email],
            "subject": data.subject,
            "html": html_body(data),
            "text": data.message,
            "reply_to": data.reply_to,
        });
        if let Some(attachment) = &email.attachment {
            payload["attachments"] = json!([{
                "filename": attachment.filename,
                "content": attachment.content,
            }]);
        }

        let resp = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;
        let status = resp.status();
        let body: JsonValue = resp.json().await.unwrap_or_default();
        if !status.is_success() {
            return Err(Error::Internal(format!(
                "email provider returned {}: {}",
                status, body
            )));
        }

        Ok(body["id"]
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| format!("resend_{}", time::now().timestamp_millis())))
    }
}

#[derive(Clone)]
pub struct EmailDispatcher {
    provider: Option<Arc<dyn MailProvider>>,
    client: Client,
    /// `None` disables the simulated send.
    simulation_delay: Option<Duration>,
}

impl EmailDispatcher {
    pub fn new(
        provider: Option<Arc<dyn MailProvider>>,
        client: Client,
        simulation_delay: Option<Duration>,
    ) -> Self {
        Self {
            provider,
            client,
            simulation_delay,
        }
    }

    pub fn from_config(config: &Config, client: Client) -> Self {
        let provider = config.resend_api_key.clone().map(|key| {
            Arc::new(ResendProvider::new(
                client.clone(),
                config.email_api_url.clone(),
                key,
                config.email_from.clone(),
            )) as Arc<dyn MailProvider>
        });
        let simulation_delay = config
            .email_simulation
            .then(|| Duration::from_millis(config.email_simulation_delay_ms));
        Self::new(provider, client, simulation_delay)
    }

    /// Tries the provider, then the simulated send, then the mail client.
    ///
    /// Always reports success: provider failures are logged, never returned.
    pub async fn send(&self, email: &EmailData) -> SendOutcome {
        tracing::info!(to = %email.to_email, subject = %email.subject, "Sending email");

        if let Some(provider) = &self.provider {
            let outgoing = OutgoingEmail {
                data: email.clone(),
                attachment: self.cv_attachment(email).await,
            };
            match provider.send(&outgoing).await {
                Ok(id) => {
                    tracing::info!(provider = %provider.name(), id = %id, "Email sent");
                    return SendOutcome {
                        success: true,
                        method: DeliveryMethod::Provider,
                        service: provider.name(),
                        provider_id: Some(id),
                        mailto: None,
                    };
                }
                Err(e) => {
                    tracing::warn!(provider = %provider.name(), error = %e, "Email provider failed, falling back");
                }
            }
        }

        if let Some(delay) = self.simulation_delay {
            simulate_send(email, delay).await;
            return SendOutcome {
                success: true,
                method: DeliveryMethod::Simulated,
                service: "Simulation".to_string(),
                provider_id: None,
                mailto: None,
            };
        }

        SendOutcome {
            success: true,
            method: DeliveryMethod::MailClient,
            service: "Mail client".to_string(),
            provider_id: None,
            mailto: Some(mailto_link(email)),
        }
    }

    async fn cv_attachment(&self, email: &EmailData) -> Option<Attachment> {
        if !email.include_cv {
            return None;
        }
        let url = email.cv_url.as_deref().filter(|u| !u.is_empty())?;
        match self.fetch_cv(url).await {
            Ok(bytes) => {
                tracing::debug!(size = bytes.len(), "CV attached");
                Some(Attachment {
                    filename: CV_FILENAME.to_string(),
                    content: STANDARD.encode(&bytes),
                })
            }
            Err(e) => {
                tracing::warn!(error = %e, url, "Could not fetch CV, sending without attachment");
                None
            }
        }
    }

    async fn fetch_cv(&self, url: &str) -> Result<Bytes> {
        let resp = self.client.get(url).send().await?.error_for_status()?;
        Ok(resp.bytes().await?)
    }
}

async fn simulate_send(email: &EmailData, delay: Duration) {
    tracing::info!(
        from = %format!("{} <{}>", email.from_name, email.from_email),
        to = %format!("{} <{}>", email.to_name, email.to_email),
        subject = %email.subject,
        body = %email.message,
        "Simulated email"
    );
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Compose link for the user's mail client. Attachments cannot travel this
/// way, so the body asks the user to add the CV by hand.
pub fn mailto_link(email: &EmailData) -> String {
    let mut body = email.message.clone();
    let has_cv = email.cv_url.as_deref().is_some_and(|u| !u.is_empty());
    if email.include_cv && has_cv {
        body.push_str(CV_REMINDER);
    }

    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("to", &email.to_email)
        .append_pair("subject", &email.subject)
        .append_pair("body", &body)
        .finish();
    format!("mailto:?{}", query)
}

fn html_body(email: &EmailData) -> String {
    let escape = |s: &str| {
        s.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
    };
    format!(
        "<div style=\"font-family: Arial, sans-serif; line-height: 1.6;\">\
         <div>{}</div>\
         <hr>\
         <p><strong>Expéditeur :</strong> {}</p>\
         <p><strong>Réponse à :</strong> {}</p>\
         </div>",
        escape(&email.message).replace('\n', "<br>"),
        escape(&email.from_name),
        escape(&email.reply_to),
    )
}

/// Builds the email for a candidature's contact from a template (or the
/// default letter), signed and with every placeholder resolved.
pub fn compose_from_candidature(
    candidature: &Candidature,
    template: Option<&Template>,
    profile: &UserProfile,
    custom_body: Option<&str>,
    include_cv: bool,
    default_from: &str,
) -> EmailData {
    let from_email = if profile.email.trim().is_empty() {
        default_from.to_string()
    } else {
        profile.email.clone()
    };
    let from_name = match profile.display_name() {
        name if name.is_empty() => from_email.clone(),
        name => name,
    };

    let mut bindings = Bindings::for_candidature(candidature, profile);
    bindings.insert("email", from_email.as_str());

    let subject = match template {
        Some(t) => template_engine::substitute(&t.subject, &bindings),
        None => format!(
            "{} - {}",
            template_engine::substitute(DEFAULT_SUBJECT, &bindings),
            from_name
        ),
    };

    let mut body = custom_body
        .filter(|b| !b.trim().is_empty())
        .or(template.map(|t| t.body.as_str()))
        .unwrap_or(DEFAULT_BODY)
        .to_string();
    if !profile.signature.trim().is_empty() {
        body.push_str("\n\n");
        body.push_str(&profile.signature);
    }

    EmailData {
        to_email: candidature.contact_email.clone(),
        to_name: candidature.contact_name.clone(),
        from_name,
        from_email: from_email.clone(),
        subject,
        message: template_engine::substitute(&body, &bindings),
        reply_to: from_email,
        cv_url: profile.cv_url.clone(),
        include_cv,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{candidature::CandidatureStatus, template::TemplateCategory};
    use chrono::NaiveDate;

    fn email() -> EmailData {
        EmailData {
            to_email: "jo@acme.test".into(),
            to_name: "Jo".into(),
            from_name: "Sam Martin".into(),
            from_email: "sam@example.com".into(),
            subject: "Candidature Engineer".into(),
            message: "Bonjour Jo".into(),
            reply_to: "sam@example.com".into(),
            cv_url: None,
            include_cv: false,
        }
    }

    fn candidature() -> Candidature {
        let now = time::now();
        Candidature {
            id: 1,
            company: "Acme".into(),
            contact_name: "Jo".into(),
            contact_email: "jo@acme.test".into(),
            contact_phone: None,
            job_title: "Engineer".into(),
            submitted_on: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            status: CandidatureStatus::Draft,
            notes: None,
            last_email_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn provider_success_is_reported() {
        let mut provider = MockMailProvider::new();
        provider.expect_name().return_const("Mock".to_string());
        provider
            .expect_send()
            .times(1)
            .returning(|outgoing| {
                assert!(outgoing.attachment.is_none());
                Ok("msg_1".to_string())
            });

        let dispatcher = EmailDispatcher::new(
            Some(Arc::new(provider)),
            Client::new(),
            Some(Duration::ZERO),
        );
        let outcome = dispatcher.send(&email()).await;
        assert!(outcome.success);
        assert_eq!(outcome.method, DeliveryMethod::Provider);
        assert_eq!(outcome.provider_id.as_deref(), Some("msg_1"));
    }

    #[tokio::test]
    async fn provider_failure_falls_back_to_simulation() {
        let mut provider = MockMailProvider::new();
        provider.expect_name().return_const("Mock".to_string());
        provider
            .expect_send()
            .times(1)
            .returning(|_| Err(Error::Internal("503".into())));

        let dispatcher = EmailDispatcher::new(
            Some(Arc::new(provider)),
            Client::new(),
            Some(Duration::ZERO),
        );
        let outcome = dispatcher.send(&email()).await;
        assert!(outcome.success);
        assert_eq!(outcome.method, DeliveryMethod::Simulated);
        assert!(outcome.mailto.is_none());
    }

    #[tokio::test]
    async fn unconfigured_provider_and_no_simulation_hands_off_to_mail_client() {
        let dispatcher = EmailDispatcher::new(None, Client::new(), None);
        let mut data = email();
        data.include_cv = true;
        data.cv_url = Some("http://localhost/cv.pdf".into());

        let outcome = dispatcher.send(&data).await;
        assert!(outcome.success);
        assert_eq!(outcome.method, DeliveryMethod::MailClient);
        let link = outcome.mailto.expect("mailto link");
        assert!(link.starts_with("mailto:?to=jo%40acme.test"));
        assert!(link.contains("CV"));
    }

    #[test]
    fn mailto_skips_cv_reminder_without_cv() {
        let mut data = email();
        data.include_cv = true;
        let link = mailto_link(&data);
        assert!(link.ends_with("body=Bonjour+Jo"));
    }

    #[test]
    fn html_body_escapes_markup() {
        let mut data = email();
        data.message = "a <b> & c\nnext".into();
        let html = html_body(&data);
        assert!(html.contains("a &lt;b&gt; &amp; c<br>next"));
    }

    #[test]
    fn compose_uses_template_and_profile() {
        let now = time::now();
        let template = Template {
            id: 2,
            name: "Relance".into(),
            subject: "Relance {{poste}}".into(),
            body: "Bonjour {{contact_nom}}, {{entreprise}} ? {{inconnu}}".into(),
            variables: vec![],
            category: TemplateCategory::FollowUp,
            created_at: now,
            updated_at: now,
        };
        let profile = UserProfile {
            first_name: "Sam".into(),
            last_name: "Martin".into(),
            email: "sam@example.com".into(),
            signature: "Sam M.".into(),
            cv_url: Some("http://localhost/cv.pdf".into()),
            ..Default::default()
        };

        let data = compose_from_candidature(
            &candidature(),
            Some(&template),
            &profile,
            None,
            true,
            "tracker@localhost",
        );
        assert_eq!(data.subject, "Relance Engineer");
        assert_eq!(data.message, "Bonjour Jo, Acme ? \n\nSam M.");
        assert_eq!(data.from_name, "Sam Martin");
        assert_eq!(data.reply_to, "sam@example.com");
        assert_eq!(data.to_email, "jo@acme.test");
        assert!(data.include_cv);
    }

    #[test]
    fn compose_defaults_without_template_or_profile() {
        let data = compose_from_candidature(
            &candidature(),
            None,
            &UserProfile::default(),
            None,
            false,
            "tracker@localhost",
        );
        assert_eq!(data.from_email, "tracker@localhost");
        assert_eq!(
            data.subject,
            "Candidature pour le poste de Engineer - tracker@localhost"
        );
        assert!(data.message.contains("poste de Engineer au sein de Acme"));
        assert!(data.cv_url.is_none());
    }

    #[test]
    fn custom_body_wins_over_template() {
        let data = compose_from_candidature(
            &candidature(),
            None,
            &UserProfile::default(),
            Some("Salut {{contact_nom}}"),
            false,
            "tracker@localhost",
        );
        assert_eq!(data.message, "Salut Jo");
    }
}
