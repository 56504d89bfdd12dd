use crate::dto::candidature_dto::{CandidaturePayload, SendCandidatureEmailPayload};
use crate::error::{Error, Result};
use crate::models::{candidature::Candidature, status_history::StatusHistoryEntry};
use crate::services::{
    email_service::{self, EmailDispatcher, SendOutcome},
    profile_service::ProfileService,
    record_store::RecordStore,
};
use crate::utils::time;

#[derive(Clone)]
pub struct CandidatureService {
    store: RecordStore,
    profiles: ProfileService,
    dispatcher: EmailDispatcher,
    default_from: String,
}

impl CandidatureService {
    pub fn new(
        store: RecordStore,
        profiles: ProfileService,
        dispatcher: EmailDispatcher,
        default_from: String,
    ) -> Self {
        Self {
            store,
            profiles,
            dispatcher,
            default_from,
        }
    }

    /// Newest first.
    pub async fn list(&self) -> Vec<Candidature> {
        self.store.list_candidatures().await
    }

    pub async fn get(&self, id: i64) -> Result<Candidature> {
        self.store
            .candidature(id)
            .await
            .ok_or_else(|| not_found(id))
    }

    pub async fn create(&self, payload: CandidaturePayload) -> Result<i64> {
        let fields = payload.into_fields()?;
        let id = self.store.insert_candidature(fields).await?;
        tracing::info!(candidature_id = id, "Candidature created");
        Ok(id)
    }

    /// Full replace. An omitted status keeps the current one.
    pub async fn update(&self, id: i64, payload: CandidaturePayload) -> Result<Candidature> {
        let fields = payload.into_fields()?;

        let update = self.store.update_candidature(id, fields).await?;
        if update.affected == 0 {
            return Err(not_found(id));
        }
        if let Some(entry) = &update.transition {
            tracing::info!(
                candidature_id = id,
                from = ?entry.previous_status,
                to = %entry.new_status,
                "Candidature status changed"
            );
        }
        self.get(id).await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        if self.store.delete_candidature(id).await? == 0 {
            return Err(not_found(id));
        }
        tracing::info!(candidature_id = id, "Candidature deleted");
        Ok(())
    }

    pub async fn history(&self, id: i64) -> Result<Vec<StatusHistoryEntry>> {
        if self.store.candidature_status(id).await.is_none() {
            return Err(not_found(id));
        }
        Ok(self.store.history_for(id).await)
    }

    /// Emails the candidature's contact and marks it as sent.
    pub async fn send_email(
        &self,
        id: i64,
        payload: SendCandidatureEmailPayload,
    ) -> Result<SendOutcome> {
        let candidature = self.get(id).await?;
        let template = match payload.template_id {
            Some(template_id) => Some(self.store.template(template_id).await.ok_or_else(|| {
                Error::NotFound(format!("Template {} not found", template_id))
            })?),
            None => None,
        };
        let profile = self.profiles.get().await;

        let email = email_service::compose_from_candidature(
            &candidature,
            template.as_ref(),
            &profile,
            payload.body.as_deref(),
            payload.include_cv.unwrap_or(true),
            &self.default_from,
        );
        let outcome = self.dispatcher.send(&email).await;

        self.store.record_email_sent(id, time::now()).await?;
        Ok(outcome)
    }
}

fn not_found(id: i64) -> Error {
    Error::NotFound(format!("Candidature {} not found", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::storage::MemoryStorage;
    use crate::models::candidature::CandidatureStatus;
    use crate::services::email_service::DeliveryMethod;
    use std::sync::Arc;
    use std::time::Duration;

    async fn service() -> CandidatureService {
        let storage = Arc::new(MemoryStorage::new());
        let store = RecordStore::open(storage.clone()).await.unwrap();
        let dispatcher =
            EmailDispatcher::new(None, reqwest::Client::new(), Some(Duration::ZERO));
        CandidatureService::new(
            store,
            ProfileService::new(storage),
            dispatcher,
            "tracker@localhost".into(),
        )
    }

    fn payload(status: Option<&str>) -> CandidaturePayload {
        CandidaturePayload {
            company: "Acme".into(),
            contact_name: "Jo".into(),
            contact_email: "jo@acme.test".into(),
            job_title: "Engineer".into(),
            submitted_on: "2024-01-01".into(),
            status: status.map(str::to_string),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn update_without_status_keeps_current_one() {
        let svc = service().await;
        let id = svc.create(payload(Some("sent"))).await.unwrap();

        let mut changed = payload(None);
        changed.notes = Some("called on monday".into());
        let updated = svc.update(id, changed).await.unwrap();

        assert_eq!(updated.status, CandidatureStatus::Sent);
        assert_eq!(updated.notes.as_deref(), Some("called on monday"));
        assert_eq!(svc.history(id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_candidature_is_not_found() {
        let svc = service().await;
        assert!(matches!(svc.get(42).await, Err(Error::NotFound(_))));
        assert!(matches!(
            svc.update(42, payload(None)).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(svc.delete(42).await, Err(Error::NotFound(_))));
        assert!(matches!(svc.history(42).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn sending_marks_candidature_as_sent() {
        let svc = service().await;
        let id = svc.create(payload(None)).await.unwrap();

        let outcome = svc
            .send_email(id, SendCandidatureEmailPayload::default())
            .await
            .unwrap();
        assert_eq!(outcome.method, DeliveryMethod::Simulated);

        let sent = svc.get(id).await.unwrap();
        assert_eq!(sent.status, CandidatureStatus::Sent);
        assert!(sent.last_email_at.is_some());
        let history = svc.history(id).await.unwrap();
        assert_eq!(history.last().unwrap().new_status, CandidatureStatus::Sent);
    }

    #[tokio::test]
    async fn sending_with_unknown_template_fails() {
        let svc = service().await;
        let id = svc.create(payload(None)).await.unwrap();
        let request = SendCandidatureEmailPayload {
            template_id: Some(99),
            ..Default::default()
        };
        assert!(matches!(
            svc.send_email(id, request).await,
            Err(Error::NotFound(_))
        ));
    }
}
