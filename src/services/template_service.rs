use crate::dto::template_dto::TemplatePayload;
use crate::error::{Error, Result};
use crate::models::template::Template;
use crate::services::record_store::RecordStore;

#[derive(Clone)]
pub struct TemplateService {
    store: RecordStore,
}

impl TemplateService {
    pub fn new(store: RecordStore) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Vec<Template> {
        self.store.list_templates().await
    }

    pub async fn get(&self, id: i64) -> Result<Template> {
        self.store.template(id).await.ok_or_else(|| not_found(id))
    }

    pub async fn create(&self, payload: TemplatePayload) -> Result<Template> {
        let id = self.store.insert_template(payload.into_fields()?).await?;
        tracing::info!(template_id = id, "Template created");
        self.get(id).await
    }

    pub async fn update(&self, id: i64, payload: TemplatePayload) -> Result<Template> {
        let fields = payload.into_fields()?;
        if self.store.update_template(id, fields).await? == 0 {
            return Err(not_found(id));
        }
        self.get(id).await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        if self.store.delete_template(id).await? == 0 {
            return Err(not_found(id));
        }
        tracing::info!(template_id = id, "Template deleted");
        Ok(())
    }
}

fn not_found(id: i64) -> Error {
    Error::NotFound(format!("Template {} not found", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::storage::MemoryStorage;
    use crate::models::template::TemplateCategory;
    use std::sync::Arc;

    async fn service() -> TemplateService {
        let store = RecordStore::open(Arc::new(MemoryStorage::new()))
            .await
            .unwrap();
        TemplateService::new(store)
    }

    fn payload(body: &str) -> TemplatePayload {
        TemplatePayload {
            name: "Merci".into(),
            subject: "Merci {{ entreprise }}".into(),
            body: body.into(),
            category: "thank_you".into(),
        }
    }

    #[tokio::test]
    async fn created_template_gets_next_id_and_variables() {
        let svc = service().await;
        let template = svc
            .create(payload("Bonjour {{contact_nom}}, {{entreprise}}"))
            .await
            .unwrap();
        assert_eq!(template.id, 4);
        assert_eq!(template.category, TemplateCategory::ThankYou);
        assert_eq!(template.variables, vec!["entreprise", "contact_nom"]);
    }

    #[tokio::test]
    async fn update_recomputes_variables() {
        let svc = service().await;
        let updated = svc.update(1, payload("Signé {{nom}}")).await.unwrap();
        assert_eq!(updated.variables, vec!["entreprise", "nom"]);
    }

    #[tokio::test]
    async fn unknown_template_is_not_found() {
        let svc = service().await;
        assert!(matches!(svc.get(99).await, Err(Error::NotFound(_))));
        assert!(matches!(
            svc.update(99, payload("x")).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(svc.delete(99).await, Err(Error::NotFound(_))));
    }
}
