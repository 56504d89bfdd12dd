pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use crate::config::Config;
use crate::database::storage::KeyValueStore;
use crate::error::Result;
use crate::services::{
    candidature_service::CandidatureService, email_service::EmailDispatcher,
    profile_service::ProfileService, record_store::RecordStore, reminders::ReminderSession,
    template_service::TemplateService,
};

#[derive(Clone)]
pub struct AppState {
    pub store: RecordStore,
    pub candidature_service: CandidatureService,
    pub template_service: TemplateService,
    pub profile_service: ProfileService,
    pub email_dispatcher: EmailDispatcher,
    pub reminders: ReminderSession,
    pub email_from: String,
    /// "postgres" or "memory", reported by the health check.
    pub storage_backend: &'static str,
}

impl AppState {
    pub async fn new(
        storage: Arc<dyn KeyValueStore>,
        storage_backend: &'static str,
        config: &Config,
    ) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()?;

        let store = RecordStore::open(storage.clone()).await?;
        let profile_service = ProfileService::new(storage);
        let email_dispatcher = EmailDispatcher::from_config(config, http_client);
        let candidature_service = CandidatureService::new(
            store.clone(),
            profile_service.clone(),
            email_dispatcher.clone(),
            config.email_from.clone(),
        );
        let template_service = TemplateService::new(store.clone());

        Ok(Self {
            store,
            candidature_service,
            template_service,
            profile_service,
            email_dispatcher,
            reminders: ReminderSession::new(),
            email_from: config.email_from.clone(),
            storage_backend,
        })
    }
}
