pub mod candidature_service;
pub mod email_service;
pub mod profile_service;
pub mod record_store;
pub mod reminders;
pub mod statistics;
pub mod status_tracker;
pub mod template_engine;
pub mod template_service;
