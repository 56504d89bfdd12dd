pub mod candidature;
pub mod notification;
pub mod profile;
pub mod status_history;
pub mod template;
