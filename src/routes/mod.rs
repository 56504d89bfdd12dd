pub mod candidatures;
pub mod email;
pub mod health;
pub mod profile;
pub mod reminders;
pub mod statistics;
pub mod templates;

use axum::{
    extract::FromRequest,
    routing::{get, post},
    Router,
};

use crate::{error::Error, AppState};

/// `axum::Json` whose rejections become 400 responses in the crate's error shape.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct JsonBody<T>(pub T);

pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route(
            "/api/candidatures",
            get(candidatures::list_candidatures).post(candidatures::create_candidature),
        )
        .route(
            "/api/candidatures/:id",
            get(candidatures::get_candidature)
                .put(candidatures::update_candidature)
                .delete(candidatures::delete_candidature),
        )
        .route(
            "/api/candidatures/:id/history",
            get(candidatures::get_history),
        )
        .route(
            "/api/candidatures/:id/send",
            post(candidatures::send_candidature_email),
        )
        .route(
            "/api/templates",
            get(templates::list_templates).post(templates::create_template),
        )
        .route(
            "/api/templates/:id",
            get(templates::get_template)
                .put(templates::update_template)
                .delete(templates::delete_template),
        )
        .route("/api/statistics", get(statistics::get_statistics))
        .route("/api/notifications", get(reminders::list_notifications))
        .route("/api/reminders", get(reminders::list_reminders))
        .route(
            "/api/reminders/:key/read",
            post(reminders::mark_reminder_read),
        )
        .route(
            "/api/reminders/:key",
            axum::routing::delete(reminders::dismiss_reminder),
        )
        .route(
            "/api/profile",
            get(profile::get_profile).put(profile::update_profile),
        )
        .route("/api/send-email", post(email::send_email))
}
