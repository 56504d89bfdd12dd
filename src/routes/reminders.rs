use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json},
};
use serde::Serialize;

use crate::{
    dto::candidature_dto::MessageResponse,
    error::{Error, Result},
    services::reminders::{self, Reminder},
    utils::time,
    AppState,
};

#[derive(Debug, Serialize)]
pub struct ReminderListResponse {
    pub reminders: Vec<Reminder>,
    pub unread: usize,
}

#[utoipa::path(
    get,
    path = "/api/reminders",
    responses(
        (status = 200, description = "Follow-up reminders for this session", body = Json<ReminderListResponse>)
    )
)]
#[axum::debug_handler]
pub async fn list_reminders(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let candidatures = state.candidature_service.list().await;
    let derived = reminders::derive(&candidatures, time::now());
    let reminders = state.reminders.refresh(derived).await;
    let unread = state.reminders.unread_count().await;
    Ok(Json(ReminderListResponse { reminders, unread }))
}

#[utoipa::path(
    post,
    path = "/api/reminders/{key}/read",
    params(
        ("key" = String, Path, description = "Reminder key")
    ),
    responses(
        (status = 200, description = "Reminder marked as read", body = Json<MessageResponse>),
        (status = 404, description = "Reminder not found")
    )
)]
#[axum::debug_handler]
pub async fn mark_reminder_read(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse> {
    if !state.reminders.mark_read(&key).await {
        return Err(Error::NotFound(format!("Reminder {} not found", key)));
    }
    Ok(Json(MessageResponse::new("Reminder marked as read")))
}

#[utoipa::path(
    delete,
    path = "/api/reminders/{key}",
    params(
        ("key" = String, Path, description = "Reminder key")
    ),
    responses(
        (status = 200, description = "Reminder dismissed", body = Json<MessageResponse>),
        (status = 404, description = "Reminder not found")
    )
)]
#[axum::debug_handler]
pub async fn dismiss_reminder(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse> {
    if !state.reminders.dismiss(&key).await {
        return Err(Error::NotFound(format!("Reminder {} not found", key)));
    }
    Ok(Json(MessageResponse::new("Reminder dismissed")))
}

#[utoipa::path(
    get,
    path = "/api/notifications",
    responses(
        (status = 200, description = "Scheduled follow-up notifications", body = [Notification])
    )
)]
#[axum::debug_handler]
pub async fn list_notifications(State(state): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(state.store.list_notifications().await))
}
