use axum::{
    extract::State,
    response::{IntoResponse, Json},
};
use validator::Validate;

use crate::{dto::email_dto::SendEmailPayload, error::Result, routes::JsonBody, AppState};

#[utoipa::path(
    post,
    path = "/api/send-email",
    request_body = SendEmailPayload,
    responses(
        (status = 200, description = "Email handed off", body = Json<SendOutcome>),
        (status = 400, description = "Invalid payload")
    )
)]
#[axum::debug_handler]
pub async fn send_email(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<SendEmailPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let email = payload.into_email(&state.email_from);
    let outcome = state.email_dispatcher.send(&email).await;
    Ok(Json(outcome))
}
