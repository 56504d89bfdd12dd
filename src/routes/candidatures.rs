use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use validator::Validate;

use crate::{
    dto::candidature_dto::{
        CandidaturePayload, CreatedResponse, MessageResponse, SendCandidatureEmailPayload,
    },
    error::Result,
    routes::JsonBody,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/candidatures",
    responses(
        (status = 200, description = "Candidatures, newest first", body = [Candidature])
    )
)]
#[axum::debug_handler]
pub async fn list_candidatures(State(state): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(state.candidature_service.list().await))
}

#[utoipa::path(
    post,
    path = "/api/candidatures",
    request_body = CandidaturePayload,
    responses(
        (status = 201, description = "Candidature created", body = Json<CreatedResponse>),
        (status = 400, description = "Invalid payload")
    )
)]
#[axum::debug_handler]
pub async fn create_candidature(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CandidaturePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let id = state.candidature_service.create(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            id,
            message: "Candidature created".to_string(),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/candidatures/{id}",
    params(
        ("id" = i64, Path, description = "Candidature ID")
    ),
    responses(
        (status = 200, description = "Candidature", body = Json<Candidature>),
        (status = 404, description = "Candidature not found")
    )
)]
#[axum::debug_handler]
pub async fn get_candidature(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.candidature_service.get(id).await?))
}

#[utoipa::path(
    put,
    path = "/api/candidatures/{id}",
    params(
        ("id" = i64, Path, description = "Candidature ID")
    ),
    request_body = CandidaturePayload,
    responses(
        (status = 200, description = "Candidature updated", body = Json<MessageResponse>),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Candidature not found")
    )
)]
#[axum::debug_handler]
pub async fn update_candidature(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    JsonBody(payload): JsonBody<CandidaturePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    state.candidature_service.update(id, payload).await?;
    Ok(Json(MessageResponse::new("Candidature updated")))
}

#[utoipa::path(
    delete,
    path = "/api/candidatures/{id}",
    params(
        ("id" = i64, Path, description = "Candidature ID")
    ),
    responses(
        (status = 200, description = "Candidature deleted", body = Json<MessageResponse>),
        (status = 404, description = "Candidature not found")
    )
)]
#[axum::debug_handler]
pub async fn delete_candidature(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    state.candidature_service.delete(id).await?;
    Ok(Json(MessageResponse::new("Candidature deleted")))
}

#[utoipa::path(
    get,
    path = "/api/candidatures/{id}/history",
    params(
        ("id" = i64, Path, description = "Candidature ID")
    ),
    responses(
        (status = 200, description = "Status changes, oldest first", body = [StatusHistoryEntry]),
        (status = 404, description = "Candidature not found")
    )
)]
#[axum::debug_handler]
pub async fn get_history(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.candidature_service.history(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/candidatures/{id}/send",
    params(
        ("id" = i64, Path, description = "Candidature ID")
    ),
    request_body = SendCandidatureEmailPayload,
    responses(
        (status = 200, description = "Email handed off", body = Json<SendOutcome>),
        (status = 404, description = "Candidature or template not found")
    )
)]
#[axum::debug_handler]
pub async fn send_candidature_email(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    JsonBody(payload): JsonBody<SendCandidatureEmailPayload>,
) -> Result<impl IntoResponse> {
    let outcome = state.candidature_service.send_email(id, payload).await?;
    Ok(Json(outcome))
}
