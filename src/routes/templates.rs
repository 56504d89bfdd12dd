use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use validator::Validate;

use crate::{
    dto::{candidature_dto::MessageResponse, template_dto::TemplatePayload},
    error::Result,
    routes::JsonBody,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/templates",
    responses(
        (status = 200, description = "Templates, newest first", body = [Template])
    )
)]
#[axum::debug_handler]
pub async fn list_templates(State(state): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(state.template_service.list().await))
}

#[utoipa::path(
    post,
    path = "/api/templates",
    request_body = TemplatePayload,
    responses(
        (status = 201, description = "Template created", body = Json<Template>),
        (status = 400, description = "Invalid payload")
    )
)]
#[axum::debug_handler]
pub async fn create_template(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<TemplatePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let template = state.template_service.create(payload).await?;
    Ok((StatusCode::CREATED, Json(template)))
}

#[utoipa::path(
    get,
    path = "/api/templates/{id}",
    params(
        ("id" = i64, Path, description = "Template ID")
    ),
    responses(
        (status = 200, description = "Template", body = Json<Template>),
        (status = 404, description = "Template not found")
    )
)]
#[axum::debug_handler]
pub async fn get_template(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.template_service.get(id).await?))
}

#[utoipa::path(
    put,
    path = "/api/templates/{id}",
    params(
        ("id" = i64, Path, description = "Template ID")
    ),
    request_body = TemplatePayload,
    responses(
        (status = 200, description = "Template updated", body = Json<Template>),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Template not found")
    )
)]
#[axum::debug_handler]
pub async fn update_template(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    JsonBody(payload): JsonBody<TemplatePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    Ok(Json(state.template_service.update(id, payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/templates/{id}",
    params(
        ("id" = i64, Path, description = "Template ID")
    ),
    responses(
        (status = 200, description = "Template deleted", body = Json<MessageResponse>),
        (status = 404, description = "Template not found")
    )
)]
#[axum::debug_handler]
pub async fn delete_template(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    state.template_service.delete(id).await?;
    Ok(Json(MessageResponse::new("Template deleted")))
}
