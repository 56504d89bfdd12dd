use axum::{
    extract::State,
    response::{IntoResponse, Json},
};

use crate::{error::Result, models::profile::UserProfile, routes::JsonBody, AppState};

#[utoipa::path(
    get,
    path = "/api/profile",
    responses(
        (status = 200, description = "Sender profile", body = Json<UserProfile>)
    )
)]
#[axum::debug_handler]
pub async fn get_profile(State(state): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(state.profile_service.get().await))
}

#[utoipa::path(
    put,
    path = "/api/profile",
    request_body = UserProfile,
    responses(
        (status = 200, description = "Profile saved", body = Json<UserProfile>)
    )
)]
#[axum::debug_handler]
pub async fn update_profile(
    State(state): State<AppState>,
    JsonBody(profile): JsonBody<UserProfile>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.profile_service.save(profile).await?))
}
