use axum::{
    extract::State,
    response::{IntoResponse, Json},
};

use crate::{error::Result, services::statistics, utils::time, AppState};

#[utoipa::path(
    get,
    path = "/api/statistics",
    responses(
        (status = 200, description = "Dashboard figures", body = Json<Statistics>)
    )
)]
#[axum::debug_handler]
pub async fn get_statistics(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let candidatures = state.candidature_service.list().await;
    Ok(Json(statistics::compute(&candidatures, time::now())))
}
