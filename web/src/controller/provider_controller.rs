use crate::controller::ApiResponse;
use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

/// GET the names of all registered identity providers, sorted by name
#[utoipa::path(
    get,
    path = "/providers",
    responses(
        (status = 200, description = "Successfully listed registered providers", body = [String]),
    )
)]
pub async fn index(State(app_state): State<AppState>) -> impl IntoResponse {
    let names: Vec<String> = app_state
        .orchestrator_ref()
        .registry()
        .list_names()
        .into_iter()
        .map(str::to_string)
        .collect();

    Json(ApiResponse::new(StatusCode::OK.into(), names))
}
