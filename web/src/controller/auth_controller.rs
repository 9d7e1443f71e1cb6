//! Controller for third-party authentication flows.
//!
//! These endpoints are reached through browser redirects, so every response is
//! either a redirect or the resolved user.

use crate::controller::ApiResponse;
use crate::extractors::auth_request::AuthParams;
use crate::session_store::TowerSessionStore;
use crate::{AppState, Error};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use log::*;
use tower_sessions::Session;

/// GET /auth/{provider}
///
/// Returns the user when this client already holds a completed session for the
/// provider, otherwise starts a new authentication attempt.
#[utoipa::path(
    get,
    path = "/auth/{provider}",
    params(
        ("provider" = String, Path, description = "Registered provider name"),
        ("state" = Option<String>, Query, description = "State to send instead of a generated one"),
    ),
    responses(
        (status = 200, description = "Already authenticated, returns the user"),
        (status = 307, description = "Redirect to the provider's authorization page"),
        (status = 400, description = "Unknown or missing provider"),
        (status = 502, description = "Provider could not begin authentication"),
    )
)]
pub async fn begin(
    State(app_state): State<AppState>,
    session: Session,
    AuthParams(request): AuthParams,
) -> Result<Response, Error> {
    let orchestrator = app_state.orchestrator_ref();
    let store = TowerSessionStore::new(session);

    match orchestrator.complete_user_auth(&request, &store).await {
        Ok(user) => {
            debug!("Client already authenticated with {}", user.provider);
            return Ok(Json(ApiResponse::new(StatusCode::OK.into(), user)).into_response());
        }
        Err(e) => trace!("No completed session, beginning authentication: {e}"),
    }

    let url = orchestrator.begin_auth(&request, &store).await?;
    Ok(Redirect::temporary(&url).into_response())
}

/// GET|POST /auth/{provider}/callback
///
/// Completes the authentication attempt started by [`begin`]. POST covers
/// providers that answer with a form post.
#[utoipa::path(
    get,
    path = "/auth/{provider}/callback",
    params(
        ("provider" = String, Path, description = "Registered provider name"),
        ("state" = String, Query, description = "State echoed back by the provider"),
        ("code" = Option<String>, Query, description = "Authorization code"),
    ),
    responses(
        (status = 200, description = "Authentication completed, returns the user"),
        (status = 401, description = "No authentication in progress for this client"),
        (status = 403, description = "State does not match the issued state"),
        (status = 502, description = "Token exchange or user lookup failed"),
    )
)]
pub async fn callback(
    State(app_state): State<AppState>,
    session: Session,
    AuthParams(request): AuthParams,
) -> Result<impl IntoResponse, Error> {
    let store = TowerSessionStore::new(session);
    let user = app_state
        .orchestrator_ref()
        .complete_user_auth(&request, &store)
        .await?;

    info!("Authenticated {} user {}", user.provider, user.user_id);
    Ok(Json(ApiResponse::new(StatusCode::OK.into(), user)))
}

/// GET /logout/{provider}
///
/// Invalidates this client's authentication session and redirects to the
/// configured landing page.
#[utoipa::path(
    get,
    path = "/logout/{provider}",
    params(
        ("provider" = String, Path, description = "Provider the client logs out from"),
    ),
    responses(
        (status = 307, description = "Session invalidated, redirect to the logout landing page"),
        (status = 500, description = "Session could not be invalidated"),
    )
)]
pub async fn logout(
    State(app_state): State<AppState>,
    session: Session,
) -> Result<impl IntoResponse, Error> {
    let store = TowerSessionStore::new(session);
    app_state.orchestrator_ref().logout(&store).await?;

    Ok(Redirect::temporary(app_state.config.logout_redirect_url()))
}
