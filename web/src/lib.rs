//! HTTP surface for third-party authentication: begin, callback and logout
//! routes on top of [`identity_auth::Orchestrator`], with per-client state kept
//! in a cookie-keyed `tower_sessions` session.

use axum::Router;
use log::*;
use service::config::Config;
use time::Duration;
use tokio::net::TcpListener;
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, SessionManagerLayer};

mod controller;
mod error;
mod extractors;
mod router;
mod session_store;

pub use error::{Error, Result};
pub use service::AppState;

/// Session layer holding each client's in-progress authentication.
///
/// The cookie has to survive the cross-site redirect back from the provider:
/// `Lax` covers GET callbacks, form-post callbacks need `None` which browsers
/// only accept on secure cookies.
pub fn session_layer(config: &Config) -> SessionManagerLayer<MemoryStore> {
    let same_site = if config.is_production() {
        SameSite::None
    } else {
        SameSite::Lax
    };

    SessionManagerLayer::new(MemoryStore::default())
        .with_secure(config.is_production())
        .with_same_site(same_site)
        .with_expiry(Expiry::OnInactivity(Duration::seconds(
            config.backend_session_expiry_seconds as i64,
        )))
}

/// All routes wrapped in the session layer.
pub fn app(app_state: AppState) -> Router {
    let session_layer = session_layer(&app_state.config);
    router::define_routes(app_state).layer(session_layer)
}

pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let interface = app_state
        .config
        .interface
        .clone()
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let listen_addr = format!("{}:{}", interface, app_state.config.port);

    info!(
        "Server starting... listening for connections on http://{listen_addr} ({} providers)",
        app_state.orchestrator_ref().registry().len()
    );

    let listener = TcpListener::bind(&listen_addr).await?;
    axum::serve(listener, app(app_state)).await
}
