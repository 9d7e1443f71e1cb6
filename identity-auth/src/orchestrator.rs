//! Provider-agnostic authentication flow.
//!
//! [`Orchestrator::begin_auth`] resolves the provider, issues a state token and
//! persists the provider session for the round-trip through the identity
//! service. [`Orchestrator::complete_user_auth`] restores that session on the
//! callback, checks the state, exchanges the callback for a token when needed
//! and resolves the user. The client's stored flow state is invalidated on
//! every exit from the callback once a stored session was found.

use std::sync::Arc;
use std::time::Duration;

use log::*;

use crate::codec;
use crate::error::{Error, ErrorKind};
use crate::oauth::{Provider, StateGuard, User};
use crate::registry::Registry;
use crate::request::AuthRequest;
use crate::store::{load_entries, save_entries, SessionStore};

/// How long an invalidated client session is retained for in-flight requests.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(100);

/// Drives begin / callback / logout over a frozen provider registry.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    registry: Arc<Registry>,
    state_guard: StateGuard,
    grace_period: Duration,
}

impl Orchestrator {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry: Arc::new(registry),
            state_guard: StateGuard::new(),
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }

    /// Override the retention grace window applied on logout.
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// Work out which provider this request belongs to.
    ///
    /// An explicit path parameter wins over a query parameter; failing both, the
    /// first registered provider (by name) with a session in progress is used.
    pub async fn resolve_provider_name(
        &self,
        request: &AuthRequest,
        store: &dyn SessionStore,
    ) -> Result<String, Error> {
        if let Some(name) = request.path_provider() {
            trace!("Provider {name} taken from the request path");
            return Ok(name.to_string());
        }

        if let Some(name) = request.query_provider() {
            trace!("Provider {name} taken from the query string");
            return Ok(name.to_string());
        }

        let entries = load_entries(store).await?;
        // TODO: with sessions in progress for several providers the first name wins;
        // track the most recently begun provider instead once the store records it.
        for name in self.registry.list_names() {
            if entries.get(name).is_some_and(|blob| !blob.is_empty()) {
                debug!("Provider {name} deduced from the session in progress");
                return Ok(name.to_string());
            }
        }

        Err(Error::new(ErrorKind::ProviderNameMissing))
    }

    /// Start authentication and return the URL the user must be sent to.
    pub async fn begin_auth(
        &self,
        request: &AuthRequest,
        store: &dyn SessionStore,
    ) -> Result<String, Error> {
        let name = self.resolve_provider_name(request, store).await?;
        let provider = self.registry.lookup(&name)?;

        let state = self.state_guard.issue_state(request.requested_state())?;
        let session = provider
            .begin_auth(&state)
            .await
            .map_err(|e| e.in_step(ErrorKind::ProviderBeginAuthFailed))?;
        let auth_url = session
            .get_auth_url()
            .map_err(|e| e.in_step(ErrorKind::ProviderBeginAuthFailed))?;
        let marshaled = session
            .marshal()
            .map_err(|e| e.in_step(ErrorKind::ProviderBeginAuthFailed))?;

        self.store_in_session(&name, &marshaled, store).await?;

        info!("Began authentication with provider {name}");
        Ok(auth_url)
    }

    /// Finish authentication on the provider's callback and resolve the user.
    pub async fn complete_user_auth(
        &self,
        request: &AuthRequest,
        store: &dyn SessionStore,
    ) -> Result<User, Error> {
        let name = self.resolve_provider_name(request, store).await?;
        let provider = self.registry.lookup(&name)?;
        let blob = self.stored_blob(&name, store).await?;

        let result = self
            .finish_user_auth(&name, provider.as_ref(), &blob, request, store)
            .await;

        if let Err(cleanup_error) = self.logout(store).await {
            warn!("Failed to invalidate the {name} authentication session: {cleanup_error}");
        }

        result
    }

    /// Everything after the stored session was found; the caller always cleans up.
    async fn finish_user_auth(
        &self,
        name: &str,
        provider: &dyn Provider,
        blob: &str,
        request: &AuthRequest,
        store: &dyn SessionStore,
    ) -> Result<User, Error> {
        let plain = codec::decompress(blob)?;
        let mut session = provider
            .unmarshal_session(&plain)
            .map_err(|e| e.in_step(ErrorKind::SessionUnmarshalFailed))?;

        let auth_url = session
            .get_auth_url()
            .map_err(|e| e.in_step(ErrorKind::SessionUnmarshalFailed))?;
        let incoming_state = self.state_guard.extract_state(request);
        self.state_guard.validate(&auth_url, &incoming_state)?;

        match provider.fetch_user(session.as_ref()).await {
            Ok(user) => {
                debug!("Resolved {name} user from the stored session");
                return Ok(user);
            }
            Err(e) => debug!("Stored {name} session cannot resolve a user yet: {e}"),
        }

        let params = request.callback_params();
        session
            .authorize(provider, &params)
            .await
            .map_err(|e| e.in_step(ErrorKind::AuthorizeFailed))?;

        let marshaled = session
            .marshal()
            .map_err(|e| e.in_step(ErrorKind::AuthorizeFailed))?;
        self.store_in_session(name, &marshaled, store).await?;

        let user = provider
            .fetch_user(session.as_ref())
            .await
            .map_err(|e| e.in_step(ErrorKind::FetchUserFailed))?;
        info!("Completed authentication with provider {name}");
        Ok(user)
    }

    /// Drop every stored provider session of this client and expire its session.
    pub async fn logout(&self, store: &dyn SessionStore) -> Result<(), Error> {
        trace!("Invalidating authentication session");
        store.invalidate(self.grace_period).await.map_err(|e| {
            if e.kind() == ErrorKind::SessionInvalidationFailed {
                e
            } else {
                e.in_step(ErrorKind::SessionInvalidationFailed)
            }
        })
    }

    /// Compress and store a serialized provider session under the provider's name.
    pub async fn store_in_session(
        &self,
        name: &str,
        value: &str,
        store: &dyn SessionStore,
    ) -> Result<(), Error> {
        let mut entries = load_entries(store).await?;
        entries.insert(name.to_string(), codec::compress(value)?);
        save_entries(store, &entries).await
    }

    /// Retrieve and decompress the serialized provider session stored under `name`.
    pub async fn get_from_session(
        &self,
        name: &str,
        store: &dyn SessionStore,
    ) -> Result<String, Error> {
        let blob = self.stored_blob(name, store).await?;
        codec::decompress(&blob)
    }

    async fn stored_blob(&self, name: &str, store: &dyn SessionStore) -> Result<String, Error> {
        load_entries(store)
            .await?
            .remove(name)
            .filter(|blob| !blob.is_empty())
            .ok_or_else(|| Error::new(ErrorKind::SessionNotFound))
    }
}
