//! Provider and session contracts implemented by identity provider adapters.

use std::any::Any;
use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Callback parameters as received from the identity provider, keyed by name.
pub type CallbackParams = BTreeMap<String, Vec<String>>;

/// Returns the first value of `key`, if any.
pub fn first_param<'a>(params: &'a CallbackParams, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .and_then(|values| values.first())
        .map(String::as_str)
}

/// Normalized identity resolved from a provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Name of the provider that resolved this user.
    pub provider: String,
    /// Provider's unique user identifier.
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub nick_name: String,
    pub description: String,
    pub avatar_url: String,
    pub location: String,
    pub access_token: String,
    pub access_token_secret: String,
    pub refresh_token: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub id_token: String,
    /// Unmodified profile payload returned by the provider.
    #[serde(default)]
    pub raw_data: serde_json::Map<String, serde_json::Value>,
}

/// Trait for identity providers.
///
/// Implementations translate one identity service's endpoints and scopes into
/// the common begin / authorize / fetch-user flow. The orchestrator never
/// branches on the protocol family behind an implementation.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Unique registry key of this provider, e.g. "github".
    fn name(&self) -> &str;

    /// Start an authentication attempt bound to `state`.
    ///
    /// The returned session must produce an authorization URL carrying `state`
    /// unless the provider does not support echoing it back.
    async fn begin_auth(&self, state: &str) -> Result<Box<dyn Session>, Error>;

    /// Restore a session previously produced by [`Session::marshal`].
    fn unmarshal_session(&self, data: &str) -> Result<Box<dyn Session>, Error>;

    /// Resolve the authenticated user from the session's tokens.
    async fn fetch_user(&self, session: &dyn Session) -> Result<User, Error>;

    /// Access to the concrete adapter, used by sessions that need their provider's settings.
    fn as_any(&self) -> &dyn Any;
}

/// Provider-specific progress of one authentication attempt.
#[async_trait]
pub trait Session: Send + Sync {
    /// Serialize this session for storage.
    fn marshal(&self) -> Result<String, Error>;

    /// The URL the user must visit to authorize this attempt.
    fn get_auth_url(&self) -> Result<String, Error>;

    /// Exchange callback parameters for an access token, updating this session's token state.
    async fn authorize(
        &mut self,
        provider: &dyn Provider,
        params: &CallbackParams,
    ) -> Result<String, Error>;

    fn as_any(&self) -> &dyn Any;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_param() {
        let mut params = CallbackParams::new();
        params.insert("code".to_string(), vec!["abc".to_string(), "def".to_string()]);
        params.insert("empty".to_string(), vec![]);

        assert_eq!(first_param(&params, "code"), Some("abc"));
        assert_eq!(first_param(&params, "empty"), None);
        assert_eq!(first_param(&params, "missing"), None);
    }

    #[test]
    fn test_user_round_trips_through_json() {
        let user = User {
            provider: "faux".to_string(),
            name: "Homer Simpson".to_string(),
            email: "homer@example.com".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_string(&user).unwrap();
        let decoded: User = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, user);
    }
}
