//! CSRF state management for authentication round-trips.

use base64::{engine::general_purpose::URL_SAFE, Engine};
use log::*;
use rand::rngs::OsRng;
use rand::RngCore;
use url::Url;

use crate::error::{Error, ErrorKind};
use crate::oauth::provider::first_param;
use crate::request::AuthRequest;

/// Name of the query/form parameter carrying the state token.
pub const STATE_PARAM: &str = "state";

/// Number of random bytes in a generated state token.
const STATE_BYTES: usize = 64;

/// Issues and validates anti-forgery state tokens.
///
/// Nothing is stored here: the issued state travels inside the authorization URL
/// that the orchestrator persists with the provider session.
#[derive(Debug, Clone, Copy, Default)]
pub struct StateGuard;

impl StateGuard {
    pub fn new() -> Self {
        Self
    }

    /// Return the caller supplied state unchanged, or generate a fresh unguessable one.
    pub fn issue_state(&self, requested: Option<&str>) -> Result<String, Error> {
        match requested {
            Some(state) if !state.is_empty() => Ok(state.to_string()),
            _ => Self::generate_token(),
        }
    }

    /// Read the state echoed back on the callback: query string first, then a form body.
    pub fn extract_state(&self, request: &AuthRequest) -> String {
        let params = if request.query.is_empty() {
            match &request.form {
                Some(form) => form,
                None => return String::new(),
            }
        } else {
            &request.query
        };
        first_param(params, STATE_PARAM)
            .unwrap_or_default()
            .to_string()
    }

    /// Ensure the state carried by the stored authorization URL matches the incoming one.
    ///
    /// Providers that do not put a state on their authorization URL skip validation.
    pub fn validate(&self, issued_auth_url: &str, incoming_state: &str) -> Result<(), Error> {
        if issued_auth_url.is_empty() {
            return Ok(());
        }
        let auth_url = Url::parse(issued_auth_url)
            .map_err(|e| Error::with_source(ErrorKind::SessionUnmarshalFailed, e))?;

        let original_state = auth_url
            .query_pairs()
            .find(|(key, _)| key == STATE_PARAM)
            .map(|(_, value)| value.into_owned())
            .unwrap_or_default();

        if !original_state.is_empty() && original_state != incoming_state {
            warn!("Callback state does not match the issued state");
            return Err(Error::new(ErrorKind::StateMismatch));
        }
        Ok(())
    }

    /// Generate a cryptographically random state token.
    fn generate_token() -> Result<String, Error> {
        let mut nonce = [0u8; STATE_BYTES];
        OsRng
            .try_fill_bytes(&mut nonce)
            .map_err(|e| Error::with_source(ErrorKind::EntropyUnavailable, e))?;
        Ok(URL_SAFE.encode(nonce))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::CallbackParams;

    fn params(pairs: &[(&str, &str)]) -> CallbackParams {
        let mut params = CallbackParams::new();
        for (key, value) in pairs {
            params
                .entry(key.to_string())
                .or_default()
                .push(value.to_string());
        }
        params
    }

    #[test]
    fn test_issue_state_returns_requested_state() {
        let guard = StateGuard::new();
        assert_eq!(guard.issue_state(Some("state")).unwrap(), "state");
    }

    #[test]
    fn test_issue_state_generates_url_safe_token() {
        let guard = StateGuard::new();
        let state = guard.issue_state(None).unwrap();
        let decoded = URL_SAFE.decode(&state).unwrap();
        assert_eq!(decoded.len(), STATE_BYTES);
    }

    #[test]
    fn test_issue_state_treats_empty_request_as_absent() {
        let guard = StateGuard::new();
        assert!(!guard.issue_state(Some("")).unwrap().is_empty());
    }

    #[test]
    fn test_generated_states_differ() {
        let guard = StateGuard::new();
        let first = guard.issue_state(None).unwrap();
        let second = guard.issue_state(None).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_extract_state_from_query() {
        let guard = StateGuard::new();
        let request = AuthRequest::new().with_query(params(&[("state", "state")]));
        assert_eq!(guard.extract_state(&request), "state");
    }

    #[test]
    fn test_extract_state_from_form_post() {
        let guard = StateGuard::new();
        let request = AuthRequest::new().with_form(params(&[("state", "xyz123-#")]));
        assert_eq!(guard.extract_state(&request), "xyz123-#");
    }

    #[test]
    fn test_extract_state_prefers_non_empty_query() {
        let guard = StateGuard::new();
        let request = AuthRequest::new()
            .with_query(params(&[("code", "abc")]))
            .with_form(params(&[("state", "from-form")]));
        assert_eq!(guard.extract_state(&request), "");
    }

    #[test]
    fn test_extract_state_missing() {
        let guard = StateGuard::new();
        assert_eq!(guard.extract_state(&AuthRequest::new()), "");
    }

    #[test]
    fn test_validate_matching_state() {
        let guard = StateGuard::new();
        assert!(guard
            .validate("http://example.com/auth?state=S1&response_type=code", "S1")
            .is_ok());
    }

    #[test]
    fn test_validate_mismatched_state() {
        let guard = StateGuard::new();
        let err = guard
            .validate("http://example.com/auth?state=S1", "S2")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StateMismatch);
    }

    #[test]
    fn test_validate_decodes_escaped_state() {
        let guard = StateGuard::new();
        assert!(guard
            .validate("http://example.com/auth?state=xyz123-%23", "xyz123-#")
            .is_ok());
    }

    #[test]
    fn test_validate_skipped_without_issued_state() {
        let guard = StateGuard::new();
        assert!(guard.validate("http://example.com/auth", "anything").is_ok());
        assert!(guard.validate("", "anything").is_ok());
    }
}
