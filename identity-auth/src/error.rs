//! Error types for the `identity-auth` crate.
//!
//! Follows the same pattern as the rest of the workspace: a root Error struct holding
//! an error kind and the optional underlying cause.

use std::error::Error as StdError;
use std::fmt;

/// Top-level error type for identity-auth.
/// Holds error kind and optional source for error chaining.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Every way an authentication flow can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No provider is registered under the requested name.
    ProviderNotRegistered,
    /// A provider with the same name was already registered.
    ProviderAlreadyRegistered,
    /// The request names no provider and no session is in progress.
    ProviderNameMissing,
    /// The provider could not start an authentication attempt.
    ProviderBeginAuthFailed,
    /// No stored session exists for the resolved provider.
    SessionNotFound,
    /// The stored session could not be restored by its provider.
    SessionUnmarshalFailed,
    /// The callback state does not match the state issued with the authorization URL.
    StateMismatch,
    /// The token exchange with the provider failed.
    AuthorizeFailed,
    /// The provider could not resolve a user from the session.
    FetchUserFailed,
    /// The session store could not be invalidated.
    SessionInvalidationFailed,
    /// A stored session blob could not be decompressed.
    SessionCodecError,
    /// The system source of randomness could not produce a state token.
    EntropyUnavailable,
    /// Reading or writing the session store failed.
    SessionStoreFailed,
    /// An adapter's HTTP exchange with its identity service failed.
    ProviderRequestFailed,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let message = match self {
            ErrorKind::ProviderNotRegistered => "provider is not registered",
            ErrorKind::ProviderAlreadyRegistered => "provider is already registered",
            ErrorKind::ProviderNameMissing => "you must select a provider",
            ErrorKind::ProviderBeginAuthFailed => "provider failed to begin authentication",
            ErrorKind::SessionNotFound => "could not find a matching session for this request",
            ErrorKind::SessionUnmarshalFailed => "could not restore the stored session",
            ErrorKind::StateMismatch => "state token mismatch",
            ErrorKind::AuthorizeFailed => "token exchange with provider failed",
            ErrorKind::FetchUserFailed => "could not fetch user from provider",
            ErrorKind::SessionInvalidationFailed => "could not delete user session",
            ErrorKind::SessionCodecError => "stored session is corrupt",
            ErrorKind::EntropyUnavailable => "source of randomness unavailable",
            ErrorKind::SessionStoreFailed => "session store operation failed",
            ErrorKind::ProviderRequestFailed => "request to identity provider failed",
        };
        f.write_str(message)
    }
}

impl Error {
    /// Create an error of the given kind without a cause.
    pub fn new(error_kind: ErrorKind) -> Self {
        Error {
            source: None,
            error_kind,
        }
    }

    /// Create an error of the given kind wrapping its cause.
    pub fn with_source<E>(error_kind: ErrorKind, source: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        Error {
            source: Some(source.into()),
            error_kind,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.error_kind
    }

    /// Re-label an error raised by a collaborator with the orchestration step it broke,
    /// keeping the original as the source.
    pub(crate) fn in_step(self, error_kind: ErrorKind) -> Self {
        // Security and entropy failures keep their identity across layers.
        if matches!(
            self.error_kind,
            ErrorKind::StateMismatch | ErrorKind::EntropyUnavailable
        ) {
            return self;
        }
        Error {
            source: Some(Box::new(self)),
            error_kind,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}: {}", self.error_kind, source),
            None => write!(f, "{}", self.error_kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: ErrorKind::ProviderRequestFailed,
        }
    }
}

/// Helper function to create provider errors from adapter code.
pub fn provider_error(kind: ErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: kind,
    }
}

/// Helper function to create session store errors.
pub fn store_error(message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::SessionStoreFailed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_step_wraps_source() {
        let err = provider_error(ErrorKind::ProviderRequestFailed, "connection reset")
            .in_step(ErrorKind::AuthorizeFailed);
        assert_eq!(err.kind(), ErrorKind::AuthorizeFailed);
        assert!(err.to_string().contains("connection reset"));
        assert!(StdError::source(&err).is_some());
    }

    #[test]
    fn test_in_step_preserves_state_mismatch() {
        let err = Error::new(ErrorKind::StateMismatch).in_step(ErrorKind::FetchUserFailed);
        assert_eq!(err.kind(), ErrorKind::StateMismatch);
    }

    #[test]
    fn test_display_without_source() {
        let err = Error::new(ErrorKind::ProviderNameMissing);
        assert_eq!(err.to_string(), "you must select a provider");
    }
}
