use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use identity_auth::{Error as AuthError, ErrorKind};

extern crate log;
use log::*;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error(AuthError);

impl StdError for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{}", self.0)
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        self.0.kind()
    }

    fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::ProviderNameMissing | ErrorKind::ProviderNotRegistered => {
                StatusCode::BAD_REQUEST
            }
            ErrorKind::StateMismatch => StatusCode::FORBIDDEN,
            ErrorKind::SessionNotFound => StatusCode::UNAUTHORIZED,
            ErrorKind::AuthorizeFailed
            | ErrorKind::FetchUserFailed
            | ErrorKind::ProviderBeginAuthFailed
            | ErrorKind::ProviderRequestFailed => StatusCode::BAD_GATEWAY,
            ErrorKind::ProviderAlreadyRegistered
            | ErrorKind::SessionUnmarshalFailed
            | ErrorKind::SessionInvalidationFailed
            | ErrorKind::SessionCodecError
            | ErrorKind::EntropyUnavailable
            | ErrorKind::SessionStoreFailed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// List of possible StatusCode variants https://docs.rs/http/latest/http/status/struct.StatusCode.html#associatedconstant.UNPROCESSABLE_ENTITY
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Authentication request failed: {self}");
        } else {
            warn!("Authentication request rejected: {self}");
        }
        // Only the kind reaches the client; provider and store details stay in the log.
        (status, self.kind().to_string()).into_response()
    }
}

impl<E> From<E> for Error
where
    E: Into<AuthError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
