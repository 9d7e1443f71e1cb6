pub(crate) mod auth_request;

use axum::http::StatusCode;

type RejectionType = (StatusCode, String);
