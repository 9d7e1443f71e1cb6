use crate::extractors::RejectionType;
use axum::{
    body::to_bytes,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::{header::CONTENT_TYPE, Method, StatusCode},
};
use identity_auth::request::parse_params;
use identity_auth::AuthRequest;
use log::*;
use std::collections::HashMap;

/// Upper bound on a form-posted callback body.
const MAX_FORM_BYTES: usize = 64 * 1024;

/// The framework-neutral [`AuthRequest`] for an auth route: the `{provider}` path
/// segment, the query string and, for form POST callbacks, the form body.
pub(crate) struct AuthParams(pub AuthRequest);

impl<S> FromRequest<S> for AuthParams
where
    S: Send + Sync,
{
    type Rejection = RejectionType;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let (mut parts, body) = req.into_parts();

        // Routes without a `{provider}` segment fall back to the query string.
        let path_params = match Path::<HashMap<String, String>>::from_request_parts(&mut parts, state)
            .await
        {
            Ok(Path(params)) => params,
            Err(rejection) => {
                debug!("No usable path parameters: {}", rejection.body_text());
                HashMap::new()
            }
        };

        let mut request = AuthRequest::new().with_raw_query(parts.uri.query().unwrap_or_default());
        if let Some(provider) = path_params.get("provider") {
            request = request.with_provider(provider.clone());
        }

        if parts.method == Method::POST && is_form(&parts.headers) {
            let bytes = to_bytes(body, MAX_FORM_BYTES).await.map_err(|e| {
                warn!("Failed to read callback form body: {e}");
                (StatusCode::BAD_REQUEST, "Invalid form body".to_string())
            })?;
            let raw = std::str::from_utf8(&bytes)
                .map_err(|_| (StatusCode::BAD_REQUEST, "Invalid form body".to_string()))?;
            request = request.with_form(parse_params(raw));
        }

        Ok(AuthParams(request))
    }
}

fn is_form(headers: &axum::http::HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, routing::any, Json, Router};
    use identity_auth::oauth::first_param;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn echo(AuthParams(request): AuthParams) -> Json<Value> {
        let params = request.callback_params();
        Json(json!({
            "provider": request.path_provider(),
            "state": first_param(&params, "state"),
            "has_form": request.form.is_some(),
        }))
    }

    fn app() -> Router {
        Router::new()
            .route("/auth/{provider}/callback", any(echo))
            .route("/auth", any(echo))
    }

    async fn send(request: axum::http::Request<Body>) -> Value {
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_reads_path_provider_and_query() {
        let request = axum::http::Request::builder()
            .uri("/auth/github/callback?state=abc&code=1")
            .body(Body::empty())
            .unwrap();
        let value = send(request).await;
        assert_eq!(value["provider"], "github");
        assert_eq!(value["state"], "abc");
        assert_eq!(value["has_form"], false);
    }

    #[tokio::test]
    async fn test_reads_form_post_callback() {
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/auth/apple/callback")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("state=xyz123-%23&code=c"))
            .unwrap();
        let value = send(request).await;
        assert_eq!(value["provider"], "apple");
        assert_eq!(value["state"], "xyz123-#");
        assert_eq!(value["has_form"], true);
    }

    #[tokio::test]
    async fn test_route_without_provider_segment() {
        let request = axum::http::Request::builder()
            .uri("/auth?provider=faux")
            .body(Body::empty())
            .unwrap();
        let value = send(request).await;
        assert_eq!(value["provider"], Value::Null);
    }
}
