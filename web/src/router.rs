use crate::controller::{auth_controller, health_check_controller, provider_controller};
use crate::AppState;
use axum::{routing::get, Router};

use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Federated Auth API"
        ),
        paths(
            auth_controller::begin,
            auth_controller::callback,
            auth_controller::logout,
            provider_controller::index,
            health_check_controller::health_check,
        ),
        tags(
            (name = "federated_auth", description = "Third-party identity provider authentication")
        )
    )]
struct ApiDoc;

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(auth_routes(app_state.clone()))
        .merge(provider_routes(app_state))
        .merge(health_routes())
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", ApiDoc::openapi()).path("/rapidoc"))
}

fn auth_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/auth/{provider}", get(auth_controller::begin))
        .route(
            "/auth/{provider}/callback",
            get(auth_controller::callback).post(auth_controller::callback),
        )
        .route("/logout/{provider}", get(auth_controller::logout))
        .with_state(app_state)
}

fn provider_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/providers", get(provider_controller::index))
        .with_state(app_state)
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{
            header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
            Request, StatusCode,
        },
        response::Response,
    };
    use clap::Parser;
    use identity_auth::oauth::providers::faux::ACCESS_TOKEN;
    use serde_json::Value;
    use service::config::Config;
    use tower::ServiceExt;

    fn test_app() -> Router {
        let config = Config::try_parse_from([
            "federated_auth_rs",
            "--enable-faux-provider",
            "--logout-redirect-url",
            "/goodbye",
        ])
        .unwrap();
        let orchestrator = service::init_orchestrator(&config).unwrap();
        crate::app(AppState::new(config, orchestrator))
    }

    fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn session_cookie(response: &Response) -> String {
        let header = response
            .headers()
            .get(SET_COOKIE)
            .expect("session cookie")
            .to_str()
            .unwrap();
        header.split(';').next().unwrap().to_string()
    }

    /// The still percent-encoded state on the authorization URL.
    fn raw_state(location: &str) -> String {
        let query = location.split_once('?').unwrap().1;
        query
            .split('&')
            .find_map(|pair| pair.strip_prefix("state="))
            .unwrap()
            .to_string()
    }

    /// Begin a faux login, returning the session cookie and the issued state.
    async fn begin_faux(app: &Router) -> (String, String) {
        let response = app.clone().oneshot(get("/auth/faux", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        let location = response.headers()[LOCATION].to_str().unwrap().to_string();
        assert!(location.starts_with("http://example.com/auth?"));
        (session_cookie(&response), raw_state(&location))
    }

    #[tokio::test]
    async fn test_health() {
        let response = test_app().oneshot(get("/health", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_providers_lists_registered_names() {
        let response = test_app().oneshot(get("/providers", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["data"], serde_json::json!(["faux"]));
    }

    #[tokio::test]
    async fn test_begin_uses_requested_state() {
        let response = test_app()
            .oneshot(get("/auth/faux?state=abc", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        let location = response.headers()[LOCATION].to_str().unwrap();
        assert_eq!(raw_state(location), "abc");
    }

    #[tokio::test]
    async fn test_begin_unknown_provider_is_bad_request() {
        let response = test_app().oneshot(get("/auth/myspace", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_full_login_round_trip() {
        let app = test_app();
        let (cookie, state) = begin_faux(&app).await;

        let uri = format!("/auth/faux/callback?code=abc&state={state}");
        let response = app.clone().oneshot(get(&uri, Some(&cookie))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["data"]["provider"], "faux");
        assert_eq!(body["data"]["access_token"], ACCESS_TOKEN);

        // The authentication session is gone once the callback has been handled
        let response = app.oneshot(get(&uri, Some(&cookie))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_begin_route_returns_user_once_authorized() {
        let app = test_app();
        let response = app
            .clone()
            .oneshot(get("/auth/faux?state=abc", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        let cookie = session_cookie(&response);

        let response = app
            .oneshot(get("/auth/faux?state=abc&code=x", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["data"]["provider"], "faux");
        assert_eq!(body["data"]["access_token"], ACCESS_TOKEN);
    }

    #[tokio::test]
    async fn test_begin_route_restarts_abandoned_attempt() {
        let app = test_app();
        let (cookie, first_state) = begin_faux(&app).await;

        let response = app
            .clone()
            .oneshot(get("/auth/faux", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        let location = response.headers()[LOCATION].to_str().unwrap();
        let second_state = raw_state(location);
        assert_ne!(second_state, first_state);

        // Only the most recent attempt can be completed
        let uri = format!("/auth/faux/callback?code=abc&state={first_state}");
        let response = app.clone().oneshot(get(&uri, Some(&cookie))).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_form_post_callback() {
        let app = test_app();
        let (cookie, state) = begin_faux(&app).await;

        let request = Request::builder()
            .method("POST")
            .uri("/auth/faux/callback")
            .header(COOKIE, &cookie)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!("code=abc&state={state}")))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_forged_state_is_forbidden() {
        let app = test_app();
        let (cookie, _) = begin_faux(&app).await;

        let response = app
            .oneshot(get("/auth/faux/callback?code=abc&state=forged", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_callback_without_session_is_unauthorized() {
        let response = test_app()
            .oneshot(get("/auth/faux/callback?code=abc&state=S1", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_callback_without_code_is_bad_gateway() {
        let app = test_app();
        let (cookie, state) = begin_faux(&app).await;

        let uri = format!("/auth/faux/callback?state={state}");
        let response = app.oneshot(get(&uri, Some(&cookie))).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_logout_redirects() {
        let app = test_app();
        let (cookie, _) = begin_faux(&app).await;

        let response = app
            .clone()
            .oneshot(get("/logout/faux", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers()[LOCATION], "/goodbye");

        let response = app
            .oneshot(get("/auth/faux/callback?code=abc", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
