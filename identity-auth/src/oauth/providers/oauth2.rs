//! Generic OAuth 2.0 authorization-code provider.
//!
//! Configured with the authorize, token and profile endpoints of an identity
//! service; [`github`] and [`google`] return ready-made endpoint sets.

use std::any::Any;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::*;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{provider_error, Error, ErrorKind};
use crate::oauth::{first_param, CallbackParams, User};

/// Endpoints of an OAuth 2.0 identity service.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub auth_url: String,
    pub token_url: String,
    pub profile_url: String,
}

/// Settings for one OAuth 2.0 provider registration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Registry key, e.g. "github".
    pub name: String,
    pub client_id: String,
    pub client_secret: String,
    pub callback_url: String,
    pub scopes: Vec<String>,
    pub endpoints: Endpoints,
    /// Timeout for each request to the identity service.
    pub timeout: Duration,
}

/// GitHub endpoints and default scope.
pub fn github(client_id: &str, client_secret: &str, callback_url: &str) -> Config {
    Config {
        name: "github".to_string(),
        client_id: client_id.to_string(),
        client_secret: client_secret.to_string(),
        callback_url: callback_url.to_string(),
        scopes: vec!["user:email".to_string()],
        endpoints: Endpoints {
            auth_url: "https://github.com/login/oauth/authorize".to_string(),
            token_url: "https://github.com/login/oauth/access_token".to_string(),
            profile_url: "https://api.github.com/user".to_string(),
        },
        timeout: Duration::from_secs(30),
    }
}

/// Google endpoints and default scopes.
pub fn google(client_id: &str, client_secret: &str, callback_url: &str) -> Config {
    Config {
        name: "google".to_string(),
        client_id: client_id.to_string(),
        client_secret: client_secret.to_string(),
        callback_url: callback_url.to_string(),
        scopes: vec![
            "openid".to_string(),
            "email".to_string(),
            "profile".to_string(),
        ],
        endpoints: Endpoints {
            auth_url: "https://accounts.google.com/o/oauth2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            profile_url: "https://openidconnect.googleapis.com/v1/userinfo".to_string(),
        },
        timeout: Duration::from_secs(30),
    }
}

/// Token response from the token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    id_token: Option<String>,
}

/// Request to exchange authorization code for tokens
#[derive(Debug, Serialize)]
struct TokenExchangeRequest<'a> {
    code: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    redirect_uri: &'a str,
    grant_type: &'static str,
}

/// OAuth 2.0 provider.
pub struct Provider {
    config: Config,
    http_client: reqwest::Client,
}

impl Provider {
    pub fn new(config: Config) -> Result<Self, Error> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(format!("identity-auth/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            config,
            http_client,
        })
    }

    /// Exchange an authorization code for tokens.
    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, Error> {
        let request = TokenExchangeRequest {
            code,
            client_id: &self.config.client_id,
            client_secret: &self.config.client_secret,
            redirect_uri: &self.config.callback_url,
            grant_type: "authorization_code",
        };

        debug!("Exchanging {} OAuth code for tokens", self.config.name);

        let response = self
            .http_client
            .post(&self.config.endpoints.token_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&request)
            .send()
            .await
            .map_err(|e| {
                warn!("Failed to exchange {} OAuth code: {:?}", self.config.name, e);
                Error::from(e)
            })?;

        if response.status().is_success() {
            let tokens: TokenResponse = response.json().await.map_err(|e| {
                warn!("Failed to parse {} token response: {:?}", self.config.name, e);
                Error::from(e)
            })?;
            info!("Successfully exchanged {} OAuth code for tokens", self.config.name);
            Ok(tokens)
        } else {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!("{} OAuth error ({status}): {error_text}", self.config.name);
            Err(provider_error(ErrorKind::ProviderRequestFailed, &error_text))
        }
    }

    /// Get the raw profile document using the access token.
    async fn get_profile(
        &self,
        access_token: &str,
    ) -> Result<serde_json::Map<String, serde_json::Value>, Error> {
        let response = self
            .http_client
            .get(&self.config.endpoints.profile_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                warn!("Failed to get {} user info: {:?}", self.config.name, e);
                Error::from(e)
            })?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!("{} user info error ({status}): {error_text}", self.config.name);
            Err(provider_error(ErrorKind::ProviderRequestFailed, &error_text))
        }
    }
}

/// Absolute expiry for a token lifetime reported by the token endpoint.
///
/// Non-positive or unrepresentable lifetimes leave the token without an expiry.
fn expiry_from_now(expires_in: i64) -> Option<DateTime<Utc>> {
    if expires_in <= 0 {
        return None;
    }
    let expiry = chrono::Duration::try_seconds(expires_in)
        .and_then(|lifetime| Utc::now().checked_add_signed(lifetime));
    if expiry.is_none() {
        warn!("Ignoring out of range token lifetime of {expires_in}s");
    }
    expiry
}

/// Progress of an OAuth 2.0 authentication attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub auth_url: String,
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub id_token: String,
}

#[async_trait]
impl crate::oauth::Provider for Provider {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn begin_auth(&self, state: &str) -> Result<Box<dyn crate::oauth::Session>, Error> {
        let mut url = Url::parse(&self.config.endpoints.auth_url)
            .map_err(|e| Error::with_source(ErrorKind::ProviderBeginAuthFailed, e))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.callback_url)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.config.scopes.join(" "))
            .append_pair("state", state);

        Ok(Box::new(Session {
            auth_url: url.to_string(),
            ..Default::default()
        }))
    }

    fn unmarshal_session(&self, data: &str) -> Result<Box<dyn crate::oauth::Session>, Error> {
        let session: Session = serde_json::from_str(data)
            .map_err(|e| Error::with_source(ErrorKind::SessionUnmarshalFailed, e))?;
        Ok(Box::new(session))
    }

    async fn fetch_user(&self, session: &dyn crate::oauth::Session) -> Result<User, Error> {
        let session = session.as_any().downcast_ref::<Session>().ok_or_else(|| {
            provider_error(ErrorKind::FetchUserFailed, "session does not belong to this provider")
        })?;

        if session.access_token.is_empty() {
            return Err(provider_error(
                ErrorKind::FetchUserFailed,
                "cannot fetch user information without accessToken",
            ));
        }

        let raw_data = self.get_profile(&session.access_token).await?;
        let field = |keys: &[&str]| -> String {
            keys.iter()
                .find_map(|key| match raw_data.get(*key) {
                    Some(serde_json::Value::String(value)) => Some(value.clone()),
                    Some(serde_json::Value::Number(value)) => Some(value.to_string()),
                    _ => None,
                })
                .unwrap_or_default()
        };

        Ok(User {
            provider: self.config.name.clone(),
            user_id: field(&["id", "sub"]),
            name: field(&["name"]),
            email: field(&["email"]),
            first_name: field(&["given_name"]),
            last_name: field(&["family_name"]),
            nick_name: field(&["login", "preferred_username"]),
            description: field(&["bio"]),
            avatar_url: field(&["picture", "avatar_url"]),
            location: field(&["location", "locale"]),
            access_token: session.access_token.clone(),
            refresh_token: session.refresh_token.clone(),
            expires_at: session.expires_at,
            id_token: session.id_token.clone(),
            raw_data,
            ..Default::default()
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[async_trait]
impl crate::oauth::Session for Session {
    fn marshal(&self) -> Result<String, Error> {
        serde_json::to_string(self).map_err(|e| Error::with_source(ErrorKind::SessionStoreFailed, e))
    }

    fn get_auth_url(&self) -> Result<String, Error> {
        if self.auth_url.is_empty() {
            return Err(provider_error(
                ErrorKind::SessionUnmarshalFailed,
                "an auth url has not been set",
            ));
        }
        Ok(self.auth_url.clone())
    }

    async fn authorize(
        &mut self,
        provider: &dyn crate::oauth::Provider,
        params: &CallbackParams,
    ) -> Result<String, Error> {
        let provider = provider.as_any().downcast_ref::<Provider>().ok_or_else(|| {
            provider_error(ErrorKind::AuthorizeFailed, "provider is not an OAuth2 provider")
        })?;

        if let Some(error) = first_param(params, "error") {
            return Err(provider_error(ErrorKind::AuthorizeFailed, error));
        }
        let code = first_param(params, "code")
            .filter(|code| !code.is_empty())
            .ok_or_else(|| {
                provider_error(ErrorKind::AuthorizeFailed, "callback carries no authorization code")
            })?;

        let tokens = provider.exchange_code(code).await?;
        self.access_token = tokens.access_token;
        self.refresh_token = tokens.refresh_token.unwrap_or_default();
        self.expires_at = tokens.expires_in.and_then(expiry_from_now);
        self.id_token = tokens.id_token.unwrap_or_default();
        Ok(self.access_token.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
