//! Faux provider for development and tests.
//!
//! Behaves like an OAuth2 provider without any network traffic: the token
//! exchange hands out a fixed access token and the user comes straight from
//! the session.

use std::any::Any;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{provider_error, Error, ErrorKind};
use crate::oauth::{first_param, CallbackParams, Session as _, User};

const AUTH_URL: &str = "http://example.com/auth";

/// Access token handed out by every successful faux token exchange.
pub const ACCESS_TOKEN: &str = "1234567890";

/// Faux provider.
#[derive(Debug, Clone)]
pub struct Provider {
    name: String,
    client_id: String,
    callback_url: String,
}

impl Provider {
    pub fn new() -> Self {
        Self::named("faux")
    }

    /// A faux provider registered under another name.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            client_id: String::new(),
            callback_url: String::new(),
        }
    }

    pub fn with_callback_url(mut self, callback_url: &str) -> Self {
        self.callback_url = callback_url.to_string();
        self
    }
}

impl Default for Provider {
    fn default() -> Self {
        Self::new()
    }
}

/// Progress of a faux authentication attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Session {
    #[serde(rename = "ID")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(rename = "AuthURL")]
    pub auth_url: String,
    pub access_token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

#[async_trait]
impl crate::oauth::Provider for Provider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn begin_auth(&self, state: &str) -> Result<Box<dyn crate::oauth::Session>, Error> {
        let mut url = Url::parse(AUTH_URL)
            .map_err(|e| Error::with_source(ErrorKind::ProviderBeginAuthFailed, e))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.callback_url)
            .append_pair("response_type", "code")
            .append_pair("state", state);

        Ok(Box::new(Session {
            id: "id".to_string(),
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
            provider_error(ErrorKind::FetchUserFailed, "session does not belong to faux")
        })?;

        if session.access_token.is_empty() {
            return Err(provider_error(
                ErrorKind::FetchUserFailed,
                "cannot fetch user information without accessToken",
            ));
        }

        Ok(User {
            provider: self.name.clone(),
            user_id: session.id.clone(),
            name: session.name.clone(),
            email: session.email.clone(),
            access_token: session.access_token.clone(),
            expires_at: session.expires_at,
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
        Ok(self.auth_url.clone())
    }

    async fn authorize(
        &mut self,
        _provider: &dyn crate::oauth::Provider,
        params: &CallbackParams,
    ) -> Result<String, Error> {
        if first_param(params, "code").map_or(true, str::is_empty) {
            return Err(provider_error(
                ErrorKind::AuthorizeFailed,
                "callback carries no authorization code",
            ));
        }
        self.access_token = ACCESS_TOKEN.to_string();
        self.expires_at = Some(Utc::now() + Duration::hours(1));
        Ok(self.access_token.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Session {
    /// Marshal this session; used by tests seeding a store directly.
    pub fn to_json(&self) -> String {
        self.marshal().unwrap_or_default()
    }
}
