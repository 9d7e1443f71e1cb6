//! Framework-neutral view of an incoming authentication request.

use url::form_urlencoded;

use crate::oauth::CallbackParams;

/// Query parameter names that may carry the provider name.
const PROVIDER_QUERY_PARAMS: [&str; 2] = ["provider", ":provider"];

/// The parts of an HTTP request the orchestrator reads.
#[derive(Debug, Clone, Default)]
pub struct AuthRequest {
    /// Provider name captured from the route path, e.g. `/auth/{provider}`.
    pub provider_param: Option<String>,
    /// Parsed URL query parameters.
    pub query: CallbackParams,
    /// Parsed form-encoded body, present only for form POST requests.
    pub form: Option<CallbackParams>,
}

impl AuthRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an explicit provider name, taking precedence over everything else.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider_param = Some(provider.into());
        self
    }

    pub fn with_query(mut self, query: CallbackParams) -> Self {
        self.query = query;
        self
    }

    /// Parse and attach a raw query string such as `state=abc&code=123`.
    pub fn with_raw_query(self, raw: &str) -> Self {
        self.with_query(parse_params(raw))
    }

    pub fn with_form(mut self, form: CallbackParams) -> Self {
        self.form = Some(form);
        self
    }

    /// Provider name from the route path, if non-empty.
    pub fn path_provider(&self) -> Option<&str> {
        self.provider_param.as_deref().filter(|p| !p.is_empty())
    }

    /// Provider name from the query string, if non-empty.
    pub fn query_provider(&self) -> Option<&str> {
        PROVIDER_QUERY_PARAMS.iter().find_map(|key| {
            self.query
                .get(*key)
                .and_then(|values| values.first())
                .map(String::as_str)
                .filter(|p| !p.is_empty())
        })
    }

    /// A state explicitly requested by the caller through the query string.
    pub fn requested_state(&self) -> Option<&str> {
        self.query
            .get(crate::oauth::STATE_PARAM)
            .and_then(|values| values.first())
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Parameters handed to the provider's token exchange: the query string when it is
    /// non-empty, otherwise the form body.
    pub fn callback_params(&self) -> CallbackParams {
        if self.query.is_empty() {
            if let Some(form) = &self.form {
                return form.clone();
            }
        }
        self.query.clone()
    }
}

/// Parse `application/x-www-form-urlencoded` data into multi-valued parameters.
pub fn parse_params(raw: &str) -> CallbackParams {
    let mut params = CallbackParams::new();
    for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
        params
            .entry(key.into_owned())
            .or_default()
            .push(value.into_owned());
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_params_keeps_repeated_keys() {
        let params = parse_params("scope=a&scope=b&state=x%23y");
        assert_eq!(params["scope"], vec!["a", "b"]);
        assert_eq!(params["state"], vec!["x#y"]);
    }

    #[test]
    fn test_query_provider_accepts_legacy_key() {
        let request = AuthRequest::new().with_raw_query("%3Aprovider=faux");
        assert_eq!(request.query_provider(), Some("faux"));
    }

    #[test]
    fn test_empty_path_provider_is_ignored() {
        let request = AuthRequest::new().with_provider("");
        assert_eq!(request.path_provider(), None);
    }

    #[test]
    fn test_callback_params_fall_back_to_form() {
        let request = AuthRequest::new().with_form(parse_params("code=123&state=abc"));
        assert_eq!(request.callback_params()["code"], vec!["123"]);

        let request = AuthRequest::new()
            .with_raw_query("code=from-query")
            .with_form(parse_params("code=from-form"));
        assert_eq!(request.callback_params()["code"], vec!["from-query"]);
    }
}
