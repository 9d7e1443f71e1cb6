use config::Config;
use identity_auth::oauth::providers::{faux, oauth2};
use identity_auth::{Error, Orchestrator, Registry};
use log::{info, warn};
use std::sync::Arc;

pub mod config;
pub mod logging;

/// Build the provider registry from configuration and wrap it in an orchestrator.
///
/// Providers are only registered when their credentials are complete.
pub fn init_orchestrator(config: &Config) -> Result<Orchestrator, Error> {
    let mut builder = Registry::builder();

    if config.enable_faux_provider {
        let provider = faux::Provider::new().with_callback_url(&config.callback_url("faux"));
        builder = builder.with_provider(provider)?;
    }

    if let Some((key, secret)) = config.github_credentials() {
        let mut settings = oauth2::github(&key, &secret, &config.callback_url("github"));
        settings.timeout = config.provider_timeout();
        builder = builder.with_provider(oauth2::Provider::new(settings)?)?;
    }

    if let Some((key, secret)) = config.google_credentials() {
        let mut settings = oauth2::google(&key, &secret, &config.callback_url("google"));
        settings.timeout = config.provider_timeout();
        builder = builder.with_provider(oauth2::Provider::new(settings)?)?;
    }

    let registry = builder.build();
    if registry.is_empty() {
        warn!("No identity providers are configured; every auth request will be rejected");
    }
    info!(
        "Auth session grace period: {}s, provider timeout: {}s",
        config.auth_session_grace_seconds, config.provider_timeout_secs
    );

    Ok(Orchestrator::new(registry).with_grace_period(config.auth_session_grace_period()))
}

// Service-level state shared by every request handler
// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub config: Config,
}

impl AppState {
    pub fn new(app_config: Config, orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            config: app_config,
        }
    }

    pub fn orchestrator_ref(&self) -> &Orchestrator {
        self.orchestrator.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["federated_auth_rs"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_init_orchestrator_registers_configured_providers() {
        let config = parse(&[
            "--enable-faux-provider",
            "--github-key",
            "id",
            "--github-secret",
            "secret",
        ]);
        let orchestrator = init_orchestrator(&config).unwrap();
        assert_eq!(orchestrator.registry().list_names(), vec!["faux", "github"]);
    }

    #[test]
    fn test_init_orchestrator_applies_grace_period() {
        let config = parse(&["--auth-session-grace-seconds", "5"]);
        let orchestrator = init_orchestrator(&config).unwrap();
        assert!(orchestrator.registry().is_empty());
        assert_eq!(
            orchestrator.grace_period(),
            std::time::Duration::from_secs(5)
        );
    }
}
