use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// The public base URL of this server, used to build provider callback URLs
    /// of the form `{callback_base_url}/auth/{provider}/callback`.
    #[arg(long, env, default_value = "http://localhost:4000")]
    callback_base_url: String,

    /// Where users are redirected after logging out.
    #[arg(long, env, default_value = "/")]
    logout_redirect_url: String,

    /// Seconds an invalidated authentication session is kept for in-flight requests.
    #[arg(long, env, default_value_t = 100)]
    pub auth_session_grace_seconds: u64,

    /// Timeout in seconds for each request made to an identity provider.
    #[arg(long, env, default_value_t = 30)]
    pub provider_timeout_secs: u64,

    /// The GitHub OAuth application client ID.
    #[arg(long, env)]
    github_key: Option<String>,

    /// The GitHub OAuth application client secret.
    #[arg(long, env)]
    github_secret: Option<String>,

    /// The Google OAuth client ID.
    #[arg(long, env)]
    google_key: Option<String>,

    /// The Google OAuth client secret.
    #[arg(long, env)]
    google_secret: Option<String>,

    /// Register the network-free faux provider (development only).
    #[arg(long, env, default_value_t = false)]
    pub enable_faux_provider: bool,

    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "127.0.0.1")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 4000)]
    pub port: u16,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(
    short,
    long,
    env,
    default_value_t = RustEnv::Development,
    value_parser = clap::builder::PossibleValuesParser::new([
        "DEVELOPMENT", "PRODUCTION", "STAGING",
        "development", "production", "staging"
    ])
        .map(|s| s.parse::<RustEnv>().unwrap()),
    )]
    pub runtime_env: RustEnv,

    /// Session expiry duration in seconds (default: 24 hours = 86400 seconds)
    #[arg(long, env, default_value_t = 86400)]
    pub backend_session_expiry_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    /// Callback URL registered with the identity provider `provider`.
    pub fn callback_url(&self, provider: &str) -> String {
        format!(
            "{}/auth/{}/callback",
            self.callback_base_url.trim_end_matches('/'),
            provider
        )
    }

    pub fn logout_redirect_url(&self) -> &str {
        &self.logout_redirect_url
    }

    /// GitHub client credentials, when both halves are configured.
    pub fn github_credentials(&self) -> Option<(String, String)> {
        self.github_key.clone().zip(self.github_secret.clone())
    }

    /// Google client credentials, when both halves are configured.
    pub fn google_credentials(&self) -> Option<(String, String)> {
        self.google_key.clone().zip(self.google_secret.clone())
    }

    pub fn auth_session_grace_period(&self) -> Duration {
        Duration::from_secs(self.auth_session_grace_seconds)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }

    pub fn is_production(&self) -> bool {
        self.runtime_env() == RustEnv::Production
    }
}
