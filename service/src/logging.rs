//! Console logging for the auth server.

use crate::config::{Config, RustEnv};
use log::{LevelFilter, SetLoggerError};
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

/// HTTP stack and provider client crates that are only shown at TRACE.
const FILTERED_MODULES: &[&str] = &[
    "tower",
    "tower_sessions",
    "hyper",
    "axum",
    "reqwest",
    "mockito",
];

pub struct Logger {}

impl Logger {
    /// Install the global terminal logger at `config.log_level_filter`.
    ///
    /// Fails if a global logger was already installed.
    pub fn init_logger(config: &Config) -> Result<(), SetLoggerError> {
        let level = config.log_level_filter;
        let (mode, colors) = Self::terminal_for(&config.runtime_env());

        TermLogger::init(level, Self::build_log_config(level), mode, colors)?;

        log::info!(
            "Logging at {level} in {} (dependency logs {})",
            config.runtime_env(),
            if Self::shows_dependencies(level) { "shown" } else { "hidden" }
        );
        Ok(())
    }

    fn shows_dependencies(level: LevelFilter) -> bool {
        level == LevelFilter::Trace
    }

    /// Deployed environments log plain text to stderr for the log collector.
    fn terminal_for(env: &RustEnv) -> (TerminalMode, ColorChoice) {
        match env {
            RustEnv::Development => (TerminalMode::Mixed, ColorChoice::Auto),
            RustEnv::Production | RustEnv::Staging => (TerminalMode::Stderr, ColorChoice::Never),
        }
    }

    fn build_log_config(level: LevelFilter) -> simplelog::Config {
        let mut builder = ConfigBuilder::new();
        builder.set_time_format_rfc3339();

        if !Self::shows_dependencies(level) {
            for module in FILTERED_MODULES {
                builder.add_filter_ignore_str(module);
            }
        }

        builder.build()
    }
}
