use log::{error, info};
use service::{config::Config, logging::Logger, AppState};

#[tokio::main]
async fn main() {
    let config = Config::new();
    if let Err(e) = Logger::init_logger(&config) {
        eprintln!("Failed to start logging: {e}");
        std::process::exit(1);
    }

    info!("Starting federated auth server [{}]...", config.runtime_env());

    let orchestrator = match service::init_orchestrator(&config) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            error!("Failed to register identity providers: {e}");
            std::process::exit(1);
        }
    };

    let app_state = AppState::new(config, orchestrator);

    if let Err(e) = web::init_server(app_state).await {
        error!("Server stopped: {e}");
        std::process::exit(1);
    }
}
