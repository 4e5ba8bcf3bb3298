use std::path::PathBuf;

use bitunix_ticker::TickerError;
use bitunix_ticker::app::TickerApp;
use bitunix_ticker::config::AppConfig;
use bitunix_ticker::display::LogSink;
use bitunix_ticker::rest::BitunixRestApi;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), TickerError> {
    // Initialize tracing subscriber for logging output.
    tracing_subscriber::fmt::init();

    let config = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => {
            info!(path = %path.display(), "Loading configuration");
            let mut config = AppConfig::load(&path)?;
            config.apply_env_overrides();
            config
        }
        None => AppConfig::from_env(),
    };

    let api = BitunixRestApi::new(&config.rest.base_url, config.rest.timeout());
    let app = TickerApp::new(config, LogSink, api)?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };
    app.run(shutdown).await?;
    Ok(())
}
