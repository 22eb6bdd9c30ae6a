use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ytd_server::config::ServerConfig;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const APP_NAME: &str = "ytd-server";

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let (config, load_error) = ServerConfig::load(&config_path);

    init_logging(&config.log_level);

    tracing::info!("{} v{} starting", APP_NAME, VERSION);
    if let Some(e) = load_error {
        tracing::warn!("Failed to load config file: {}. Using defaults.", e);
    }
    tracing::info!("Configuration loaded: {:?}", config);

    ytd_server::serve(config).await
}

/// RUST_LOG wins; otherwise the configured level for this crate and tower_http
fn init_logging(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("ytd_server={level},tower_http={level}").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
