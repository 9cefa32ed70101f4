//! ontograph API Server
//!
//! Configuration comes from the TOML file named by `ONTOGRAPH_CONFIG`, if
//! set, with environment variables layered on top.

use ontograph_api::{create_router, state::AppState};
use ontograph_core::config::{AppConfig, LoggingConfig};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn init_tracing(logging: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("ontograph={},tower_http=info", logging.level))
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_file(logging.include_location)
        .with_line_number(logging.include_location);

    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config() -> anyhow::Result<AppConfig> {
    let config = match std::env::var("ONTOGRAPH_CONFIG") {
        Ok(path) => AppConfig::from_file(path)?.with_env_override()?,
        Err(_) => AppConfig::from_env()?,
    };
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;
    init_tracing(&config.logging);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("ontograph API server starting on http://{}", addr);
    tracing::info!("POST documents to http://{}/api/v1/generate-graph", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
