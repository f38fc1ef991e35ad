//! Agent Stack Overflow MCP server

use aso_api::{create_router, handlers::tools_from_config, state::AppState};
use aso_core::config::AppConfig;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Path of an optional TOML config file
const CONFIG_PATH_VAR: &str = "ASO_CONFIG";

fn load_config() -> anyhow::Result<AppConfig> {
    let config = match std::env::var(CONFIG_PATH_VAR) {
        Ok(path) => AppConfig::from_file(path)?.with_env_override()?,
        Err(_) => AppConfig::from_env()?,
    };
    config.validate()?;
    Ok(config)
}

fn init_tracing(config: &AppConfig) {
    let level = &config.logging.level;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("aso_api={level},aso_vector={level},aso_kv={level},tower_http={level}").into()
    });

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;
    init_tracing(&config);

    let tools = tools_from_config(&config).await?;
    let addr = format!("{}:{}", config.server.host, config.server.port);

    let state = Arc::new(AppState::new(config, tools));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Agent Stack Overflow MCP server listening on http://{}", addr);
    tracing::info!("SSE endpoint: http://{}/sse", addr);
    tracing::info!("Direct endpoint: http://{}/mcp", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
