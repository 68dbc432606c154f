//! Weather function server
//!
//! Speaks MCP on stdin/stdout. Logs go to stderr since stdout carries the
//! protocol.

use rmcp::ServiceExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use weather_agent::config::{load_dotenv, log_filter, log_level_from_env, weather_config_from_env};
use weather_agent::mcp::WeatherServer;
use weather_agent::weather::WeatherApiClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv = load_dotenv()?;
    let level = log_level_from_env()?;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter(level).into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(std::io::stderr),
        )
        .init();
    if let Some(path) = dotenv {
        tracing::debug!(path = %path.display(), "Loaded .env");
    }

    let config = weather_config_from_env()?;
    if config.api_key.is_none() {
        // Calls will fail with a clear error; listing still works
        tracing::warn!("WEATHER_API_KEY is not set");
    }
    let server = WeatherServer::new(WeatherApiClient::new(&config)?);

    tracing::info!("MCP server ready");
    let running = server.serve(rmcp::transport::stdio()).await?;
    let reason = running.waiting().await?;
    tracing::info!(?reason, "MCP server stopped");
    Ok(())
}
