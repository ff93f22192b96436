use anyhow::Context;
use tracing_subscriber::EnvFilter;

use bookhub_api::config::AppConfig;
use bookhub_api::state::AppState;
use bookhub_api::{database, media};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bookhub_api=info,tower_http=info".into()),
        )
        .init();

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    tracing::info!("Starting BookHub API in {:?} mode", config.environment);

    let port = config.server.port;

    let pool = database::connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    database::migrate(&pool)
        .await
        .context("Failed to run database migrations")?;

    tokio::fs::create_dir_all(&config.media.staging_dir)
        .await
        .context("Failed to create the upload staging directory")?;
    tokio::fs::create_dir_all(&config.media.local_media_dir)
        .await
        .context("Failed to create the local media directory")?;

    let images = media::host_from_config(&config);
    let state = AppState::new(config, pool, images);
    let app = bookhub_api::app(state);

    let bind_addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {bind_addr}"))?;

    tracing::info!("BookHub API listening on http://{bind_addr}");
    axum::serve(listener, app)
        .await
        .context("Server terminated unexpectedly")?;

    Ok(())
}
