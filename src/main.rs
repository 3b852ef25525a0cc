use std::sync::Arc;

use watchlog::{AppState, Tracker, TrackerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = TrackerConfig::from_env()?;

    // Store failure here is fatal to startup
    let tracker = Arc::new(Tracker::open(&config)?);

    let state = AppState {
        tracker,
        static_dir: config.static_dir.clone(),
    };
    let app = watchlog::router(state);

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(
        addr = %config.listen_addr,
        db = %config.db_path.display(),
        "watchlog listening"
    );
    axum::serve(listener, app).await?;

    Ok(())
}
