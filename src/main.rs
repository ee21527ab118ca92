//! ghportal binary entry point

use ghportal::{AppState, config, metrics::SESSIONS_PURGED_TOTAL};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application entry point
///
/// # Setup
/// 1. Load configuration from files and environment
/// 2. Initialize tracing/logging from the `logging` section
/// 3. Initialize AppState
/// 4. Build Axum router
/// 5. Start background tasks (session purge)
/// 6. Start HTTP server
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration
    let config = config::AppConfig::load()?;

    // 2. Initialize tracing/logging; RUST_LOG overrides the configured level
    init_tracing(&config.logging);

    tracing::info!("Starting ghportal...");
    tracing::info!(
        base_url = %config.server.base_url,
        session_store = ?config.session.store,
        "Configuration loaded"
    );

    // 3. Initialize metrics
    ghportal::metrics::init_metrics();

    // 4. Initialize application state
    let state = AppState::new(config.clone()).await?;

    // 5. Build Axum router
    let app = ghportal::build_router(state.clone());

    // 6. Start HTTP server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Public URL: {}", config.server.base_url);
    tracing::info!("OAuth callback URL: {}", config.server.redirect_uri());

    // 7. Start background tasks
    spawn_session_purge_task(state.clone());

    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(logging: &config::LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.default_filter().into());

    if logging.is_json() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}

/// Spawn background task removing expired sessions
fn spawn_session_purge_task(state: AppState) {
    tokio::spawn(async move {
        let configured_interval_secs = state.config.session.purge_interval_seconds;
        let interval_secs = configured_interval_secs.max(1);
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));

        if configured_interval_secs == 0 {
            tracing::warn!("session.purge_interval_seconds=0 is invalid; clamped to 1 second");
        }

        // Skip the immediate first tick.
        interval.tick().await;

        loop {
            interval.tick().await;

            match state.sessions.purge_expired().await {
                Ok(0) => tracing::debug!("No expired sessions to purge"),
                Ok(purged) => {
                    SESSIONS_PURGED_TOTAL.inc_by(purged);
                    tracing::info!(purged, "Expired sessions purged");
                }
                Err(error) => tracing::error!(%error, "Session purge failed"),
            }
        }
    });

    tracing::info!("Session purge task spawned");
}
