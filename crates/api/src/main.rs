use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::task::TaskTracker;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use smoke_api::config::{ServerConfig, VerdictSourceKind};
use smoke_api::engine::aggregator::Aggregator;
use smoke_api::engine::coordinator::Locator;
use smoke_api::engine::dispatcher::Dispatcher;
use smoke_api::engine::stimulus::standard_stimuli;
use smoke_api::engine::RunEngine;
use smoke_api::router::build_app_router;
use smoke_api::state::AppState;
use smoke_events::{VerdictFeed, VerdictSource};
use smoke_platform::rest::RealtimeVerdictSource;
use smoke_platform::PlatformConfig;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    init_tracing();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    let platform_config = match PlatformConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "Invalid platform configuration");
            std::process::exit(1);
        }
    };
    tracing::info!(
        project_id = %platform_config.project_id,
        region = %platform_config.region,
        "Loaded platform configuration"
    );

    // --- Platform collaborators ---
    let platform = smoke_platform::rest::platform(&platform_config)
        .expect("Failed to build platform HTTP client");

    // --- Verdict source ---
    let (feed, locator): (Arc<dyn VerdictSource>, Locator) = match config.verdict_source {
        VerdictSourceKind::Service => (
            Arc::new(VerdictFeed::with_retention(config.feed_max_partitions)),
            Locator::Service(config.public_base_url.clone()),
        ),
        VerdictSourceKind::Realtime => (
            Arc::new(
                RealtimeVerdictSource::new(&platform_config)
                    .expect("Failed to build realtime store HTTP client"),
            ),
            Locator::Realtime(platform_config.database_url.clone()),
        ),
    };
    tracing::info!(
        source = feed.kind(),
        max_partitions = config.feed_max_partitions,
        "Verdict source created"
    );

    // --- Run engine ---
    // Background cleanup (test user deletion) is tracked so shutdown can drain it.
    let cleanup = TaskTracker::new();
    let dispatcher = Dispatcher::new(standard_stimuli(&platform, cleanup.clone()))
        .expect("Standard stimulus set is never empty");
    tracing::info!(stimuli = ?dispatcher.names(), "Dispatcher ready");

    let mut aggregator = Aggregator::new(config.run_deadline);
    if let Some(names) = &config.expected_tests {
        tracing::info!(expected = ?names, "Counting only the listed tests");
        aggregator = aggregator.with_known_tests(names.iter().cloned());
    }

    let engine = RunEngine::new(dispatcher, aggregator, Arc::clone(&feed), locator);

    // --- App state ---
    let state = AppState {
        feed: Arc::clone(&feed),
        engine: Arc::new(engine),
    };

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    // Closing the feed on the signal wakes every aggregation still waiting,
    // so in-flight runs answer FAIL instead of holding up the drain.
    let shutdown_feed = Arc::clone(&feed);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown_feed.close().await;
        })
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    cleanup.close();
    let pending = cleanup.len();
    if tokio::time::timeout(
        Duration::from_secs(config.shutdown_timeout_secs),
        cleanup.wait(),
    )
    .await
    .is_err()
    {
        tracing::warn!(pending, "Timed out draining background cleanup");
    } else {
        tracing::info!(pending, "Background cleanup drained");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Install the global subscriber; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "smoke_api=debug,tower_http=debug".into());

    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
