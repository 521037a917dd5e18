use mimalloc::MiMalloc;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use summary_sync::api::HttpSummaryClient;
use summary_sync::config::Config;
use summary_sync::db::SqliteSummaryStore;
use summary_sync::router::{SummaryState, summary_router};
use summary_sync::service::SummaryService;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = Config::load()?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        database_url = %cfg.database_url,
        external_url = %cfg.external_url,
        proxy = %cfg.proxy.as_ref().map(|u| u.as_str()).unwrap_or("<none>"),
        retries = cfg.retries,
        retry_delay_ms = cfg.retry_delay_ms,
        loglevel = %cfg.loglevel
    );

    let store = SqliteSummaryStore::connect(
        &cfg.database_url,
        cfg.db_max_connections,
        cfg.db_max_lifetime(),
    )
    .await?;
    info!(max_connections = cfg.db_max_connections, "summary store ready");

    let fetcher = HttpSummaryClient::from_config(&cfg)?;
    let service = SummaryService::new(Arc::new(fetcher), Arc::new(store), cfg.retry_policy());

    let shutdown = CancellationToken::new();
    let state = SummaryState::new(service, cfg.sync_timeout()).with_shutdown(shutdown.clone());
    let app = summary_router(state);

    let listener = TcpListener::bind(&cfg.listen_addr).await?;
    info!("HTTP server listening on {}", cfg.listen_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;
    info!("HTTP server stopped");
    Ok(())
}

/// Resolve on Ctrl-C or SIGTERM, aborting in-flight syncs first.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
    shutdown.cancel();
}
