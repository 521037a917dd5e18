use axum::{
    Router,
    http::StatusCode,
    middleware,
    routing::{get, post},
};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::handlers::summary;
use crate::middleware::request_log::log_requests;
use crate::service::SummaryService;

#[derive(Clone)]
pub struct SummaryState {
    pub service: SummaryService,
    pub sync_timeout: Duration,
    /// Parent of every per-request sync token; cancelled on shutdown.
    pub shutdown: CancellationToken,
}

impl SummaryState {
    pub fn new(service: SummaryService, sync_timeout: Duration) -> Self {
        Self {
            service,
            sync_timeout,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }
}

pub fn summary_router(state: SummaryState) -> Router {
    Router::new()
        .route("/health", get(|| async { StatusCode::OK }))
        .nest("/summary", summary_routes())
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

fn summary_routes() -> Router<SummaryState> {
    Router::new()
        .route("/sync", post(summary::sync_summary))
        .route("/summaries", get(summary::list_summaries))
        .route("/summaries/{id}", get(summary::get_summary))
}
