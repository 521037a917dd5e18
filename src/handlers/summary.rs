use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::router::SummaryState;
use crate::types::{ConnectionDetails, Summary};
use crate::SummaryError;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 10;

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub message: String,
    pub summary: Summary,
}

/// Raw pagination query. Values are kept as text so that non-numeric input
/// falls back to the defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    #[serde(rename = "pageSize")]
    pub page_size: Option<String>,
}

impl PageQuery {
    /// `(page, page_size)`; absent, non-numeric or non-positive values use the defaults.
    pub fn resolve(&self) -> (i64, i64) {
        (
            positive_or(self.page.as_deref(), DEFAULT_PAGE),
            positive_or(self.page_size.as_deref(), DEFAULT_PAGE_SIZE),
        )
    }
}

fn positive_or(raw: Option<&str>, default: i64) -> i64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v >= 1)
        .unwrap_or(default)
}

/// POST /summary/sync -> fetch, sanitize and persist a summary for the posted connection.
pub async fn sync_summary(
    State(state): State<SummaryState>,
    payload: Result<Json<ConnectionDetails>, JsonRejection>,
) -> Result<(StatusCode, Json<SyncResponse>), SummaryError> {
    let Json(details) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "failed to parse connection details");
        SummaryError::InvalidBody(rejection.body_text())
    })?;

    let missing = details.missing_fields();
    if !missing.is_empty() {
        warn!(?details, ?missing, "missing required connection details");
        return Err(SummaryError::MissingFields(missing));
    }

    // Request deadline; also fires when the server shuts down.
    let cancel = state.shutdown.child_token();
    let deadline = {
        let cancel = cancel.clone();
        let timeout = state.sync_timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            cancel.cancel();
        })
    };
    let result = state.service.update_summary(details, &cancel).await;
    deadline.abort();
    let summary = result?;

    info!(id = %summary.id, "summary synced successfully");
    Ok((
        StatusCode::CREATED,
        Json(SyncResponse {
            message: "Summary synced successfully".to_string(),
            summary,
        }),
    ))
}

/// GET /summary/summaries?page&pageSize
pub async fn list_summaries(
    State(state): State<SummaryState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<Summary>>, SummaryError> {
    let (page, page_size) = query.resolve();
    let summaries = state.service.get_summaries(page, page_size).await?;
    Ok(Json(summaries))
}

/// GET /summary/summaries/{id}
pub async fn get_summary(
    State(state): State<SummaryState>,
    Path(id): Path<String>,
) -> Result<Json<Summary>, SummaryError> {
    let summary = state.service.get_summary_by_id(&id).await?;
    Ok(Json(summary))
}
