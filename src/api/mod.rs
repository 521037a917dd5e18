//! Outbound calls to the remote summary service.

pub mod summary_client;

use async_trait::async_trait;

use crate::error::SummaryError;
use crate::types::{ConnectionDetails, Summary};

pub use summary_client::HttpSummaryClient;

/// Obtains a fresh summary for a target database. One call, no retries.
#[async_trait]
pub trait SummaryFetcher: Send + Sync {
    async fn fetch_summary(&self, details: &ConnectionDetails) -> Result<Summary, SummaryError>;
}
