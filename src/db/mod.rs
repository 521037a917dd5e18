//! Database module: the summary store contract and its SQLite implementation.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows and conversions
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)
//! - `sqlite.rs`: `SummaryStore` backed by an injected sqlx pool

pub mod models;
pub mod schema;
pub mod sqlite;

use async_trait::async_trait;

use crate::error::SummaryError;
use crate::types::Summary;

pub use sqlite::SqliteSummaryStore;

/// Persistence for summaries and their nested schemas/tables.
#[async_trait]
pub trait SummaryStore: Send + Sync {
    /// Upsert by `summary.id`, replacing nested children wholesale.
    /// Returns the summary with every id and parent link filled in.
    async fn save_summary(&self, summary: Summary) -> Result<Summary, SummaryError>;

    /// Expects `page >= 1` and `page_size >= 1`; callers validate.
    /// Pages past the end, including offsets too large to represent, are empty.
    async fn get_summaries(&self, page: i64, page_size: i64) -> Result<Vec<Summary>, SummaryError>;

    /// `SummaryError::NotFound` when no summary has this id.
    async fn get_summary_by_id(&self, id: &str) -> Result<Summary, SummaryError>;
}
