use chrono::Utc;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::api::SummaryFetcher;
use crate::db::SummaryStore;
use crate::error::SummaryError;
use crate::service::retry::{RetryPolicy, retry_until_cancelled};
use crate::types::{ConnectionDetails, Summary};

/// Sequences fetch, sanitize, stamp and save for one summary sync.
///
/// Holds no per-call state; clones share the same fetcher and store.
#[derive(Clone)]
pub struct SummaryService {
    fetcher: Arc<dyn SummaryFetcher>,
    store: Arc<dyn SummaryStore>,
    retry: RetryPolicy,
}

impl SummaryService {
    pub fn new(
        fetcher: Arc<dyn SummaryFetcher>,
        store: Arc<dyn SummaryStore>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            fetcher,
            store,
            retry,
        }
    }

    /// Fetch a fresh summary for `details`, strip the password, stamp it and persist it.
    ///
    /// Fetch and save are each retried under the same policy. A summary is only
    /// returned once it has been saved; a save failure after a successful fetch
    /// is still an error. When a concurrent sync of the same id was stamped later
    /// and committed first, the store keeps that one and it is what is returned.
    pub async fn update_summary(
        &self,
        details: ConnectionDetails,
        cancel: &CancellationToken,
    ) -> Result<Summary, SummaryError> {
        info!(host = %details.host, dbname = %details.dbname, "updating summary");

        let mut summary = retry_until_cancelled(&self.retry, cancel, "fetch_summary", || {
            let fetcher = Arc::clone(&self.fetcher);
            let details = details.clone();
            async move { fetcher.fetch_summary(&details).await }
        })
        .await
        .inspect_err(|e| error!(host = %details.host, error = %e, "fetching summary failed"))?;

        summary.source_info = details.sanitized();
        summary.synced_at = Utc::now();

        let saved = retry_until_cancelled(&self.retry, cancel, "save_summary", || {
            let store = Arc::clone(&self.store);
            let summary = summary.clone();
            async move { store.save_summary(summary).await }
        })
        .await
        .inspect_err(|e| error!(id = %summary.id, error = %e, "saving summary failed"))?;

        info!(
            id = %saved.id,
            schemas = saved.schemas.len(),
            synced_at = %saved.synced_at,
            "summary synced"
        );
        Ok(saved)
    }

    pub async fn get_summaries(
        &self,
        page: i64,
        page_size: i64,
    ) -> Result<Vec<Summary>, SummaryError> {
        let summaries = self
            .store
            .get_summaries(page, page_size)
            .await
            .inspect_err(|e| error!(page, page_size, error = %e, "listing summaries failed"))?;
        info!(page, page_size, count = summaries.len(), "listed summaries");
        Ok(summaries)
    }

    pub async fn get_summary_by_id(&self, id: &str) -> Result<Summary, SummaryError> {
        match self.store.get_summary_by_id(id).await {
            Ok(summary) => {
                info!(id, "loaded summary");
                Ok(summary)
            }
            Err(e @ SummaryError::NotFound { .. }) => {
                info!(id, "summary not found");
                Err(e)
            }
            Err(e) => {
                error!(id, error = %e, "loading summary failed");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteSummaryStore;
    use crate::types::{Schema, Table};
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use chrono::Duration as ChronoDuration;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Fetcher double that fails `failures` times before answering.
    struct MockFetcher {
        calls: AtomicU32,
        failures: u32,
        response: Summary,
    }

    impl MockFetcher {
        fn new(failures: u32, response: Summary) -> Self {
            Self {
                calls: AtomicU32::new(0),
                failures,
                response,
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SummaryFetcher for MockFetcher {
        async fn fetch_summary(&self, _details: &ConnectionDetails) -> Result<Summary, SummaryError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                return Err(SummaryError::UpstreamStatus(StatusCode::BAD_GATEWAY));
            }
            Ok(self.response.clone())
        }
    }

    /// Store double that records saves and can be told to fail every save.
    #[derive(Default)]
    struct MockStore {
        save_calls: AtomicU32,
        fail_saves: bool,
        saved: Mutex<Vec<Summary>>,
    }

    impl MockStore {
        fn failing() -> Self {
            Self {
                fail_saves: true,
                ..Default::default()
            }
        }

        fn save_calls(&self) -> u32 {
            self.save_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SummaryStore for MockStore {
        async fn save_summary(&self, summary: Summary) -> Result<Summary, SummaryError> {
            self.save_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_saves {
                return Err(SummaryError::Database(sqlx::Error::PoolTimedOut));
            }
            self.saved.lock().unwrap().push(summary.clone());
            Ok(summary)
        }

        async fn get_summaries(
            &self,
            page: i64,
            page_size: i64,
        ) -> Result<Vec<Summary>, SummaryError> {
            let saved = self.saved.lock().unwrap();
            Ok(saved
                .iter()
                .skip(((page - 1) * page_size) as usize)
                .take(page_size as usize)
                .cloned()
                .collect())
        }

        async fn get_summary_by_id(&self, id: &str) -> Result<Summary, SummaryError> {
            self.saved
                .lock()
                .unwrap()
                .iter()
                .rev()
                .find(|s| s.id == id)
                .cloned()
                .ok_or_else(|| SummaryError::NotFound { id: id.to_string() })
        }
    }

    fn details() -> ConnectionDetails {
        ConnectionDetails {
            host: "localhost".to_string(),
            port: Some(5432),
            user: "test".to_string(),
            password: "secret".to_string(),
            dbname: "demo".to_string(),
        }
    }

    fn remote_summary(id: &str) -> Summary {
        Summary {
            id: id.to_string(),
            name: "demo".to_string(),
            source_info: ConnectionDetails {
                password: "echoed-back".to_string(),
                host: "somewhere-else".to_string(),
                ..details()
            },
            schemas: vec![Schema {
                name: "public".to_string(),
                tables: vec![Table {
                    name: "users".to_string(),
                    row_count: 10,
                    size_mb: 1.5,
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn policy(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn update_summary_sanitizes_and_stamps_result() {
        let fetcher = Arc::new(MockFetcher::new(0, remote_summary("123")));
        let store = Arc::new(MockStore::default());
        let svc = SummaryService::new(fetcher.clone(), store.clone(), policy(3));

        let summary = svc
            .update_summary(details(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.id, "123");
        assert!(summary.source_info.password.is_empty());
        assert_eq!(summary.source_info.host, "localhost");
        let drift = Utc::now() - summary.synced_at;
        assert!(drift >= ChronoDuration::zero() && drift < ChronoDuration::seconds(1));

        let persisted = store.saved.lock().unwrap();
        assert_eq!(persisted.len(), 1);
        assert!(persisted[0].source_info.password.is_empty());
    }

    #[tokio::test]
    async fn update_summary_retries_fetch_until_success() {
        let fetcher = Arc::new(MockFetcher::new(2, remote_summary("123")));
        let store = Arc::new(MockStore::default());
        let svc = SummaryService::new(fetcher.clone(), store.clone(), policy(3));

        svc.update_summary(details(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(fetcher.calls(), 3);
        assert_eq!(store.save_calls(), 1);
    }

    #[tokio::test]
    async fn exhausted_fetch_never_reaches_the_store() {
        let fetcher = Arc::new(MockFetcher::new(u32::MAX, Summary::default()));
        let store = Arc::new(MockStore::default());
        let svc = SummaryService::new(fetcher.clone(), store.clone(), policy(3));

        let err = svc
            .update_summary(details(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, SummaryError::UpstreamStatus(_)));
        assert_eq!(fetcher.calls(), 3);
        assert_eq!(store.save_calls(), 0);
    }

    #[tokio::test]
    async fn exhausted_save_fails_after_single_fetch() {
        let fetcher = Arc::new(MockFetcher::new(0, remote_summary("123")));
        let store = Arc::new(MockStore::failing());
        let svc = SummaryService::new(fetcher.clone(), store.clone(), policy(4));

        let err = svc
            .update_summary(details(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, SummaryError::Database(_)));
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(store.save_calls(), 4);
    }

    #[tokio::test]
    async fn cancelled_sync_stops_retrying() {
        let fetcher = Arc::new(MockFetcher::new(u32::MAX, Summary::default()));
        let store = Arc::new(MockStore::default());
        let svc = SummaryService::new(
            fetcher.clone(),
            store.clone(),
            RetryPolicy::new(100, Duration::from_secs(60)),
        );
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = svc.update_summary(details(), &cancel).await.unwrap_err();

        assert!(matches!(err, SummaryError::Cancelled));
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(store.save_calls(), 0);
    }

    #[tokio::test]
    async fn synced_at_increases_across_syncs_of_the_same_id() {
        let fetcher = Arc::new(MockFetcher::new(0, remote_summary("same")));
        let store = Arc::new(SqliteSummaryStore::in_memory().await.unwrap());
        let svc = SummaryService::new(fetcher, store.clone(), policy(1));
        let cancel = CancellationToken::new();

        let first = svc.update_summary(details(), &cancel).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = svc.update_summary(details(), &cancel).await.unwrap();

        let stored = svc.get_summary_by_id("same").await.unwrap();
        assert!(second.synced_at > first.synced_at);
        assert_eq!(stored.synced_at, second.synced_at);
    }

    #[tokio::test]
    async fn reads_pass_through_to_the_store() {
        let store = Arc::new(MockStore::default());
        for id in ["1", "2"] {
            store.save_summary(remote_summary(id)).await.unwrap();
        }
        let svc = SummaryService::new(
            Arc::new(MockFetcher::new(0, Summary::default())),
            store,
            policy(1),
        );

        let page = svc.get_summaries(1, 10).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].id, "1");

        assert_eq!(svc.get_summary_by_id("2").await.unwrap().id, "2");
        assert!(matches!(
            svc.get_summary_by_id("missing").await,
            Err(SummaryError::NotFound { .. })
        ));
    }
}
