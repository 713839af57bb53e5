//! End-to-end purge run: query, snapshot, destructive pass, summary
//!
//! ```text
//! query ─▶ MessagePager ─▶ Snapshot ─▶ (LabelGuard ▸ RetryingActuator) per message ─▶ RunStats
//! ```
//!
//! The snapshot is always complete before the first mutating call. A listing
//! failure aborts the run before anything is touched; failures on individual
//! messages only bump the skipped counter.

use std::sync::Arc;
use tracing::{debug, info};

use crate::client::GmailClient;
use crate::config::{Config, ThrottleConfig};
use crate::error::Result;
use crate::label_guard::{LabelGuard, ProtectedLabels};
use crate::models::{Mode, RunReport, RunStats};
use crate::pager::MessagePager;
use crate::retry::{DestructiveAction, RetryPolicy, RetryingActuator};
use crate::snapshot::{build_snapshot, Snapshot};

/// Called once per processed message with (processed, total)
pub type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Caller input for one run
#[derive(Debug, Clone)]
pub struct PurgeRequest {
    pub query: String,
    pub protected_labels: ProtectedLabels,
    /// 0 means no limit
    pub limit: usize,
    pub page_size: u32,
    pub mode: Mode,
}

impl PurgeRequest {
    pub fn new(query: impl Into<String>, mode: Mode) -> Self {
        Self {
            query: query.into(),
            protected_labels: ProtectedLabels::default(),
            limit: 0,
            page_size: 500,
            mode,
        }
    }

    pub fn with_protected_labels(mut self, labels: ProtectedLabels) -> Self {
        self.protected_labels = labels;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }
}

/// Snapshot taken and ready for the destructive pass
#[derive(Debug, Clone)]
pub struct PreparedRun {
    pub mode: Mode,
    /// Query actually sent to Gmail, protect-list clauses included
    pub query: String,
    pub snapshot: Snapshot,
    guard: LabelGuard,
}

impl PreparedRun {
    pub fn total(&self) -> usize {
        self.snapshot.len()
    }
}

pub struct BatchOrchestrator<'a, C: GmailClient + ?Sized> {
    client: &'a C,
    actuator: RetryingActuator,
    throttle: ThrottleConfig,
    on_progress: Option<ProgressCallback>,
}

impl<'a, C: GmailClient + ?Sized> BatchOrchestrator<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self {
            client,
            actuator: RetryingActuator::default(),
            throttle: ThrottleConfig::default(),
            on_progress: None,
        }
    }

    pub fn from_config(client: &'a C, config: &Config) -> Self {
        Self::new(client)
            .with_retry_policy(RetryPolicy::from_config(&config.retry))
            .with_throttle(config.throttle.clone())
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.actuator = RetryingActuator::new(policy);
        self
    }

    pub fn with_throttle(mut self, throttle: ThrottleConfig) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn with_progress(mut self, on_progress: ProgressCallback) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    /// Build the guarded query and take the snapshot. No mutating calls.
    pub async fn prepare(&self, request: &PurgeRequest) -> Result<PreparedRun> {
        let guard = LabelGuard::new(request.protected_labels.clone());
        let query = guard.exclusion_query(&request.query);

        info!("Query: {}", query);
        info!("Mode: {}", request.mode);
        info!("Searching for messages...");

        let pager = MessagePager::new(self.client, query.clone(), request.page_size);
        let snapshot = build_snapshot(pager, request.limit).await?;

        Ok(PreparedRun {
            mode: request.mode,
            query,
            snapshot,
            guard,
        })
    }

    /// Run the destructive pass if the mode and `confirmed` allow it.
    pub async fn execute(&self, prepared: &PreparedRun, confirmed: bool) -> RunReport {
        let total = prepared.total();

        let action = match DestructiveAction::for_mode(prepared.mode) {
            None => {
                info!("DRY-RUN: nothing will be deleted.");
                return RunReport::Preview { total };
            }
            Some(action) => action,
        };

        if !confirmed {
            info!("Operation cancelled.");
            return RunReport::Cancelled { total };
        }

        let mut stats = RunStats::new(total);
        info!(run_id = %stats.run_id, "Starting deletion of {} messages...", total);

        for (index, id) in prepared.snapshot.iter().enumerate() {
            let processed = index + 1;

            // Informational only, see label_guard module docs
            let inspection = prepared.guard.inspect(self.client, id).await;
            debug!(message_id = %id, labels_fetched = inspection.fetched, "Label check done");

            let outcome = self.actuator.execute(self.client, id, action).await;
            stats.record(outcome);

            if let Some(on_progress) = &self.on_progress {
                on_progress(processed, total);
            }

            if self.throttle.pause_every > 0 && processed % self.throttle.pause_every == 0 {
                tokio::time::sleep(self.throttle.pause()).await;
            }

            if self.throttle.progress_every > 0 && processed % self.throttle.progress_every == 0 {
                info!(
                    "Progress: {}/{} (trashed/deleted: {}, skipped: {}) ~{:.1} msg/s",
                    processed,
                    total,
                    stats.done,
                    stats.skipped,
                    stats.throughput()
                );
            }
        }

        let report = RunReport::Completed {
            mode: prepared.mode,
            stats,
        };
        info!("{}", report);
        report
    }

    /// `prepare` followed by `execute`
    pub async fn run(&self, request: &PurgeRequest, confirmed: bool) -> Result<RunReport> {
        let prepared = self.prepare(request).await?;
        Ok(self.execute(&prepared, confirmed).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GmailError;
    use crate::models::{MessageLabels, MessagePage};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::Instant;

    /// Lists `count` IDs in one page; every trash succeeds
    struct FlatClient {
        count: usize,
        queries: Mutex<Vec<String>>,
        trashed: AtomicUsize,
        deleted: AtomicUsize,
    }

    impl FlatClient {
        fn new(count: usize) -> Self {
            Self {
                count,
                queries: Mutex::new(Vec::new()),
                trashed: AtomicUsize::new(0),
                deleted: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl GmailClient for FlatClient {
        async fn list_messages_page(
            &self,
            query: &str,
            _page_token: Option<String>,
            _page_size: u32,
        ) -> Result<MessagePage> {
            self.queries.lock().unwrap().push(query.to_string());
            Ok(MessagePage {
                ids: (0..self.count).map(|i| format!("m{}", i)).collect(),
                next_page_token: None,
            })
        }

        async fn get_message_labels(&self, _id: &str) -> Result<MessageLabels> {
            Err(GmailError::NetworkError("metadata unavailable".into()))
        }

        async fn trash_message(&self, _id: &str) -> Result<()> {
            self.trashed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn delete_message(&self, _id: &str) -> Result<()> {
            self.deleted.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_prepare_applies_protect_list_to_query() {
        let client = FlatClient::new(2);
        let request = PurgeRequest::new("in:inbox", Mode::Preview)
            .with_protected_labels(ProtectedLabels::new(["Keep"]));

        let prepared = BatchOrchestrator::new(&client).prepare(&request).await.unwrap();

        assert_eq!(prepared.query, "in:inbox -label:\"Keep\"");
        assert_eq!(client.queries.lock().unwrap()[0], "in:inbox -label:\"Keep\"");
        assert_eq!(prepared.total(), 2);
    }

    #[tokio::test]
    async fn test_unconfirmed_destructive_run_is_cancelled() {
        let client = FlatClient::new(3);
        let request = PurgeRequest::new("q", Mode::PermanentDelete);

        let report = BatchOrchestrator::new(&client).run(&request, false).await.unwrap();

        assert!(matches!(report, RunReport::Cancelled { total: 3 }));
        assert_eq!(client.deleted.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_permanent_delete_uses_delete_call() {
        let client = FlatClient::new(3);
        let request = PurgeRequest::new("q", Mode::PermanentDelete);

        let report = BatchOrchestrator::new(&client).run(&request, true).await.unwrap();

        assert_eq!(client.deleted.load(Ordering::SeqCst), 3);
        assert_eq!(client.trashed.load(Ordering::SeqCst), 0);
        assert!(report.to_string().contains("Deleted: 3"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_pauses_every_interval() {
        let client = FlatClient::new(450);
        let request = PurgeRequest::new("q", Mode::MoveToTrash);
        let start = Instant::now();

        let report = BatchOrchestrator::new(&client).run(&request, true).await.unwrap();

        // pauses after item 200 and 400
        assert_eq!(start.elapsed(), Duration::from_secs(2));
        assert_eq!(client.trashed.load(Ordering::SeqCst), 450);
        match report {
            RunReport::Completed { stats, .. } => {
                assert_eq!(stats.done, 450);
                assert_eq!(stats.skipped, 0);
            }
            other => panic!("unexpected report {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_progress_callback_sees_every_item() {
        let client = FlatClient::new(5);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let throttle = ThrottleConfig {
            pause_every: 1000,
            pause_millis: 0,
            progress_every: 2,
        };

        BatchOrchestrator::new(&client)
            .with_throttle(throttle)
            .with_progress(Arc::new(move |done, total| sink.lock().unwrap().push((done, total))))
            .run(&PurgeRequest::new("q", Mode::MoveToTrash), true)
            .await
            .unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![(1, 5), (2, 5), (3, 5), (4, 5), (5, 5)]
        );
    }

    #[tokio::test]
    async fn test_protect_list_fetch_failure_does_not_skip() {
        let client = FlatClient::new(2);
        let request = PurgeRequest::new("q", Mode::MoveToTrash)
            .with_protected_labels(ProtectedLabels::new(["Keep"]));

        let report = BatchOrchestrator::new(&client).run(&request, true).await.unwrap();

        assert_eq!(client.trashed.load(Ordering::SeqCst), 2);
        assert!(report.to_string().contains("Skipped: 0"));
    }
}
