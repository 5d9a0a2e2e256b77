mod heal;
mod memory;
mod outbox;
mod service;

use std::future::Future;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::core::{CaseLedgers, SoADocument};

pub use heal::{HealReport, heal_document};
pub use memory::MemoryRepository;
pub use outbox::{Outbox, OutboxConfig, SaveReport};
pub use service::{Computed, ServiceError, SoaService};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("rate limited by storage backend")]
    RateLimited,
    #[error("network error: {0}")]
    Network(String),
    #[error("case {0} not found")]
    NotFound(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("save queue stopped")]
    QueueClosed,
    #[error("save failed after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: Box<StoreError>,
    },
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::RateLimited | StoreError::Network(_))
    }
}

/// External storage for case ledgers and statement versions. Documents come
/// back as raw JSON so that damaged records can be healed instead of rejected.
pub trait CaseRepository: Send + Sync + 'static {
    fn ledgers(
        &self,
        case_id: &str,
    ) -> impl Future<Output = Result<CaseLedgers, StoreError>> + Send;

    fn latest_document(
        &self,
        case_id: &str,
    ) -> impl Future<Output = Result<Option<Value>, StoreError>> + Send;

    /// Insert or replace the record keyed by `(case_id, version)`.
    fn upsert_document(
        &self,
        document: &SoADocument,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 4,
            initial_backoff: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Writes a document, retrying transient failures with exponential backoff.
/// Returns the number of attempts used.
pub async fn write_with_retry<R: CaseRepository>(
    repo: &R,
    document: &SoADocument,
    policy: RetryPolicy,
) -> Result<u32, StoreError> {
    let mut attempt = 0;
    loop {
        match repo.upsert_document(document).await {
            Ok(()) => return Ok(attempt + 1),
            Err(err) if err.is_transient() && attempt < policy.max_retries => {
                let backoff = policy.backoff(attempt);
                warn!(
                    case_id = %document.case_id,
                    version = document.version,
                    attempt = attempt + 1,
                    max_attempts = policy.max_retries + 1,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %err,
                    "Transient save failure, backing off"
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(err) if err.is_transient() => {
                return Err(StoreError::Exhausted {
                    attempts: attempt + 1,
                    source: Box::new(err),
                });
            }
            Err(err) => return Err(err),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedRepository;
    use super::*;

    fn quick_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_backoff: Duration::from_millis(100),
        }
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = quick_policy(3);
        assert_eq!(policy.backoff(0), Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(800));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried_with_backoff() {
        let repo = ScriptedRepository::new(vec![
            StoreError::RateLimited,
            StoreError::Network("reset".into()),
        ]);
        let document = SoADocument::empty("case-1");
        let attempts = write_with_retry(&repo, &document, quick_policy(3))
            .await
            .expect("third attempt succeeds");
        assert_eq!(attempts, 3);

        let calls = repo.attempts();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[1].0 - calls[0].0, Duration::from_millis(100));
        assert_eq!(calls[2].0 - calls[1].0, Duration::from_millis(200));
        assert!(repo.inner.latest_document("case-1").await.expect("read").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn retries_are_bounded() {
        let repo = ScriptedRepository::new(vec![
            StoreError::RateLimited,
            StoreError::RateLimited,
            StoreError::RateLimited,
        ]);
        let err = write_with_retry(&repo, &SoADocument::empty("c"), quick_policy(2))
            .await
            .expect_err("must give up");
        assert!(matches!(err, StoreError::Exhausted { attempts: 3, .. }));
        assert_eq!(repo.attempts().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_failures_are_not_retried() {
        let repo = ScriptedRepository::new(vec![StoreError::Serialization("bad".into())]);
        let err = write_with_retry(&repo, &SoADocument::empty("c"), quick_policy(5))
            .await
            .expect_err("must fail");
        assert!(matches!(err, StoreError::Serialization(_)));
        assert_eq!(repo.attempts().len(), 1);
    }
}
