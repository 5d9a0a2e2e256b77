use std::collections::BTreeMap;
use std::sync::Arc;
use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{CaseRepository, RetryPolicy, StoreError, write_with_retry};
use crate::core::SoADocument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutboxConfig {
    pub debounce: Duration,
    pub retry: RetryPolicy,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(750),
            retry: RetryPolicy::default(),
        }
    }
}

/// Outcome of one flushed write. `Ok` carries the number of attempts used.
#[derive(Debug)]
pub struct SaveReport {
    pub case_id: String,
    pub version: u32,
    pub outcome: Result<u32, StoreError>,
}

type WriteReply = oneshot::Sender<Result<u32, StoreError>>;

enum Command {
    Enqueue(Box<SoADocument>),
    Write(Box<SoADocument>, WriteReply),
    Flush(oneshot::Sender<()>),
}

/// Debounced write-behind queue. Edits arriving within the debounce window
/// collapse into one write per `(case_id, version)`, carrying the last state.
#[derive(Debug, Clone)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<Command>,
}

impl Outbox {
    pub fn spawn<R: CaseRepository>(
        repo: Arc<R>,
        config: OutboxConfig,
    ) -> (Self, mpsc::UnboundedReceiver<SaveReport>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (report_tx, report_rx) = mpsc::unbounded_channel();
        tokio::spawn(run(repo, config, rx, report_tx));
        (Self { tx }, report_rx)
    }

    /// Returns false once the worker has stopped.
    pub fn enqueue(&self, document: SoADocument) -> bool {
        self.tx.send(Command::Enqueue(Box::new(document))).is_ok()
    }

    /// Writes `document` ahead of the debounce. A queued edit for the same
    /// `(case_id, version)` is dropped so it cannot land on top of this write.
    /// The command is queued before this returns; the future resolves with the
    /// write outcome.
    pub fn write_now(
        &self,
        document: SoADocument,
    ) -> impl Future<Output = Result<u32, StoreError>> + Send + 'static {
        let (reply_tx, reply_rx) = oneshot::channel();
        let queued = self
            .tx
            .send(Command::Write(Box::new(document), reply_tx))
            .is_ok();
        async move {
            if !queued {
                return Err(StoreError::QueueClosed);
            }
            reply_rx.await.unwrap_or(Err(StoreError::QueueClosed))
        }
    }

    /// Writes everything pending now, without waiting out the debounce.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Command::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}

type Pending = BTreeMap<(String, u32), SoADocument>;

async fn run<R: CaseRepository>(
    repo: Arc<R>,
    config: OutboxConfig,
    mut rx: mpsc::UnboundedReceiver<Command>,
    reports: mpsc::UnboundedSender<SaveReport>,
) {
    let mut pending = Pending::new();
    let mut deadline: Option<Instant> = None;

    loop {
        let command = match deadline {
            Some(at) => match tokio::time::timeout_at(at, rx.recv()).await {
                Ok(command) => command,
                Err(_) => {
                    write_pending(repo.as_ref(), config.retry, &mut pending, &reports).await;
                    deadline = None;
                    continue;
                }
            },
            None => rx.recv().await,
        };

        match command {
            Some(Command::Enqueue(document)) => {
                debug!(
                    case_id = %document.case_id,
                    version = document.version,
                    "Queued statement for save"
                );
                pending.insert((document.case_id.clone(), document.version), *document);
                deadline = Some(Instant::now() + config.debounce);
            }
            Some(Command::Write(document, reply)) => {
                let key = (document.case_id.clone(), document.version);
                if pending.remove(&key).is_some() {
                    debug!(case_id = %key.0, version = key.1, "Superseded queued edit");
                }
                let outcome = write_with_retry(repo.as_ref(), &document, config.retry).await;
                let _ = reply.send(outcome);
            }
            Some(Command::Flush(done)) => {
                write_pending(repo.as_ref(), config.retry, &mut pending, &reports).await;
                deadline = None;
                let _ = done.send(());
            }
            None => {
                write_pending(repo.as_ref(), config.retry, &mut pending, &reports).await;
                info!("Outbox closed");
                return;
            }
        }
    }
}

async fn write_pending<R: CaseRepository>(
    repo: &R,
    policy: RetryPolicy,
    pending: &mut Pending,
    reports: &mpsc::UnboundedSender<SaveReport>,
) {
    for ((case_id, version), mut document) in std::mem::take(pending) {
        document.as_at_date = Some(Utc::now());
        let outcome = write_with_retry(repo, &document, policy).await;
        if let Err(err) = &outcome {
            warn!(%case_id, version, error = %err, "Statement save failed");
        }
        let _ = reports.send(SaveReport {
            case_id,
            version,
            outcome,
        });
    }
}
