use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use super::{CaseRepository, Outbox, OutboxConfig, StoreError, heal_document};
use crate::core::{
    CaseLedgers, Edit, EditError, SoADocument, WaterfallResult, apply_all, compute_with_chart,
};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Edit(#[from] EditError),
}

/// A statement together with everything derived from it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Computed {
    pub document: SoADocument,
    pub result: WaterfallResult,
    /// Last background save failure for this case, cleared by the next success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_error: Option<String>,
}

type SaveErrors = Arc<StdMutex<HashMap<String, String>>>;

/// Holds the current draft per case and mediates between edits, the pure
/// engine and the repository.
pub struct SoaService<R> {
    repo: Arc<R>,
    drafts: Mutex<HashMap<String, SoADocument>>,
    outbox: Outbox,
    save_errors: SaveErrors,
}

impl<R: CaseRepository> SoaService<R> {
    pub fn new(repo: Arc<R>, config: OutboxConfig) -> Self {
        let (outbox, mut reports) = Outbox::spawn(repo.clone(), config);
        let save_errors = SaveErrors::default();
        let errors = save_errors.clone();
        tokio::spawn(async move {
            while let Some(report) = reports.recv().await {
                let mut failures = match errors.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                match report.outcome {
                    Ok(attempts) => {
                        info!(
                            case_id = %report.case_id,
                            version = report.version,
                            attempts,
                            "Statement saved"
                        );
                        failures.remove(&report.case_id);
                    }
                    Err(err) => {
                        error!(
                            case_id = %report.case_id,
                            version = report.version,
                            error = %err,
                            "Background save abandoned; draft kept in memory"
                        );
                        failures.insert(report.case_id, err.to_string());
                    }
                }
            }
        });

        Self {
            repo,
            drafts: Mutex::new(HashMap::new()),
            outbox,
            save_errors,
        }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repo
    }

    /// Writes any debounced edits now.
    pub async fn flush(&self) {
        self.outbox.flush().await;
    }

    pub fn save_error(&self, case_id: &str) -> Option<String> {
        match self.save_errors.lock() {
            Ok(errors) => errors.get(case_id).cloned(),
            Err(poisoned) => poisoned.into_inner().get(case_id).cloned(),
        }
    }

    /// Current draft for the case: the in-memory copy if one exists, otherwise
    /// the latest stored version healed, otherwise a draft seeded from the
    /// live ledgers.
    pub async fn load(&self, case_id: &str) -> Result<Computed, ServiceError> {
        let ledgers = self.repo.ledgers(case_id).await?;
        let mut drafts = self.drafts.lock().await;
        let document = match drafts.get(case_id) {
            Some(document) => document.clone(),
            None => {
                let document = self.fetch(case_id, &ledgers).await?;
                drafts.insert(case_id.to_string(), document.clone());
                document
            }
        };
        drop(drafts);
        Ok(self.computed(document, &ledgers))
    }

    /// Persists the document immediately as the case's current draft. Edits
    /// still waiting out the debounce for the same version are discarded.
    pub async fn save(
        &self,
        case_id: &str,
        mut document: SoADocument,
    ) -> Result<Computed, ServiceError> {
        let ledgers = self.repo.ledgers(case_id).await?;
        let write = {
            let mut drafts = self.drafts.lock().await;
            document.case_id = case_id.to_string();
            if document.version == 0 {
                document.version = drafts.get(case_id).map_or(1, |draft| draft.version);
            }
            document.as_at_date = Some(Utc::now());
            drafts.insert(case_id.to_string(), document.clone());
            self.outbox.write_now(document.clone())
        };
        let attempts = write.await?;
        info!(case_id, version = document.version, attempts, "Statement saved");
        self.clear_save_error(case_id);
        Ok(self.computed(document, &ledgers))
    }

    /// Applies a batch of edits to the draft and queues a debounced save.
    pub async fn edit(&self, case_id: &str, edits: Vec<Edit>) -> Result<Computed, ServiceError> {
        self.update(case_id, |document, _| {
            apply_all(document, edits).map_err(ServiceError::from)
        })
        .await
    }

    /// Starts the next version from the current draft. The previous version is
    /// left as last written. If the write fails the draft stays on the old
    /// version.
    pub async fn new_version(&self, case_id: &str) -> Result<Computed, ServiceError> {
        let ledgers = self.repo.ledgers(case_id).await?;
        let (previous, next, write) = {
            let mut drafts = self.drafts.lock().await;
            let current = match drafts.get(case_id) {
                Some(document) => document.clone(),
                None => self.fetch(case_id, &ledgers).await?,
            };
            let mut next = current.clone();
            next.version += 1;
            next.as_at_date = Some(Utc::now());
            drafts.insert(case_id.to_string(), next.clone());
            let write = self.outbox.write_now(next.clone());
            (current, next, write)
        };
        if let Err(err) = write.await {
            let mut drafts = self.drafts.lock().await;
            if drafts.get(case_id) == Some(&next) {
                drafts.insert(case_id.to_string(), previous);
            }
            return Err(err.into());
        }
        info!(case_id, version = next.version, "Started new statement version");
        Ok(self.computed(next, &ledgers))
    }

    /// Replaces Schedule C with the live creditor and employee ledgers.
    pub async fn sync_creditors(&self, case_id: &str) -> Result<Computed, ServiceError> {
        self.update(case_id, |document, ledgers| {
            let mut next = document.clone();
            next.schedule_c = ledgers.schedule_c();
            Ok(next)
        })
        .await
    }

    /// Replaces Schedule D with the live shareholder register.
    pub async fn sync_shareholders(&self, case_id: &str) -> Result<Computed, ServiceError> {
        self.update(case_id, |document, ledgers| {
            let mut next = document.clone();
            next.schedule_d = ledgers.schedule_d();
            Ok(next)
        })
        .await
    }

    async fn update<F>(&self, case_id: &str, change: F) -> Result<Computed, ServiceError>
    where
        F: FnOnce(&SoADocument, &CaseLedgers) -> Result<SoADocument, ServiceError>,
    {
        let ledgers = self.repo.ledgers(case_id).await?;
        let mut drafts = self.drafts.lock().await;
        let current = match drafts.get(case_id) {
            Some(document) => document.clone(),
            None => self.fetch(case_id, &ledgers).await?,
        };
        let next = change(&current, &ledgers)?;
        drafts.insert(case_id.to_string(), next.clone());
        drop(drafts);
        if !self.outbox.enqueue(next.clone()) {
            warn!(case_id, "Save queue stopped; edit kept in memory only");
        }
        Ok(self.computed(next, &ledgers))
    }

    async fn fetch(&self, case_id: &str, ledgers: &CaseLedgers) -> Result<SoADocument, StoreError> {
        match self.repo.latest_document(case_id).await? {
            Some(raw) => {
                let (document, report) = heal_document(case_id, raw);
                if !report.is_clean() {
                    warn!(
                        case_id,
                        backfilled_ids = report.backfilled_ids,
                        reset = ?report.reset,
                        "Healed stored statement"
                    );
                }
                Ok(document)
            }
            None => {
                info!(case_id, "No saved statement; seeding from ledgers");
                Ok(SoADocument::seeded(case_id, ledgers))
            }
        }
    }

    fn computed(&self, document: SoADocument, ledgers: &CaseLedgers) -> Computed {
        let (document, result) = compute_with_chart(&document, &ledgers.chart_of_accounts);
        for warning in &result.warnings {
            warn!(case_id = %document.case_id, %warning, "Statement warning");
        }
        let save_error = self.save_error(&document.case_id);
        Computed {
            document,
            result,
            save_error,
        }
    }

    fn clear_save_error(&self, case_id: &str) {
        match self.save_errors.lock() {
            Ok(mut errors) => errors.remove(case_id),
            Err(poisoned) => poisoned.into_inner().remove(case_id),
        };
    }
}
