use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::app_error::{AppError, AppResult};
use crate::application::validators::tld_of;
use crate::domain::entities::tld::{ImportMode, ImportStatus};

/// Progress counters are flushed to the log row this often, so a poll of the
/// import-progress endpoint observes a live run advancing.
const PROGRESS_FLUSH_EVERY: i32 = 25;

/// A `running` import log untouched for this long belongs to a dead process
/// and may be superseded.
const STALE_IMPORT_MINS: i64 = 60;

#[derive(Debug, Clone)]
pub struct TldEntry {
    pub id: Uuid,
    pub tld: String,
    pub rdap_url: Option<String>,
    pub whois_server: Option<String>,
    pub source: String,
    pub last_checked_at: Option<NaiveDateTime>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone)]
pub struct TldImportLog {
    pub id: Uuid,
    pub mode: ImportMode,
    pub status: ImportStatus,
    pub total: i32,
    pub processed: i32,
    pub imported: i32,
    pub updated: i32,
    pub failed: i32,
    pub last_tld: Option<String>,
    pub error: Option<String>,
    pub started_at: Option<NaiveDateTime>,
    pub finished_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    Unchanged,
}

/// Checkpointed counters pushed to the import log row.
#[derive(Debug, Clone, Default)]
pub struct ImportProgress {
    pub total: Option<i32>,
    pub processed: i32,
    pub imported: i32,
    pub updated: i32,
    pub failed: i32,
    pub last_tld: Option<String>,
}

#[async_trait]
pub trait TldRepo: Send + Sync {
    async fn upsert(
        &self,
        tld: &str,
        rdap_url: Option<&str>,
        whois_server: Option<&str>,
        source: &str,
    ) -> AppResult<UpsertOutcome>;
    async fn get_by_tld(&self, tld: &str) -> AppResult<Option<TldEntry>>;
    async fn list(&self, q: Option<&str>, page: i64, per_page: i64)
    -> AppResult<(Vec<TldEntry>, i64)>;

    async fn create_import_log(&self, mode: ImportMode) -> AppResult<TldImportLog>;
    async fn get_import_log(&self, log_id: Uuid) -> AppResult<Option<TldImportLog>>;
    async fn get_running_import(&self) -> AppResult<Option<TldImportLog>>;
    async fn update_import_progress(
        &self,
        log_id: Uuid,
        progress: &ImportProgress,
    ) -> AppResult<()>;
    async fn finish_import_log(
        &self,
        log_id: Uuid,
        status: ImportStatus,
        error: Option<&str>,
    ) -> AppResult<()>;
    async fn latest_import(&self) -> AppResult<Option<TldImportLog>>;
}

/// IANA-facing directory of TLDs and their registry endpoints.
#[async_trait]
pub trait TldDirectoryClient: Send + Sync {
    /// The full TLD list, lower-cased, without comment lines.
    async fn fetch_tld_list(&self) -> AppResult<Vec<String>>;
    /// RDAP bootstrap mapping of TLD to base URL.
    async fn fetch_rdap_bootstrap(&self) -> AppResult<HashMap<String, String>>;
    /// The authoritative WHOIS server for a TLD, from IANA's own WHOIS.
    async fn whois_referral(&self, tld: &str) -> AppResult<Option<String>>;
}

#[derive(Clone)]
pub struct TldUseCases {
    repo: Arc<dyn TldRepo>,
    directory: Arc<dyn TldDirectoryClient>,
    whois_delay_ms: u64,
}

impl TldUseCases {
    pub fn new(
        repo: Arc<dyn TldRepo>,
        directory: Arc<dyn TldDirectoryClient>,
        whois_delay_ms: u64,
    ) -> Self {
        Self {
            repo,
            directory,
            whois_delay_ms,
        }
    }

    /// Open a new import log, refusing while another import is live.
    ///
    /// A `running` log that has not advanced within the stale window is
    /// closed as failed and superseded, so a crashed import never wedges the
    /// subsystem.
    #[instrument(skip(self))]
    pub async fn start_import(&self, mode: ImportMode) -> AppResult<TldImportLog> {
        if let Some(running) = self.repo.get_running_import().await? {
            let started = running.started_at.unwrap_or_else(|| Utc::now().naive_utc());
            let age_mins = (Utc::now().naive_utc() - started).num_minutes();
            if age_mins < STALE_IMPORT_MINS {
                return Err(AppError::Conflict("An import is already running".into()));
            }
            warn!(log_id = %running.id, age_mins, "Superseding stale import log");
            self.repo
                .finish_import_log(
                    running.id,
                    ImportStatus::Failed,
                    Some("superseded: no progress within the stale window"),
                )
                .await?;
        }
        self.repo.create_import_log(mode).await
    }

    /// Run an import against an open log. Returns the final log row.
    #[instrument(skip(self), fields(log_id = %log_id))]
    pub async fn run_import(&self, log_id: Uuid, mode: ImportMode) -> AppResult<TldImportLog> {
        match self.run_import_inner(log_id, mode).await {
            Ok(()) => {
                self.repo
                    .finish_import_log(log_id, ImportStatus::Completed, None)
                    .await?;
            }
            Err(e) => {
                warn!(error = %e, "TLD import failed");
                self.repo
                    .finish_import_log(log_id, ImportStatus::Failed, Some(&e.to_string()))
                    .await?;
            }
        }
        self.repo
            .get_import_log(log_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    async fn run_import_inner(&self, log_id: Uuid, mode: ImportMode) -> AppResult<()> {
        let tlds = self.directory.fetch_tld_list().await?;
        let bootstrap = if mode.wants_rdap() {
            self.directory.fetch_rdap_bootstrap().await?
        } else {
            HashMap::new()
        };

        let mut progress = ImportProgress {
            total: Some(tlds.len() as i32),
            ..Default::default()
        };
        self.repo.update_import_progress(log_id, &progress).await?;
        progress.total = None;

        info!(total = tlds.len(), mode = mode.as_ref(), "TLD import started");

        for tld in &tlds {
            let existing = self.repo.get_by_tld(tld).await?;

            // Update-checking only refreshes what was already imported.
            if mode == ImportMode::CheckUpdates && existing.is_none() {
                progress.processed += 1;
                progress.last_tld = Some(tld.clone());
                self.maybe_flush(log_id, &mut progress).await?;
                continue;
            }

            let rdap_url = bootstrap.get(tld.as_str()).map(String::as_str);

            let whois_server = if mode.wants_whois() {
                if self.whois_delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(self.whois_delay_ms)).await;
                }
                match self.directory.whois_referral(tld).await {
                    Ok(server) => server,
                    Err(e) => {
                        warn!(tld = %tld, error = %e, "WHOIS referral lookup failed");
                        progress.failed += 1;
                        progress.processed += 1;
                        progress.last_tld = Some(tld.clone());
                        self.maybe_flush(log_id, &mut progress).await?;
                        continue;
                    }
                }
            } else {
                existing.as_ref().and_then(|e| e.whois_server.clone())
            };

            let rdap_url = match rdap_url {
                Some(u) => Some(u.to_string()),
                None if !mode.wants_rdap() => existing.as_ref().and_then(|e| e.rdap_url.clone()),
                None => None,
            };
            let source = if rdap_url.is_some() { "rdap" } else { "whois" };

            match self
                .repo
                .upsert(tld, rdap_url.as_deref(), whois_server.as_deref(), source)
                .await
            {
                Ok(UpsertOutcome::Inserted) => progress.imported += 1,
                Ok(UpsertOutcome::Updated) => progress.updated += 1,
                Ok(UpsertOutcome::Unchanged) => {}
                Err(e) => {
                    warn!(tld = %tld, error = %e, "TLD upsert failed");
                    progress.failed += 1;
                }
            }

            progress.processed += 1;
            progress.last_tld = Some(tld.clone());
            self.maybe_flush(log_id, &mut progress).await?;
        }

        self.repo.update_import_progress(log_id, &progress).await?;
        info!(
            processed = progress.processed,
            imported = progress.imported,
            updated = progress.updated,
            failed = progress.failed,
            "TLD import finished"
        );
        Ok(())
    }

    async fn maybe_flush(&self, log_id: Uuid, progress: &mut ImportProgress) -> AppResult<()> {
        if progress.processed % PROGRESS_FLUSH_EVERY == 0 {
            self.repo.update_import_progress(log_id, progress).await?;
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn import_progress(&self, log_id: Uuid) -> AppResult<TldImportLog> {
        self.repo
            .get_import_log(log_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn latest_import(&self) -> AppResult<Option<TldImportLog>> {
        self.repo.latest_import().await
    }

    #[instrument(skip(self))]
    pub async fn list_tlds(
        &self,
        q: Option<&str>,
        page: i64,
        per_page: i64,
    ) -> AppResult<(Vec<TldEntry>, i64)> {
        self.repo
            .list(q, page.max(1), per_page.clamp(1, 200))
            .await
    }

    /// TLD metadata for a domain name.
    #[instrument(skip(self))]
    pub async fn tld_info(&self, domain: &str) -> AppResult<TldEntry> {
        let normalized = domain.trim().trim_end_matches('.').to_lowercase();
        let tld = tld_of(&normalized)
            .ok_or_else(|| AppError::InvalidInput("Domain has no TLD".into()))?;
        self.repo.get_by_tld(tld).await?.ok_or(AppError::NotFound)
    }
}
