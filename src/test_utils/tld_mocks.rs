//! In-memory implementation of the TLD registry repository trait.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::tld::{
        ImportProgress, TldEntry, TldImportLog, TldRepo, UpsertOutcome,
    },
    domain::entities::tld::{ImportMode, ImportStatus},
};

#[derive(Default)]
pub struct InMemoryTldRepo {
    tlds: Mutex<HashMap<String, TldEntry>>,
    logs: Mutex<HashMap<Uuid, TldImportLog>>,
}

impl InMemoryTldRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_entry(&self, entry: TldEntry) {
        self.tlds.lock().unwrap().insert(entry.tld.clone(), entry);
    }
}

#[async_trait]
impl TldRepo for InMemoryTldRepo {
    async fn upsert(
        &self,
        tld: &str,
        rdap_url: Option<&str>,
        whois_server: Option<&str>,
        source: &str,
    ) -> AppResult<UpsertOutcome> {
        let mut tlds = self.tlds.lock().unwrap();
        let now = Utc::now().naive_utc();

        match tlds.get_mut(tld) {
            None => {
                tlds.insert(
                    tld.to_string(),
                    TldEntry {
                        id: Uuid::new_v4(),
                        tld: tld.to_string(),
                        rdap_url: rdap_url.map(str::to_string),
                        whois_server: whois_server.map(str::to_string),
                        source: source.to_string(),
                        last_checked_at: Some(now),
                        created_at: Some(now),
                        updated_at: Some(now),
                    },
                );
                Ok(UpsertOutcome::Inserted)
            }
            Some(entry) => {
                let unchanged = entry.rdap_url.as_deref() == rdap_url
                    && entry.whois_server.as_deref() == whois_server
                    && entry.source == source;
                entry.last_checked_at = Some(now);
                if unchanged {
                    Ok(UpsertOutcome::Unchanged)
                } else {
                    entry.rdap_url = rdap_url.map(str::to_string);
                    entry.whois_server = whois_server.map(str::to_string);
                    entry.source = source.to_string();
                    entry.updated_at = Some(now);
                    Ok(UpsertOutcome::Updated)
                }
            }
        }
    }

    async fn get_by_tld(&self, tld: &str) -> AppResult<Option<TldEntry>> {
        Ok(self.tlds.lock().unwrap().get(tld).cloned())
    }

    async fn list(
        &self,
        q: Option<&str>,
        page: i64,
        per_page: i64,
    ) -> AppResult<(Vec<TldEntry>, i64)> {
        let tlds = self.tlds.lock().unwrap();
        let mut matched: Vec<TldEntry> = tlds
            .values()
            .filter(|e| q.is_none_or(|q| e.tld.starts_with(q)))
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.tld.cmp(&b.tld));

        let total = matched.len() as i64;
        let start = ((page - 1) * per_page) as usize;
        let page: Vec<TldEntry> = matched.into_iter().skip(start).take(per_page as usize).collect();
        Ok((page, total))
    }

    async fn create_import_log(&self, mode: ImportMode) -> AppResult<TldImportLog> {
        let log = TldImportLog {
            id: Uuid::new_v4(),
            mode,
            status: ImportStatus::Running,
            total: 0,
            processed: 0,
            imported: 0,
            updated: 0,
            failed: 0,
            last_tld: None,
            error: None,
            started_at: Some(Utc::now().naive_utc()),
            finished_at: None,
        };
        self.logs.lock().unwrap().insert(log.id, log.clone());
        Ok(log)
    }

    async fn get_import_log(&self, log_id: Uuid) -> AppResult<Option<TldImportLog>> {
        Ok(self.logs.lock().unwrap().get(&log_id).cloned())
    }

    async fn get_running_import(&self) -> AppResult<Option<TldImportLog>> {
        let logs = self.logs.lock().unwrap();
        let mut running: Vec<&TldImportLog> = logs
            .values()
            .filter(|l| l.status == ImportStatus::Running)
            .collect();
        running.sort_by_key(|l| l.started_at);
        Ok(running.last().map(|l| (*l).clone()))
    }

    async fn update_import_progress(
        &self,
        log_id: Uuid,
        progress: &ImportProgress,
    ) -> AppResult<()> {
        let mut logs = self.logs.lock().unwrap();
        let log = logs.get_mut(&log_id).ok_or(AppError::NotFound)?;
        if let Some(total) = progress.total {
            log.total = total;
        }
        log.processed = progress.processed;
        log.imported = progress.imported;
        log.updated = progress.updated;
        log.failed = progress.failed;
        if let Some(last_tld) = &progress.last_tld {
            log.last_tld = Some(last_tld.clone());
        }
        Ok(())
    }

    async fn finish_import_log(
        &self,
        log_id: Uuid,
        status: ImportStatus,
        error: Option<&str>,
    ) -> AppResult<()> {
        let mut logs = self.logs.lock().unwrap();
        let log = logs.get_mut(&log_id).ok_or(AppError::NotFound)?;
        log.status = status;
        log.error = error.map(str::to_string);
        log.finished_at = Some(Utc::now().naive_utc());
        Ok(())
    }

    async fn latest_import(&self) -> AppResult<Option<TldImportLog>> {
        let logs = self.logs.lock().unwrap();
        let mut all: Vec<&TldImportLog> = logs.values().collect();
        all.sort_by_key(|l| l.started_at);
        Ok(all.last().map(|l| (*l).clone()))
    }
}
