use std::str::FromStr;

use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::tld::{
        ImportProgress, TldEntry, TldImportLog, TldRepo, UpsertOutcome,
    },
    domain::entities::tld::{ImportMode, ImportStatus},
};

const TLD_COLS: &str =
    "id, tld, rdap_url, whois_server, source, last_checked_at, created_at, updated_at";

const LOG_COLS: &str = r#"
    id, mode, status, total, processed, imported, updated, failed,
    last_tld, error, started_at, finished_at
"#;

fn row_to_entry(row: sqlx::postgres::PgRow) -> TldEntry {
    TldEntry {
        id: row.get("id"),
        tld: row.get("tld"),
        rdap_url: row.get("rdap_url"),
        whois_server: row.get("whois_server"),
        source: row.get("source"),
        last_checked_at: row.get("last_checked_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_log(row: sqlx::postgres::PgRow) -> TldImportLog {
    let mode: String = row.get("mode");
    let status: String = row.get("status");
    TldImportLog {
        id: row.get("id"),
        mode: ImportMode::from_str(&mode).unwrap_or(ImportMode::Full),
        status: ImportStatus::from_str(&status).unwrap_or(ImportStatus::Failed),
        total: row.get("total"),
        processed: row.get("processed"),
        imported: row.get("imported"),
        updated: row.get("updated"),
        failed: row.get("failed"),
        last_tld: row.get("last_tld"),
        error: row.get("error"),
        started_at: row.get("started_at"),
        finished_at: row.get("finished_at"),
    }
}

#[async_trait]
impl TldRepo for PostgresPersistence {
    async fn upsert(
        &self,
        tld: &str,
        rdap_url: Option<&str>,
        whois_server: Option<&str>,
        source: &str,
    ) -> AppResult<UpsertOutcome> {
        let existing = self.get_by_tld(tld).await?;

        match existing {
            None => {
                let id = Uuid::new_v4();
                sqlx::query(
                    r#"
                        INSERT INTO tld_registry (id, tld, rdap_url, whois_server, source, last_checked_at)
                        VALUES ($1, $2, $3, $4, $5, CURRENT_TIMESTAMP)
                    "#,
                )
                .bind(id)
                .bind(tld)
                .bind(rdap_url)
                .bind(whois_server)
                .bind(source)
                .execute(self.pool())
                .await
                .map_err(AppError::from)?;
                Ok(UpsertOutcome::Inserted)
            }
            Some(entry) => {
                let unchanged = entry.rdap_url.as_deref() == rdap_url
                    && entry.whois_server.as_deref() == whois_server
                    && entry.source == source;

                if unchanged {
                    sqlx::query(
                        "UPDATE tld_registry SET last_checked_at = CURRENT_TIMESTAMP WHERE id = $1",
                    )
                    .bind(entry.id)
                    .execute(self.pool())
                    .await
                    .map_err(AppError::from)?;
                    Ok(UpsertOutcome::Unchanged)
                } else {
                    sqlx::query(
                        r#"
                            UPDATE tld_registry
                            SET rdap_url = $2,
                                whois_server = $3,
                                source = $4,
                                last_checked_at = CURRENT_TIMESTAMP,
                                updated_at = CURRENT_TIMESTAMP
                            WHERE id = $1
                        "#,
                    )
                    .bind(entry.id)
                    .bind(rdap_url)
                    .bind(whois_server)
                    .bind(source)
                    .execute(self.pool())
                    .await
                    .map_err(AppError::from)?;
                    Ok(UpsertOutcome::Updated)
                }
            }
        }
    }

    async fn get_by_tld(&self, tld: &str) -> AppResult<Option<TldEntry>> {
        let row = sqlx::query(&format!("SELECT {TLD_COLS} FROM tld_registry WHERE tld = $1"))
            .bind(tld)
            .fetch_optional(self.pool())
            .await
            .map_err(AppError::from)?;
        Ok(row.map(row_to_entry))
    }

    async fn list(
        &self,
        q: Option<&str>,
        page: i64,
        per_page: i64,
    ) -> AppResult<(Vec<TldEntry>, i64)> {
        let offset = (page - 1) * per_page;
        let rows = sqlx::query(&format!(
            r#"
                SELECT {TLD_COLS}, COUNT(*) OVER() AS total_count
                FROM tld_registry
                WHERE ($1::text IS NULL OR tld LIKE $1 || '%')
                ORDER BY tld ASC
                LIMIT $2 OFFSET $3
            "#,
        ))
        .bind(q)
        .bind(per_page)
        .bind(offset)
        .fetch_all(self.pool())
        .await
        .map_err(AppError::from)?;

        let total = rows
            .first()
            .map(|r| r.get::<i64, _>("total_count"))
            .unwrap_or(0);
        Ok((rows.into_iter().map(row_to_entry).collect(), total))
    }

    async fn create_import_log(&self, mode: ImportMode) -> AppResult<TldImportLog> {
        let id = Uuid::new_v4();
        let row = sqlx::query(&format!(
            r#"
                INSERT INTO tld_import_logs (id, mode, status)
                VALUES ($1, $2, 'running')
                RETURNING {LOG_COLS}
            "#,
        ))
        .bind(id)
        .bind(mode.as_ref())
        .fetch_one(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row_to_log(row))
    }

    async fn get_import_log(&self, log_id: Uuid) -> AppResult<Option<TldImportLog>> {
        let row = sqlx::query(&format!(
            "SELECT {LOG_COLS} FROM tld_import_logs WHERE id = $1"
        ))
        .bind(log_id)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row.map(row_to_log))
    }

    async fn get_running_import(&self) -> AppResult<Option<TldImportLog>> {
        let row = sqlx::query(&format!(
            r#"
                SELECT {LOG_COLS} FROM tld_import_logs
                WHERE status = 'running'
                ORDER BY started_at DESC
                LIMIT 1
            "#,
        ))
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row.map(row_to_log))
    }

    async fn update_import_progress(
        &self,
        log_id: Uuid,
        progress: &ImportProgress,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
                UPDATE tld_import_logs
                SET total = COALESCE($2, total),
                    processed = $3,
                    imported = $4,
                    updated = $5,
                    failed = $6,
                    last_tld = COALESCE($7, last_tld)
                WHERE id = $1
            "#,
        )
        .bind(log_id)
        .bind(progress.total)
        .bind(progress.processed)
        .bind(progress.imported)
        .bind(progress.updated)
        .bind(progress.failed)
        .bind(progress.last_tld.as_deref())
        .execute(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    async fn finish_import_log(
        &self,
        log_id: Uuid,
        status: ImportStatus,
        error: Option<&str>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
                UPDATE tld_import_logs
                SET status = $2, error = $3, finished_at = CURRENT_TIMESTAMP
                WHERE id = $1
            "#,
        )
        .bind(log_id)
        .bind(status.as_ref())
        .bind(error)
        .execute(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    async fn latest_import(&self) -> AppResult<Option<TldImportLog>> {
        let row = sqlx::query(&format!(
            "SELECT {LOG_COLS} FROM tld_import_logs ORDER BY started_at DESC LIMIT 1"
        ))
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row.map(row_to_log))
    }
}
