use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::{PostgresPersistence, parse_json_with_fallback},
    app_error::{AppError, AppResult},
    application::use_cases::domain::{
        DomainListFilter, DomainProfile, DomainRepo, PortfolioStats, RegistryInfo,
        UpdateDomainInput,
    },
    domain::entities::domain::DomainStatus,
};

const SELECT_COLS: &str = r#"
    id, user_id, name, registrar, registered_at, expires_at, last_checked_at,
    status, nameservers, notification_group_id, auto_renew, notes,
    created_at, updated_at
"#;

fn row_to_profile(row: sqlx::postgres::PgRow) -> DomainProfile {
    let id: Uuid = row.get("id");
    let nameservers_json: serde_json::Value = row.get("nameservers");
    DomainProfile {
        id,
        user_id: row.get("user_id"),
        name: row.get("name"),
        registrar: row.get("registrar"),
        registered_at: row.get("registered_at"),
        expires_at: row.get("expires_at"),
        last_checked_at: row.get("last_checked_at"),
        status: DomainStatus::from_str(row.get("status")),
        nameservers: parse_json_with_fallback(
            &nameservers_json,
            "nameservers",
            "domain",
            &id.to_string(),
        ),
        notification_group_id: row.get("notification_group_id"),
        auto_renew: row.get("auto_renew"),
        notes: row.get("notes"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl DomainRepo for PostgresPersistence {
    async fn create(&self, user_id: Uuid, name: &str) -> AppResult<DomainProfile> {
        let id = Uuid::new_v4();
        let row = sqlx::query(&format!(
            r#"
                INSERT INTO domains (id, user_id, name, status)
                VALUES ($1, $2, $3, 'unknown')
                RETURNING {SELECT_COLS}
            "#,
        ))
        .bind(id)
        .bind(user_id)
        .bind(name)
        .fetch_one(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row_to_profile(row))
    }

    async fn get_by_id(&self, domain_id: Uuid) -> AppResult<Option<DomainProfile>> {
        let row = sqlx::query(&format!("SELECT {SELECT_COLS} FROM domains WHERE id = $1"))
            .bind(domain_id)
            .fetch_optional(self.pool())
            .await
            .map_err(AppError::from)?;
        Ok(row.map(row_to_profile))
    }

    async fn list_by_user(
        &self,
        user_id: Uuid,
        filter: &DomainListFilter,
    ) -> AppResult<(Vec<DomainProfile>, i64)> {
        let per_page = filter.per_page.clamp(1, 100);
        let offset = (filter.page.max(1) - 1) * per_page;
        let status = filter.status.map(|s| s.as_str().to_string());

        let rows = sqlx::query(&format!(
            r#"
                SELECT {SELECT_COLS}, COUNT(*) OVER() AS total_count
                FROM domains
                WHERE user_id = $1
                  AND ($2::text IS NULL OR status = $2)
                  AND ($3::text IS NULL OR name LIKE '%' || $3 || '%')
                ORDER BY expires_at ASC NULLS LAST, name ASC
                LIMIT $4 OFFSET $5
            "#,
        ))
        .bind(user_id)
        .bind(status)
        .bind(filter.q.as_deref())
        .bind(per_page)
        .bind(offset)
        .fetch_all(self.pool())
        .await
        .map_err(AppError::from)?;

        let total = rows
            .first()
            .map(|r| r.get::<i64, _>("total_count"))
            .unwrap_or(0);
        Ok((rows.into_iter().map(row_to_profile).collect(), total))
    }

    async fn suggest(&self, user_id: Uuid, prefix: &str, limit: i64) -> AppResult<Vec<String>> {
        let rows = sqlx::query(
            r#"
                SELECT name FROM domains
                WHERE user_id = $1 AND name LIKE $2 || '%'
                ORDER BY name ASC
                LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(prefix)
        .bind(limit)
        .fetch_all(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(rows.into_iter().map(|r| r.get("name")).collect())
    }

    async fn update(&self, domain_id: Uuid, input: &UpdateDomainInput) -> AppResult<DomainProfile> {
        let row = sqlx::query(&format!(
            r#"
                UPDATE domains
                SET registrar = COALESCE($2, registrar),
                    expires_at = COALESCE($3, expires_at),
                    auto_renew = COALESCE($4, auto_renew),
                    notes = COALESCE($5, notes),
                    updated_at = CURRENT_TIMESTAMP
                WHERE id = $1
                RETURNING {SELECT_COLS}
            "#,
        ))
        .bind(domain_id)
        .bind(input.registrar.as_deref())
        .bind(input.expires_at)
        .bind(input.auto_renew)
        .bind(input.notes.as_deref())
        .fetch_one(self.pool())
        .await
        .map_err(AppError::from)?;

        // Group assignment supports clearing, so it cannot ride COALESCE.
        if let Some(group_id) = input.notification_group_id {
            let row = sqlx::query(&format!(
                r#"
                    UPDATE domains
                    SET notification_group_id = $2, updated_at = CURRENT_TIMESTAMP
                    WHERE id = $1
                    RETURNING {SELECT_COLS}
                "#,
            ))
            .bind(domain_id)
            .bind(group_id)
            .fetch_one(self.pool())
            .await
            .map_err(AppError::from)?;
            return Ok(row_to_profile(row));
        }
        Ok(row_to_profile(row))
    }

    async fn set_status(&self, domain_id: Uuid, status: DomainStatus) -> AppResult<()> {
        sqlx::query(
            "UPDATE domains SET status = $2, updated_at = CURRENT_TIMESTAMP WHERE id = $1",
        )
        .bind(domain_id)
        .bind(status.as_str())
        .execute(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    async fn record_check(
        &self,
        domain_id: Uuid,
        info: &RegistryInfo,
        nameservers: &[String],
        status: DomainStatus,
        checked_at: NaiveDateTime,
    ) -> AppResult<DomainProfile> {
        let ns_json = serde_json::to_value(nameservers)
            .map_err(|e| AppError::Internal(e.to_string()))?;
        let row = sqlx::query(&format!(
            r#"
                UPDATE domains
                SET registrar = $2,
                    registered_at = $3,
                    expires_at = $4,
                    nameservers = $5,
                    status = $6,
                    last_checked_at = $7,
                    updated_at = CURRENT_TIMESTAMP
                WHERE id = $1
                RETURNING {SELECT_COLS}
            "#,
        ))
        .bind(domain_id)
        .bind(info.registrar.as_deref())
        .bind(info.registered_at)
        .bind(info.expires_at)
        .bind(ns_json)
        .bind(status.as_str())
        .bind(checked_at)
        .fetch_one(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row_to_profile(row))
    }

    async fn touch_checked(&self, domain_id: Uuid, checked_at: NaiveDateTime) -> AppResult<()> {
        sqlx::query("UPDATE domains SET last_checked_at = $2 WHERE id = $1")
            .bind(domain_id)
            .bind(checked_at)
            .execute(self.pool())
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    async fn delete(&self, domain_id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM domains WHERE id = $1")
            .bind(domain_id)
            .execute(self.pool())
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    async fn assign_group(&self, domain_ids: &[Uuid], group_id: Option<Uuid>) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
                UPDATE domains
                SET notification_group_id = $2, updated_at = CURRENT_TIMESTAMP
                WHERE id = ANY($1)
            "#,
        )
        .bind(domain_ids)
        .bind(group_id)
        .execute(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(result.rows_affected())
    }

    async fn due_for_check(
        &self,
        cutoff: NaiveDateTime,
        limit: i64,
    ) -> AppResult<Vec<DomainProfile>> {
        let rows = sqlx::query(&format!(
            r#"
                SELECT {SELECT_COLS}
                FROM domains
                WHERE last_checked_at IS NULL OR last_checked_at < $1
                ORDER BY last_checked_at ASC NULLS FIRST
                LIMIT $2
            "#,
        ))
        .bind(cutoff)
        .bind(limit)
        .fetch_all(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(rows.into_iter().map(row_to_profile).collect())
    }

    async fn stats_by_user(&self, user_id: Uuid) -> AppResult<PortfolioStats> {
        let rows = sqlx::query(
            "SELECT status, COUNT(*) AS cnt FROM domains WHERE user_id = $1 GROUP BY status",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await
        .map_err(AppError::from)?;

        let mut stats = PortfolioStats::default();
        for row in rows {
            let count: i64 = row.get("cnt");
            stats.total += count;
            match DomainStatus::from_str(row.get("status")) {
                DomainStatus::Active => stats.active += count,
                DomainStatus::Expiring => stats.expiring += count,
                DomainStatus::Expired => stats.expired += count,
                DomainStatus::Unknown => stats.unknown += count,
            }
        }
        Ok(stats)
    }
}
