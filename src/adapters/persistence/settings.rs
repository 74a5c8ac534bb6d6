use async_trait::async_trait;
use sqlx::Row;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::settings::{SettingEntry, SettingsRepo},
};

fn row_to_entry(row: sqlx::postgres::PgRow) -> SettingEntry {
    SettingEntry {
        key: row.get("key"),
        value: row.get("value"),
        is_secret: row.get("is_secret"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl SettingsRepo for PostgresPersistence {
    async fn get(&self, key: &str) -> AppResult<Option<SettingEntry>> {
        let row = sqlx::query("SELECT key, value, is_secret, updated_at FROM settings WHERE key = $1")
            .bind(key)
            .fetch_optional(self.pool())
            .await
            .map_err(AppError::from)?;
        Ok(row.map(row_to_entry))
    }

    async fn get_all(&self) -> AppResult<Vec<SettingEntry>> {
        let rows = sqlx::query("SELECT key, value, is_secret, updated_at FROM settings ORDER BY key")
            .fetch_all(self.pool())
            .await
            .map_err(AppError::from)?;
        Ok(rows.into_iter().map(row_to_entry).collect())
    }

    async fn upsert(&self, key: &str, value: &str, is_secret: bool) -> AppResult<()> {
        sqlx::query(
            r#"
                INSERT INTO settings (key, value, is_secret)
                VALUES ($1, $2, $3)
                ON CONFLICT (key) DO UPDATE
                SET value = EXCLUDED.value,
                    is_secret = EXCLUDED.is_secret,
                    updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(is_secret)
        .execute(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(())
    }
}
