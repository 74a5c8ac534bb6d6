use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::auth::MagicLinkRepo,
    application::use_cases::user::{UserProfile, UserRepo},
    domain::entities::user::UserRole,
};

const SELECT_COLS: &str =
    "id, email, name, role, timezone, last_login_at, created_at, updated_at";

fn row_to_profile(row: sqlx::postgres::PgRow) -> UserProfile {
    UserProfile {
        id: row.get("id"),
        email: row.get("email"),
        name: row.get("name"),
        role: UserRole::from_str(row.get("role")),
        timezone: row.get("timezone"),
        last_login_at: row.get("last_login_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl UserRepo for PostgresPersistence {
    async fn create(&self, email: &str, name: &str, role: UserRole) -> AppResult<UserProfile> {
        let id = Uuid::new_v4();
        let row = sqlx::query(&format!(
            r#"
                INSERT INTO users (id, email, name, role)
                VALUES ($1, $2, $3, $4)
                RETURNING {SELECT_COLS}
            "#,
        ))
        .bind(id)
        .bind(email)
        .bind(name)
        .bind(role.as_str())
        .fetch_one(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row_to_profile(row))
    }

    async fn get_by_id(&self, user_id: Uuid) -> AppResult<Option<UserProfile>> {
        let row = sqlx::query(&format!("SELECT {SELECT_COLS} FROM users WHERE id = $1"))
            .bind(user_id)
            .fetch_optional(self.pool())
            .await
            .map_err(AppError::from)?;
        Ok(row.map(row_to_profile))
    }

    async fn get_by_email(&self, email: &str) -> AppResult<Option<UserProfile>> {
        let row = sqlx::query(&format!("SELECT {SELECT_COLS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(self.pool())
            .await
            .map_err(AppError::from)?;
        Ok(row.map(row_to_profile))
    }

    async fn list(&self) -> AppResult<Vec<UserProfile>> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLS} FROM users ORDER BY created_at ASC"
        ))
        .fetch_all(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(rows.into_iter().map(row_to_profile).collect())
    }

    async fn count(&self) -> AppResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM users")
            .fetch_one(self.pool())
            .await
            .map_err(AppError::from)?;
        Ok(row.get("cnt"))
    }

    async fn count_admins(&self) -> AppResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM users WHERE role = 'admin'")
            .fetch_one(self.pool())
            .await
            .map_err(AppError::from)?;
        Ok(row.get("cnt"))
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        name: &str,
        timezone: &str,
    ) -> AppResult<UserProfile> {
        let row = sqlx::query(&format!(
            r#"
                UPDATE users
                SET name = $2, timezone = $3, updated_at = CURRENT_TIMESTAMP
                WHERE id = $1
                RETURNING {SELECT_COLS}
            "#,
        ))
        .bind(user_id)
        .bind(name)
        .bind(timezone)
        .fetch_one(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row_to_profile(row))
    }

    async fn update_role(&self, user_id: Uuid, role: UserRole) -> AppResult<UserProfile> {
        let row = sqlx::query(&format!(
            r#"
                UPDATE users
                SET role = $2, updated_at = CURRENT_TIMESTAMP
                WHERE id = $1
                RETURNING {SELECT_COLS}
            "#,
        ))
        .bind(user_id)
        .bind(role.as_str())
        .fetch_one(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row_to_profile(row))
    }

    async fn touch_last_login(&self, user_id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE users SET last_login_at = CURRENT_TIMESTAMP WHERE id = $1")
            .bind(user_id)
            .execute(self.pool())
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    async fn delete(&self, user_id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(self.pool())
            .await
            .map_err(AppError::from)?;
        Ok(())
    }
}

#[async_trait]
impl MagicLinkRepo for PostgresPersistence {
    async fn create_magic_link(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: NaiveDateTime,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
                INSERT INTO magic_links (token_hash, user_id, expires_at)
                VALUES ($1, $2, $3)
            "#,
        )
        .bind(token_hash)
        .bind(user_id)
        .bind(expires_at)
        .execute(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    async fn get_valid_magic_link(
        &self,
        token_hash: &str,
        now: NaiveDateTime,
    ) -> AppResult<Option<Uuid>> {
        let row = sqlx::query(
            r#"
                SELECT user_id FROM magic_links
                WHERE token_hash = $1 AND expires_at > $2 AND consumed_at IS NULL
            "#,
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row.map(|r| r.get("user_id")))
    }

    async fn consume_magic_link(&self, token_hash: &str) -> AppResult<()> {
        sqlx::query("UPDATE magic_links SET consumed_at = CURRENT_TIMESTAMP WHERE token_hash = $1")
            .bind(token_hash)
            .execute(self.pool())
            .await
            .map_err(AppError::from)?;
        Ok(())
    }
}
