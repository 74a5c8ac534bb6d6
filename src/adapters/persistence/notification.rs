use std::str::FromStr;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::notification::{
        ChannelProfile, DeliveryJob, DeliveryRepo, NotificationGroupProfile,
        NotificationGroupRepo, NotificationProfile, NotificationRepo,
    },
    domain::entities::notification::ChannelKind,
};

const GROUP_COLS: &str = r#"
    g.id, g.user_id, g.name, g.created_at,
    (SELECT COUNT(*) FROM notification_channels c WHERE c.group_id = g.id) AS channel_count
"#;

const CHANNEL_COLS: &str =
    "id, group_id, kind::text AS kind, target, secret_encrypted, enabled, created_at";

fn row_to_group(row: sqlx::postgres::PgRow) -> NotificationGroupProfile {
    NotificationGroupProfile {
        id: row.get("id"),
        user_id: row.get("user_id"),
        name: row.get("name"),
        channel_count: row.get("channel_count"),
        created_at: row.get("created_at"),
    }
}

fn row_to_channel(row: sqlx::postgres::PgRow) -> ChannelProfile {
    let kind: String = row.get("kind");
    ChannelProfile {
        id: row.get("id"),
        group_id: row.get("group_id"),
        kind: ChannelKind::from_str(&kind).unwrap_or(ChannelKind::Email),
        target: row.get("target"),
        secret_encrypted: row.get("secret_encrypted"),
        enabled: row.get("enabled"),
        created_at: row.get("created_at"),
    }
}

fn row_to_notification(row: sqlx::postgres::PgRow) -> NotificationProfile {
    NotificationProfile {
        id: row.get("id"),
        user_id: row.get("user_id"),
        domain_id: row.get("domain_id"),
        subject: row.get("subject"),
        body: row.get("body"),
        read_at: row.get("read_at"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl NotificationGroupRepo for PostgresPersistence {
    async fn create_group(
        &self,
        user_id: Uuid,
        name: &str,
    ) -> AppResult<NotificationGroupProfile> {
        let id = Uuid::new_v4();
        let row = sqlx::query(&format!(
            r#"
                INSERT INTO notification_groups (id, user_id, name)
                VALUES ($1, $2, $3)
                RETURNING id, user_id, name, created_at, 0::bigint AS channel_count
            "#,
        ))
        .bind(id)
        .bind(user_id)
        .bind(name)
        .fetch_one(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row_to_group(row))
    }

    async fn get_group(&self, group_id: Uuid) -> AppResult<Option<NotificationGroupProfile>> {
        let row = sqlx::query(&format!(
            "SELECT {GROUP_COLS} FROM notification_groups g WHERE g.id = $1"
        ))
        .bind(group_id)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row.map(row_to_group))
    }

    async fn list_groups(&self, user_id: Uuid) -> AppResult<Vec<NotificationGroupProfile>> {
        let rows = sqlx::query(&format!(
            "SELECT {GROUP_COLS} FROM notification_groups g WHERE g.user_id = $1 ORDER BY g.name ASC"
        ))
        .bind(user_id)
        .fetch_all(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(rows.into_iter().map(row_to_group).collect())
    }

    async fn rename_group(
        &self,
        group_id: Uuid,
        name: &str,
    ) -> AppResult<NotificationGroupProfile> {
        sqlx::query("UPDATE notification_groups SET name = $2 WHERE id = $1")
            .bind(group_id)
            .bind(name)
            .execute(self.pool())
            .await
            .map_err(AppError::from)?;
        self.get_group(group_id).await?.ok_or(AppError::NotFound)
    }

    async fn delete_group(&self, group_id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM notification_groups WHERE id = $1")
            .bind(group_id)
            .execute(self.pool())
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    async fn create_channel(
        &self,
        group_id: Uuid,
        kind: ChannelKind,
        target: &str,
        secret_encrypted: Option<&str>,
    ) -> AppResult<ChannelProfile> {
        let id = Uuid::new_v4();
        let row = sqlx::query(&format!(
            r#"
                INSERT INTO notification_channels (id, group_id, kind, target, secret_encrypted)
                VALUES ($1, $2, $3::channel_kind, $4, $5)
                RETURNING {CHANNEL_COLS}
            "#,
        ))
        .bind(id)
        .bind(group_id)
        .bind(kind.as_ref())
        .bind(target)
        .bind(secret_encrypted)
        .fetch_one(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row_to_channel(row))
    }

    async fn get_channel(&self, channel_id: Uuid) -> AppResult<Option<ChannelProfile>> {
        let row = sqlx::query(&format!(
            "SELECT {CHANNEL_COLS} FROM notification_channels WHERE id = $1"
        ))
        .bind(channel_id)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row.map(row_to_channel))
    }

    async fn list_channels(&self, group_id: Uuid) -> AppResult<Vec<ChannelProfile>> {
        let rows = sqlx::query(&format!(
            "SELECT {CHANNEL_COLS} FROM notification_channels WHERE group_id = $1 ORDER BY created_at ASC"
        ))
        .bind(group_id)
        .fetch_all(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(rows.into_iter().map(row_to_channel).collect())
    }

    async fn list_enabled_channels(&self, group_id: Uuid) -> AppResult<Vec<ChannelProfile>> {
        let rows = sqlx::query(&format!(
            "SELECT {CHANNEL_COLS} FROM notification_channels WHERE group_id = $1 AND enabled"
        ))
        .bind(group_id)
        .fetch_all(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(rows.into_iter().map(row_to_channel).collect())
    }

    async fn set_channel_enabled(
        &self,
        channel_id: Uuid,
        enabled: bool,
    ) -> AppResult<ChannelProfile> {
        let row = sqlx::query(&format!(
            r#"
                UPDATE notification_channels
                SET enabled = $2
                WHERE id = $1
                RETURNING {CHANNEL_COLS}
            "#,
        ))
        .bind(channel_id)
        .bind(enabled)
        .fetch_one(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row_to_channel(row))
    }

    async fn delete_channel(&self, channel_id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM notification_channels WHERE id = $1")
            .bind(channel_id)
            .execute(self.pool())
            .await
            .map_err(AppError::from)?;
        Ok(())
    }
}

#[async_trait]
impl NotificationRepo for PostgresPersistence {
    async fn create(
        &self,
        user_id: Uuid,
        domain_id: Option<Uuid>,
        subject: &str,
        body: &str,
    ) -> AppResult<NotificationProfile> {
        let id = Uuid::new_v4();
        let row = sqlx::query(
            r#"
                INSERT INTO notifications (id, user_id, domain_id, subject, body)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, user_id, domain_id, subject, body, read_at, created_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(domain_id)
        .bind(subject)
        .bind(body)
        .fetch_one(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row_to_notification(row))
    }

    async fn list_by_user(
        &self,
        user_id: Uuid,
        page: i64,
        per_page: i64,
    ) -> AppResult<(Vec<NotificationProfile>, i64)> {
        let offset = (page - 1) * per_page;
        let rows = sqlx::query(
            r#"
                SELECT id, user_id, domain_id, subject, body, read_at, created_at,
                       COUNT(*) OVER() AS total_count
                FROM notifications
                WHERE user_id = $1
                ORDER BY created_at DESC
                LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(per_page)
        .bind(offset)
        .fetch_all(self.pool())
        .await
        .map_err(AppError::from)?;

        let total = rows
            .first()
            .map(|r| r.get::<i64, _>("total_count"))
            .unwrap_or(0);
        Ok((rows.into_iter().map(row_to_notification).collect(), total))
    }

    async fn unread_count(&self, user_id: Uuid) -> AppResult<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS cnt FROM notifications WHERE user_id = $1 AND read_at IS NULL",
        )
        .bind(user_id)
        .fetch_one(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row.get("cnt"))
    }

    async fn mark_read(&self, user_id: Uuid, notification_id: Uuid) -> AppResult<()> {
        let result = sqlx::query(
            r#"
                UPDATE notifications
                SET read_at = CURRENT_TIMESTAMP
                WHERE id = $1 AND user_id = $2 AND read_at IS NULL
            "#,
        )
        .bind(notification_id)
        .bind(user_id)
        .execute(self.pool())
        .await
        .map_err(AppError::from)?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn mark_all_read(&self, user_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
                UPDATE notifications
                SET read_at = CURRENT_TIMESTAMP
                WHERE user_id = $1 AND read_at IS NULL
            "#,
        )
        .bind(user_id)
        .execute(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(result.rows_affected())
    }
}

fn row_to_job(row: sqlx::postgres::PgRow) -> DeliveryJob {
    let kind: String = row.get("channel_kind");
    DeliveryJob {
        delivery_id: row.get("delivery_id"),
        notification_id: row.get("notification_id"),
        channel_kind: ChannelKind::from_str(&kind).unwrap_or(ChannelKind::Email),
        target: row.get("target"),
        secret_encrypted: row.get("secret_encrypted"),
        attempt_count: row.get("attempt_count"),
        subject: row.get("subject"),
        body: row.get("body"),
    }
}

#[async_trait]
impl DeliveryRepo for PostgresPersistence {
    async fn enqueue(&self, notification_id: Uuid, channel_id: Uuid) -> AppResult<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
                INSERT INTO notification_deliveries (id, notification_id, channel_id)
                VALUES ($1, $2, $3)
            "#,
        )
        .bind(id)
        .bind(notification_id)
        .bind(channel_id)
        .execute(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(id)
    }

    async fn claim_pending_batch(&self, limit: i64) -> AppResult<Vec<DeliveryJob>> {
        let rows = sqlx::query(
            r#"
            WITH claimed AS (
                UPDATE notification_deliveries
                SET status = 'in_progress', locked_at = NOW()
                WHERE id IN (
                    SELECT id FROM notification_deliveries
                    WHERE status = 'pending' AND next_attempt_at <= NOW()
                    ORDER BY next_attempt_at
                    LIMIT $1
                    FOR UPDATE SKIP LOCKED
                )
                RETURNING id, notification_id, channel_id, attempt_count
            )
            SELECT
                c.id AS delivery_id,
                c.notification_id,
                c.attempt_count,
                ch.kind::text AS channel_kind,
                ch.target,
                ch.secret_encrypted,
                n.subject,
                n.body
            FROM claimed c
            JOIN notification_channels ch ON ch.id = c.channel_id
            JOIN notifications n ON n.id = c.notification_id
            "#,
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(rows.into_iter().map(row_to_job).collect())
    }

    async fn mark_succeeded(&self, delivery_id: Uuid, response_status: i32) -> AppResult<()> {
        sqlx::query(
            r#"
                UPDATE notification_deliveries
                SET status = 'succeeded',
                    attempt_count = attempt_count + 1,
                    last_response_status = $2,
                    completed_at = NOW()
                WHERE id = $1
            "#,
        )
        .bind(delivery_id)
        .bind(response_status)
        .execute(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    async fn mark_retry(
        &self,
        delivery_id: Uuid,
        attempt_count: i32,
        next_attempt_at: NaiveDateTime,
        response_status: Option<i32>,
        error: Option<&str>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
                UPDATE notification_deliveries
                SET status = 'pending',
                    attempt_count = $2,
                    next_attempt_at = $3,
                    locked_at = NULL,
                    last_response_status = $4,
                    last_error = $5
                WHERE id = $1
            "#,
        )
        .bind(delivery_id)
        .bind(attempt_count)
        .bind(next_attempt_at)
        .bind(response_status)
        .bind(error)
        .execute(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    async fn mark_failed(
        &self,
        delivery_id: Uuid,
        attempt_count: i32,
        response_status: Option<i32>,
        error: Option<&str>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
                UPDATE notification_deliveries
                SET status = 'failed',
                    attempt_count = $2,
                    locked_at = NULL,
                    last_response_status = $3,
                    last_error = $4,
                    completed_at = NOW()
                WHERE id = $1
            "#,
        )
        .bind(delivery_id)
        .bind(attempt_count)
        .bind(response_status)
        .bind(error)
        .execute(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    async fn release_stale(&self, stale_before: NaiveDateTime) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
                UPDATE notification_deliveries
                SET status = 'pending', locked_at = NULL
                WHERE status = 'in_progress' AND locked_at < $1
            "#,
        )
        .bind(stale_before)
        .execute(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(result.rows_affected())
    }
}
