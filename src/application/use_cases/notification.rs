use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use tracing::instrument;
use uuid::Uuid;

use crate::app_error::{AppError, AppResult};
use crate::application::use_cases::domain::DomainProfile;
use crate::application::validators::is_valid_email;
use crate::domain::entities::domain::DomainStatus;
use crate::domain::entities::notification::ChannelKind;
use crate::infra::crypto::AppCipher;

/// Retry schedule for failed deliveries, in seconds since the last attempt.
/// After the schedule is exhausted the delivery fails terminally.
const BACKOFF_SCHEDULE_SECS: [i64; 5] = [60, 300, 1_800, 7_200, 21_600];

#[derive(Debug, Clone)]
pub struct NotificationGroupProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub channel_count: i64,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone)]
pub struct ChannelProfile {
    pub id: Uuid,
    pub group_id: Uuid,
    pub kind: ChannelKind,
    pub target: String,
    pub secret_encrypted: Option<String>,
    pub enabled: bool,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone)]
pub struct NotificationProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub domain_id: Option<Uuid>,
    pub subject: String,
    pub body: String,
    pub read_at: Option<NaiveDateTime>,
    pub created_at: Option<NaiveDateTime>,
}

/// A claimed delivery joined with everything the worker needs to send it.
#[derive(Debug, Clone)]
pub struct DeliveryJob {
    pub delivery_id: Uuid,
    pub notification_id: Uuid,
    pub channel_kind: ChannelKind,
    pub target: String,
    pub secret_encrypted: Option<String>,
    pub attempt_count: i32,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait NotificationGroupRepo: Send + Sync {
    async fn create_group(&self, user_id: Uuid, name: &str) -> AppResult<NotificationGroupProfile>;
    async fn get_group(&self, group_id: Uuid) -> AppResult<Option<NotificationGroupProfile>>;
    async fn list_groups(&self, user_id: Uuid) -> AppResult<Vec<NotificationGroupProfile>>;
    async fn rename_group(&self, group_id: Uuid, name: &str)
    -> AppResult<NotificationGroupProfile>;
    async fn delete_group(&self, group_id: Uuid) -> AppResult<()>;

    async fn create_channel(
        &self,
        group_id: Uuid,
        kind: ChannelKind,
        target: &str,
        secret_encrypted: Option<&str>,
    ) -> AppResult<ChannelProfile>;
    async fn get_channel(&self, channel_id: Uuid) -> AppResult<Option<ChannelProfile>>;
    async fn list_channels(&self, group_id: Uuid) -> AppResult<Vec<ChannelProfile>>;
    async fn list_enabled_channels(&self, group_id: Uuid) -> AppResult<Vec<ChannelProfile>>;
    async fn set_channel_enabled(&self, channel_id: Uuid, enabled: bool)
    -> AppResult<ChannelProfile>;
    async fn delete_channel(&self, channel_id: Uuid) -> AppResult<()>;
}

#[async_trait]
pub trait NotificationRepo: Send + Sync {
    async fn create(
        &self,
        user_id: Uuid,
        domain_id: Option<Uuid>,
        subject: &str,
        body: &str,
    ) -> AppResult<NotificationProfile>;
    async fn list_by_user(
        &self,
        user_id: Uuid,
        page: i64,
        per_page: i64,
    ) -> AppResult<(Vec<NotificationProfile>, i64)>;
    async fn unread_count(&self, user_id: Uuid) -> AppResult<i64>;
    async fn mark_read(&self, user_id: Uuid, notification_id: Uuid) -> AppResult<()>;
    async fn mark_all_read(&self, user_id: Uuid) -> AppResult<u64>;
}

#[async_trait]
pub trait DeliveryRepo: Send + Sync {
    async fn enqueue(&self, notification_id: Uuid, channel_id: Uuid) -> AppResult<Uuid>;
    async fn claim_pending_batch(&self, limit: i64) -> AppResult<Vec<DeliveryJob>>;
    async fn mark_succeeded(&self, delivery_id: Uuid, response_status: i32) -> AppResult<()>;
    async fn mark_retry(
        &self,
        delivery_id: Uuid,
        attempt_count: i32,
        next_attempt_at: NaiveDateTime,
        response_status: Option<i32>,
        error: Option<&str>,
    ) -> AppResult<()>;
    async fn mark_failed(
        &self,
        delivery_id: Uuid,
        attempt_count: i32,
        response_status: Option<i32>,
        error: Option<&str>,
    ) -> AppResult<()>;
    async fn release_stale(&self, stale_before: NaiveDateTime) -> AppResult<u64>;
}

#[derive(Clone)]
pub struct NotificationUseCases {
    groups: Arc<dyn NotificationGroupRepo>,
    notifications: Arc<dyn NotificationRepo>,
    deliveries: Arc<dyn DeliveryRepo>,
    cipher: AppCipher,
}

impl NotificationUseCases {
    pub fn new(
        groups: Arc<dyn NotificationGroupRepo>,
        notifications: Arc<dyn NotificationRepo>,
        deliveries: Arc<dyn DeliveryRepo>,
        cipher: AppCipher,
    ) -> Self {
        Self {
            groups,
            notifications,
            deliveries,
            cipher,
        }
    }

    // ------------------------------------------------------------------
    // Groups
    // ------------------------------------------------------------------

    #[instrument(skip(self))]
    pub async fn create_group(
        &self,
        user_id: Uuid,
        name: &str,
    ) -> AppResult<NotificationGroupProfile> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidInput("Group name must not be empty".into()));
        }
        self.groups.create_group(user_id, name).await
    }

    #[instrument(skip(self))]
    pub async fn list_groups(&self, user_id: Uuid) -> AppResult<Vec<NotificationGroupProfile>> {
        self.groups.list_groups(user_id).await
    }

    #[instrument(skip(self))]
    pub async fn get_group(
        &self,
        user_id: Uuid,
        group_id: Uuid,
    ) -> AppResult<NotificationGroupProfile> {
        match self.groups.get_group(group_id).await? {
            Some(g) if g.user_id == user_id => Ok(g),
            _ => Err(AppError::NotFound),
        }
    }

    #[instrument(skip(self))]
    pub async fn rename_group(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        name: &str,
    ) -> AppResult<NotificationGroupProfile> {
        self.get_group(user_id, group_id).await?;
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidInput("Group name must not be empty".into()));
        }
        self.groups.rename_group(group_id, name).await
    }

    #[instrument(skip(self))]
    pub async fn delete_group(&self, user_id: Uuid, group_id: Uuid) -> AppResult<()> {
        self.get_group(user_id, group_id).await?;
        self.groups.delete_group(group_id).await
    }

    // ------------------------------------------------------------------
    // Channels
    // ------------------------------------------------------------------

    /// Add a channel to a group. For webhook channels a signing secret is
    /// generated, stored encrypted, and returned exactly once.
    #[instrument(skip(self))]
    pub async fn create_channel(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        kind: ChannelKind,
        target: &str,
    ) -> AppResult<(ChannelProfile, Option<String>)> {
        self.get_group(user_id, group_id).await?;
        let target = target.trim();

        match kind {
            ChannelKind::Email => {
                if !is_valid_email(target) {
                    return Err(AppError::InvalidInput("Invalid email address".into()));
                }
                let channel = self
                    .groups
                    .create_channel(group_id, kind, target, None)
                    .await?;
                Ok((channel, None))
            }
            ChannelKind::Webhook => {
                let parsed = url::Url::parse(target)
                    .map_err(|_| AppError::InvalidInput("Invalid webhook URL".into()))?;
                if parsed.scheme() != "https" && parsed.scheme() != "http" {
                    return Err(AppError::InvalidInput(
                        "Webhook URL must be http or https".into(),
                    ));
                }
                let raw_secret = generate_channel_secret();
                let encrypted = self.cipher.encrypt(&raw_secret)?;
                let channel = self
                    .groups
                    .create_channel(group_id, kind, target, Some(&encrypted))
                    .await?;
                Ok((channel, Some(raw_secret)))
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn list_channels(
        &self,
        user_id: Uuid,
        group_id: Uuid,
    ) -> AppResult<Vec<ChannelProfile>> {
        self.get_group(user_id, group_id).await?;
        self.groups.list_channels(group_id).await
    }

    #[instrument(skip(self))]
    pub async fn set_channel_enabled(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        channel_id: Uuid,
        enabled: bool,
    ) -> AppResult<ChannelProfile> {
        self.owned_channel(user_id, group_id, channel_id).await?;
        self.groups.set_channel_enabled(channel_id, enabled).await
    }

    #[instrument(skip(self))]
    pub async fn delete_channel(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        channel_id: Uuid,
    ) -> AppResult<()> {
        self.owned_channel(user_id, group_id, channel_id).await?;
        self.groups.delete_channel(channel_id).await
    }

    /// Queue a test notification to a single channel.
    #[instrument(skip(self))]
    pub async fn test_channel(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        channel_id: Uuid,
    ) -> AppResult<Uuid> {
        let channel = self.owned_channel(user_id, group_id, channel_id).await?;
        let notification = self
            .notifications
            .create(
                user_id,
                None,
                "Test notification",
                "This is a test delivery from domwatch.",
            )
            .await?;
        self.deliveries.enqueue(notification.id, channel.id).await
    }

    // ------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------

    #[instrument(skip(self))]
    pub async fn list_notifications(
        &self,
        user_id: Uuid,
        page: i64,
        per_page: i64,
    ) -> AppResult<(Vec<NotificationProfile>, i64)> {
        self.notifications
            .list_by_user(user_id, page.max(1), per_page.clamp(1, 100))
            .await
    }

    pub async fn unread_count(&self, user_id: Uuid) -> AppResult<i64> {
        self.notifications.unread_count(user_id).await
    }

    #[instrument(skip(self))]
    pub async fn mark_read(&self, user_id: Uuid, notification_id: Uuid) -> AppResult<()> {
        self.notifications.mark_read(user_id, notification_id).await
    }

    #[instrument(skip(self))]
    pub async fn mark_all_read(&self, user_id: Uuid) -> AppResult<u64> {
        self.notifications.mark_all_read(user_id).await
    }

    /// Record a domain status transition and fan a delivery out to every
    /// enabled channel of the domain's notification group.
    #[instrument(skip(self, domain), fields(domain = %domain.name))]
    pub async fn notify_domain_event(
        &self,
        domain: &DomainProfile,
        previous_status: DomainStatus,
    ) -> AppResult<()> {
        let Some((subject, body)) = expiry_message(domain, previous_status) else {
            return Ok(());
        };

        let notification = self
            .notifications
            .create(domain.user_id, Some(domain.id), &subject, &body)
            .await?;

        if let Some(group_id) = domain.notification_group_id {
            for channel in self.groups.list_enabled_channels(group_id).await? {
                self.deliveries.enqueue(notification.id, channel.id).await?;
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Delivery worker bookkeeping
    // ------------------------------------------------------------------

    pub async fn claim_pending_deliveries(&self, limit: i64) -> AppResult<Vec<DeliveryJob>> {
        self.deliveries.claim_pending_batch(limit).await
    }

    pub async fn record_delivery_success(
        &self,
        delivery_id: Uuid,
        response_status: i32,
    ) -> AppResult<()> {
        self.deliveries
            .mark_succeeded(delivery_id, response_status)
            .await
    }

    /// Record a failed attempt: reschedule with backoff, or fail terminally
    /// when the schedule is exhausted or the failure is not retryable.
    pub async fn record_delivery_failure(
        &self,
        delivery_id: Uuid,
        attempt_count: i32,
        response_status: Option<i32>,
        error: Option<&str>,
        terminal: bool,
    ) -> AppResult<()> {
        match (terminal, next_backoff_secs(attempt_count)) {
            (false, Some(secs)) => {
                let next_attempt_at = Utc::now().naive_utc() + chrono::Duration::seconds(secs);
                self.deliveries
                    .mark_retry(
                        delivery_id,
                        attempt_count,
                        next_attempt_at,
                        response_status,
                        error,
                    )
                    .await
            }
            _ => {
                self.deliveries
                    .mark_failed(delivery_id, attempt_count, response_status, error)
                    .await
            }
        }
    }

    pub async fn release_stale_deliveries(&self, stale_minutes: i64) -> AppResult<u64> {
        let stale_before = Utc::now().naive_utc() - chrono::Duration::minutes(stale_minutes);
        self.deliveries.release_stale(stale_before).await
    }

    pub fn decrypt_channel_secret(&self, secret_encrypted: &str) -> AppResult<String> {
        self.cipher.decrypt(secret_encrypted)
    }

    async fn owned_channel(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        channel_id: Uuid,
    ) -> AppResult<ChannelProfile> {
        self.get_group(user_id, group_id).await?;
        match self.groups.get_channel(channel_id).await? {
            Some(c) if c.group_id == group_id => Ok(c),
            _ => Err(AppError::NotFound),
        }
    }
}

/// Seconds to wait before the attempt after `attempt_count` failures, or
/// None when the delivery should fail terminally.
pub fn next_backoff_secs(attempt_count: i32) -> Option<i64> {
    if attempt_count < 1 {
        return Some(BACKOFF_SCHEDULE_SECS[0]);
    }
    BACKOFF_SCHEDULE_SECS.get(attempt_count as usize - 1).copied()
}

/// Subject and body for an expiry-related status transition, or None when
/// the transition is not alert-worthy.
fn expiry_message(
    domain: &DomainProfile,
    previous_status: DomainStatus,
) -> Option<(String, String)> {
    if domain.status == previous_status {
        return None;
    }
    match domain.status {
        DomainStatus::Expiring => {
            let when = domain
                .expires_at
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "soon".to_string());
            Some((
                format!("{} expires {}", domain.name, when),
                format!(
                    "The domain {} is due to expire on {}. Renew it with {} to avoid losing it.",
                    domain.name,
                    when,
                    domain.registrar.as_deref().unwrap_or("your registrar"),
                ),
            ))
        }
        DomainStatus::Expired => Some((
            format!("{} has expired", domain.name),
            format!(
                "The domain {} is past its expiration date. It may enter redemption shortly.",
                domain.name
            ),
        )),
        _ => None,
    }
}

fn generate_channel_secret() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 24];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    format!("dwsec_{}", hex::encode(bytes))
}
