//! In-memory implementation of the notification group, notification, and
//! delivery repository traits, all on one struct like the Postgres adapter.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::notification::{
        ChannelProfile, DeliveryJob, DeliveryRepo, NotificationGroupProfile,
        NotificationGroupRepo, NotificationProfile, NotificationRepo,
    },
    domain::entities::notification::{ChannelKind, DeliveryStatus},
};

#[derive(Clone)]
pub struct DeliveryRow {
    pub id: Uuid,
    pub notification_id: Uuid,
    pub channel_id: Uuid,
    pub status: DeliveryStatus,
    pub attempt_count: i32,
    pub next_attempt_at: NaiveDateTime,
    pub locked_at: Option<NaiveDateTime>,
    pub last_response_status: Option<i32>,
    pub last_error: Option<String>,
}

#[derive(Default)]
pub struct InMemoryNotificationRepo {
    groups: Mutex<HashMap<Uuid, NotificationGroupProfile>>,
    channels: Mutex<HashMap<Uuid, ChannelProfile>>,
    notifications: Mutex<Vec<NotificationProfile>>,
    deliveries: Mutex<HashMap<Uuid, DeliveryRow>>,
}

impl InMemoryNotificationRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deliveries(&self) -> Vec<DeliveryRow> {
        self.deliveries.lock().unwrap().values().cloned().collect()
    }

    pub fn notifications(&self) -> Vec<NotificationProfile> {
        self.notifications.lock().unwrap().clone()
    }

    fn channel_count(&self, group_id: Uuid) -> i64 {
        self.channels
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.group_id == group_id)
            .count() as i64
    }
}

#[async_trait]
impl NotificationGroupRepo for InMemoryNotificationRepo {
    async fn create_group(
        &self,
        user_id: Uuid,
        name: &str,
    ) -> AppResult<NotificationGroupProfile> {
        let mut groups = self.groups.lock().unwrap();
        if groups
            .values()
            .any(|g| g.user_id == user_id && g.name == name)
        {
            return Err(AppError::InvalidInput(
                "A record with this value already exists".into(),
            ));
        }
        let group = NotificationGroupProfile {
            id: Uuid::new_v4(),
            user_id,
            name: name.to_string(),
            channel_count: 0,
            created_at: Some(Utc::now().naive_utc()),
        };
        groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn get_group(&self, group_id: Uuid) -> AppResult<Option<NotificationGroupProfile>> {
        Ok(self.groups.lock().unwrap().get(&group_id).cloned().map(|mut g| {
            g.channel_count = self.channel_count(group_id);
            g
        }))
    }

    async fn list_groups(&self, user_id: Uuid) -> AppResult<Vec<NotificationGroupProfile>> {
        let mut groups: Vec<NotificationGroupProfile> = self
            .groups
            .lock()
            .unwrap()
            .values()
            .filter(|g| g.user_id == user_id)
            .cloned()
            .collect();
        for g in &mut groups {
            g.channel_count = self.channel_count(g.id);
        }
        groups.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(groups)
    }

    async fn rename_group(
        &self,
        group_id: Uuid,
        name: &str,
    ) -> AppResult<NotificationGroupProfile> {
        let mut groups = self.groups.lock().unwrap();
        let group = groups.get_mut(&group_id).ok_or(AppError::NotFound)?;
        group.name = name.to_string();
        let mut out = group.clone();
        drop(groups);
        out.channel_count = self.channel_count(group_id);
        Ok(out)
    }

    async fn delete_group(&self, group_id: Uuid) -> AppResult<()> {
        self.groups
            .lock()
            .unwrap()
            .remove(&group_id)
            .ok_or(AppError::NotFound)?;
        self.channels
            .lock()
            .unwrap()
            .retain(|_, c| c.group_id != group_id);
        Ok(())
    }

    async fn create_channel(
        &self,
        group_id: Uuid,
        kind: ChannelKind,
        target: &str,
        secret_encrypted: Option<&str>,
    ) -> AppResult<ChannelProfile> {
        let channel = ChannelProfile {
            id: Uuid::new_v4(),
            group_id,
            kind,
            target: target.to_string(),
            secret_encrypted: secret_encrypted.map(str::to_string),
            enabled: true,
            created_at: Some(Utc::now().naive_utc()),
        };
        self.channels
            .lock()
            .unwrap()
            .insert(channel.id, channel.clone());
        Ok(channel)
    }

    async fn get_channel(&self, channel_id: Uuid) -> AppResult<Option<ChannelProfile>> {
        Ok(self.channels.lock().unwrap().get(&channel_id).cloned())
    }

    async fn list_channels(&self, group_id: Uuid) -> AppResult<Vec<ChannelProfile>> {
        let mut channels: Vec<ChannelProfile> = self
            .channels
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.group_id == group_id)
            .cloned()
            .collect();
        channels.sort_by_key(|c| c.created_at);
        Ok(channels)
    }

    async fn list_enabled_channels(&self, group_id: Uuid) -> AppResult<Vec<ChannelProfile>> {
        Ok(self
            .channels
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.group_id == group_id && c.enabled)
            .cloned()
            .collect())
    }

    async fn set_channel_enabled(
        &self,
        channel_id: Uuid,
        enabled: bool,
    ) -> AppResult<ChannelProfile> {
        let mut channels = self.channels.lock().unwrap();
        let channel = channels.get_mut(&channel_id).ok_or(AppError::NotFound)?;
        channel.enabled = enabled;
        Ok(channel.clone())
    }

    async fn delete_channel(&self, channel_id: Uuid) -> AppResult<()> {
        self.channels
            .lock()
            .unwrap()
            .remove(&channel_id)
            .ok_or(AppError::NotFound)?;
        Ok(())
    }
}

#[async_trait]
impl NotificationRepo for InMemoryNotificationRepo {
    async fn create(
        &self,
        user_id: Uuid,
        domain_id: Option<Uuid>,
        subject: &str,
        body: &str,
    ) -> AppResult<NotificationProfile> {
        let notification = NotificationProfile {
            id: Uuid::new_v4(),
            user_id,
            domain_id,
            subject: subject.to_string(),
            body: body.to_string(),
            read_at: None,
            created_at: Some(Utc::now().naive_utc()),
        };
        self.notifications.lock().unwrap().push(notification.clone());
        Ok(notification)
    }

    async fn list_by_user(
        &self,
        user_id: Uuid,
        page: i64,
        per_page: i64,
    ) -> AppResult<(Vec<NotificationProfile>, i64)> {
        let notifications = self.notifications.lock().unwrap();
        let mut matched: Vec<NotificationProfile> = notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matched.len() as i64;
        let start = ((page - 1) * per_page) as usize;
        let page: Vec<NotificationProfile> =
            matched.into_iter().skip(start).take(per_page as usize).collect();
        Ok((page, total))
    }

    async fn unread_count(&self, user_id: Uuid) -> AppResult<i64> {
        Ok(self
            .notifications
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.user_id == user_id && n.read_at.is_none())
            .count() as i64)
    }

    async fn mark_read(&self, user_id: Uuid, notification_id: Uuid) -> AppResult<()> {
        let mut notifications = self.notifications.lock().unwrap();
        let n = notifications
            .iter_mut()
            .find(|n| n.id == notification_id && n.user_id == user_id && n.read_at.is_none())
            .ok_or(AppError::NotFound)?;
        n.read_at = Some(Utc::now().naive_utc());
        Ok(())
    }

    async fn mark_all_read(&self, user_id: Uuid) -> AppResult<u64> {
        let mut notifications = self.notifications.lock().unwrap();
        let mut marked = 0;
        for n in notifications
            .iter_mut()
            .filter(|n| n.user_id == user_id && n.read_at.is_none())
        {
            n.read_at = Some(Utc::now().naive_utc());
            marked += 1;
        }
        Ok(marked)
    }
}

#[async_trait]
impl DeliveryRepo for InMemoryNotificationRepo {
    async fn enqueue(&self, notification_id: Uuid, channel_id: Uuid) -> AppResult<Uuid> {
        let id = Uuid::new_v4();
        self.deliveries.lock().unwrap().insert(
            id,
            DeliveryRow {
                id,
                notification_id,
                channel_id,
                status: DeliveryStatus::Pending,
                attempt_count: 0,
                next_attempt_at: Utc::now().naive_utc(),
                locked_at: None,
                last_response_status: None,
                last_error: None,
            },
        );
        Ok(id)
    }

    async fn claim_pending_batch(&self, limit: i64) -> AppResult<Vec<DeliveryJob>> {
        let now = Utc::now().naive_utc();
        let mut deliveries = self.deliveries.lock().unwrap();

        let mut due: Vec<Uuid> = deliveries
            .values()
            .filter(|d| d.status == DeliveryStatus::Pending && d.next_attempt_at <= now)
            .map(|d| d.id)
            .collect();
        due.sort_by_key(|id| deliveries[id].next_attempt_at);
        due.truncate(limit as usize);

        let channels = self.channels.lock().unwrap();
        let notifications = self.notifications.lock().unwrap();

        let mut jobs = Vec::with_capacity(due.len());
        for id in due {
            let row = deliveries.get_mut(&id).unwrap();
            row.status = DeliveryStatus::InProgress;
            row.locked_at = Some(now);

            let Some(channel) = channels.get(&row.channel_id) else {
                continue;
            };
            let Some(notification) = notifications.iter().find(|n| n.id == row.notification_id)
            else {
                continue;
            };
            jobs.push(DeliveryJob {
                delivery_id: row.id,
                notification_id: row.notification_id,
                channel_kind: channel.kind,
                target: channel.target.clone(),
                secret_encrypted: channel.secret_encrypted.clone(),
                attempt_count: row.attempt_count,
                subject: notification.subject.clone(),
                body: notification.body.clone(),
            });
        }
        Ok(jobs)
    }

    async fn mark_succeeded(&self, delivery_id: Uuid, response_status: i32) -> AppResult<()> {
        let mut deliveries = self.deliveries.lock().unwrap();
        let row = deliveries.get_mut(&delivery_id).ok_or(AppError::NotFound)?;
        row.status = DeliveryStatus::Succeeded;
        row.attempt_count += 1;
        row.last_response_status = Some(response_status);
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
        let mut deliveries = self.deliveries.lock().unwrap();
        let row = deliveries.get_mut(&delivery_id).ok_or(AppError::NotFound)?;
        row.status = DeliveryStatus::Pending;
        row.attempt_count = attempt_count;
        row.next_attempt_at = next_attempt_at;
        row.locked_at = None;
        row.last_response_status = response_status;
        row.last_error = error.map(str::to_string);
        Ok(())
    }

    async fn mark_failed(
        &self,
        delivery_id: Uuid,
        attempt_count: i32,
        response_status: Option<i32>,
        error: Option<&str>,
    ) -> AppResult<()> {
        let mut deliveries = self.deliveries.lock().unwrap();
        let row = deliveries.get_mut(&delivery_id).ok_or(AppError::NotFound)?;
        row.status = DeliveryStatus::Failed;
        row.attempt_count = attempt_count;
        row.locked_at = None;
        row.last_response_status = response_status;
        row.last_error = error.map(str::to_string);
        Ok(())
    }

    async fn release_stale(&self, stale_before: NaiveDateTime) -> AppResult<u64> {
        let mut deliveries = self.deliveries.lock().unwrap();
        let mut released = 0;
        for row in deliveries.values_mut() {
            if row.status == DeliveryStatus::InProgress
                && row.locked_at.is_some_and(|at| at < stale_before)
            {
                row.status = DeliveryStatus::Pending;
                row.locked_at = None;
                released += 1;
            }
        }
        Ok(released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::notification::NotificationUseCases;
    use crate::test_utils::{create_test_domain, test_cipher};
    use std::sync::Arc;

    fn use_cases(repo: Arc<InMemoryNotificationRepo>) -> NotificationUseCases {
        NotificationUseCases::new(repo.clone(), repo.clone(), repo, test_cipher())
    }

    #[tokio::test]
    async fn domain_event_fans_out_to_enabled_channels() {
        let repo = Arc::new(InMemoryNotificationRepo::new());
        let uc = use_cases(repo.clone());

        let user_id = Uuid::new_v4();
        let group = uc.create_group(user_id, "ops").await.unwrap();
        let (email_channel, _) = uc
            .create_channel(
                user_id,
                group.id,
                ChannelKind::Email,
                "alerts@example.com",
            )
            .await
            .unwrap();
        let (disabled, _) = uc
            .create_channel(user_id, group.id, ChannelKind::Email, "muted@example.com")
            .await
            .unwrap();
        uc.set_channel_enabled(user_id, group.id, disabled.id, false)
            .await
            .unwrap();

        let domain = create_test_domain(user_id, |d| {
            d.name = "fanout.com".into();
            d.status = crate::domain::entities::domain::DomainStatus::Expired;
            d.notification_group_id = Some(group.id);
        });

        uc.notify_domain_event(&domain, crate::domain::entities::domain::DomainStatus::Active)
            .await
            .unwrap();

        let deliveries = repo.deliveries();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].channel_id, email_channel.id);
        assert_eq!(uc.unread_count(user_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn claim_marks_in_progress_and_stale_release_recovers() {
        let repo = Arc::new(InMemoryNotificationRepo::new());
        let uc = use_cases(repo.clone());

        let user_id = Uuid::new_v4();
        let group = uc.create_group(user_id, "ops").await.unwrap();
        let (channel, _) = uc
            .create_channel(user_id, group.id, ChannelKind::Email, "a@example.com")
            .await
            .unwrap();
        uc.test_channel(user_id, group.id, channel.id).await.unwrap();

        let jobs = uc.claim_pending_deliveries(10).await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert!(uc.claim_pending_deliveries(10).await.unwrap().is_empty());

        // Nothing is stale yet.
        assert_eq!(uc.release_stale_deliveries(10).await.unwrap(), 0);
        // With a zero-minute window every in-progress row counts as stale.
        assert_eq!(uc.release_stale_deliveries(-1).await.unwrap(), 1);
        assert_eq!(uc.claim_pending_deliveries(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failure_backoff_then_terminal() {
        let repo = Arc::new(InMemoryNotificationRepo::new());
        let uc = use_cases(repo.clone());

        let user_id = Uuid::new_v4();
        let group = uc.create_group(user_id, "ops").await.unwrap();
        let (channel, _) = uc
            .create_channel(user_id, group.id, ChannelKind::Email, "a@example.com")
            .await
            .unwrap();
        let delivery_id = uc.test_channel(user_id, group.id, channel.id).await.unwrap();

        // Retryable failure goes back to pending with a future attempt time.
        uc.record_delivery_failure(delivery_id, 1, Some(500), Some("boom"), false)
            .await
            .unwrap();
        let row = &repo.deliveries()[0];
        assert_eq!(row.status, DeliveryStatus::Pending);
        assert!(row.next_attempt_at > Utc::now().naive_utc());

        // Terminal failure is final.
        uc.record_delivery_failure(delivery_id, 2, Some(404), Some("gone"), true)
            .await
            .unwrap();
        assert_eq!(repo.deliveries()[0].status, DeliveryStatus::Failed);

        // Exhausted schedule is terminal even when retryable.
        let second = uc.test_channel(user_id, group.id, channel.id).await.unwrap();
        uc.record_delivery_failure(second, 6, Some(500), Some("still down"), false)
            .await
            .unwrap();
        let row = repo
            .deliveries()
            .into_iter()
            .find(|d| d.id == second)
            .unwrap();
        assert_eq!(row.status, DeliveryStatus::Failed);
    }

    #[tokio::test]
    async fn webhook_channel_gets_encrypted_secret() {
        let repo = Arc::new(InMemoryNotificationRepo::new());
        let uc = use_cases(repo.clone());

        let user_id = Uuid::new_v4();
        let group = uc.create_group(user_id, "hooks").await.unwrap();
        let (channel, secret) = uc
            .create_channel(
                user_id,
                group.id,
                ChannelKind::Webhook,
                "https://hooks.example.net/dw",
            )
            .await
            .unwrap();

        let raw = secret.expect("webhook channels return their secret once");
        assert!(raw.starts_with("dwsec_"));

        let stored = channel.secret_encrypted.expect("secret stored encrypted");
        assert_ne!(stored, raw);
        assert_eq!(uc.decrypt_channel_secret(&stored).unwrap(), raw);
    }

    #[tokio::test]
    async fn invalid_channel_targets_rejected() {
        let repo = Arc::new(InMemoryNotificationRepo::new());
        let uc = use_cases(repo);

        let user_id = Uuid::new_v4();
        let group = uc.create_group(user_id, "ops").await.unwrap();

        assert!(uc
            .create_channel(user_id, group.id, ChannelKind::Email, "not-an-email")
            .await
            .is_err());
        assert!(uc
            .create_channel(user_id, group.id, ChannelKind::Webhook, "ftp://nope")
            .await
            .is_err());
    }
}
