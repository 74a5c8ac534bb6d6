//! In-memory implementations of the user and magic-link repository traits.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::auth::MagicLinkRepo,
    application::use_cases::user::{UserProfile, UserRepo},
    domain::entities::user::UserRole,
};

struct MagicLinkRow {
    user_id: Uuid,
    expires_at: NaiveDateTime,
    consumed_at: Option<NaiveDateTime>,
}

#[derive(Default)]
pub struct InMemoryUserRepo {
    pub users: Mutex<HashMap<Uuid, UserProfile>>,
    links: Mutex<HashMap<String, MagicLinkRow>>,
}

impl InMemoryUserRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: Vec<UserProfile>) -> Self {
        let map: HashMap<Uuid, UserProfile> = users.into_iter().map(|u| (u.id, u)).collect();
        Self {
            users: Mutex::new(map),
            links: Mutex::new(HashMap::new()),
        }
    }

    /// Insert a user directly (for test arrangement).
    pub fn seed(&self, user: UserProfile) {
        self.users.lock().unwrap().insert(user.id, user);
    }
}

#[async_trait]
impl UserRepo for InMemoryUserRepo {
    async fn create(&self, email: &str, name: &str, role: UserRole) -> AppResult<UserProfile> {
        let mut users = self.users.lock().unwrap();

        if users.values().any(|u| u.email == email) {
            return Err(AppError::InvalidInput(
                "A record with this value already exists".into(),
            ));
        }

        let now = Utc::now().naive_utc();
        let user = UserProfile {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: name.to_string(),
            role,
            timezone: "UTC".to_string(),
            last_login_at: None,
            created_at: Some(now),
            updated_at: Some(now),
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_by_id(&self, user_id: Uuid) -> AppResult<Option<UserProfile>> {
        Ok(self.users.lock().unwrap().get(&user_id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> AppResult<Option<UserProfile>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn list(&self) -> AppResult<Vec<UserProfile>> {
        let mut users: Vec<UserProfile> = self.users.lock().unwrap().values().cloned().collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    async fn count(&self) -> AppResult<i64> {
        Ok(self.users.lock().unwrap().len() as i64)
    }

    async fn count_admins(&self) -> AppResult<i64> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .filter(|u| u.role == UserRole::Admin)
            .count() as i64)
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        name: &str,
        timezone: &str,
    ) -> AppResult<UserProfile> {
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(&user_id).ok_or(AppError::NotFound)?;
        user.name = name.to_string();
        user.timezone = timezone.to_string();
        user.updated_at = Some(Utc::now().naive_utc());
        Ok(user.clone())
    }

    async fn update_role(&self, user_id: Uuid, role: UserRole) -> AppResult<UserProfile> {
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(&user_id).ok_or(AppError::NotFound)?;
        user.role = role;
        user.updated_at = Some(Utc::now().naive_utc());
        Ok(user.clone())
    }

    async fn touch_last_login(&self, user_id: Uuid) -> AppResult<()> {
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(&user_id).ok_or(AppError::NotFound)?;
        user.last_login_at = Some(Utc::now().naive_utc());
        Ok(())
    }

    async fn delete(&self, user_id: Uuid) -> AppResult<()> {
        self.users
            .lock()
            .unwrap()
            .remove(&user_id)
            .ok_or(AppError::NotFound)?;
        Ok(())
    }
}

#[async_trait]
impl MagicLinkRepo for InMemoryUserRepo {
    async fn create_magic_link(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: NaiveDateTime,
    ) -> AppResult<()> {
        self.links.lock().unwrap().insert(
            token_hash.to_string(),
            MagicLinkRow {
                user_id,
                expires_at,
                consumed_at: None,
            },
        );
        Ok(())
    }

    async fn get_valid_magic_link(
        &self,
        token_hash: &str,
        now: NaiveDateTime,
    ) -> AppResult<Option<Uuid>> {
        Ok(self.links.lock().unwrap().get(token_hash).and_then(|row| {
            (row.expires_at > now && row.consumed_at.is_none()).then_some(row.user_id)
        }))
    }

    async fn consume_magic_link(&self, token_hash: &str) -> AppResult<()> {
        if let Some(row) = self.links.lock().unwrap().get_mut(token_hash) {
            row.consumed_at = Some(Utc::now().naive_utc());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::auth::{AuthUseCases, EmailSender};
    use crate::test_utils::{InMemoryEmailSender, create_test_user};
    use std::sync::Arc;

    #[tokio::test]
    async fn magic_link_round_trip() {
        let repo = Arc::new(InMemoryUserRepo::new());
        let user = create_test_user(|u| u.email = "login@example.com".into());
        repo.seed(user.clone());

        let email = Arc::new(InMemoryEmailSender::new());
        let auth = AuthUseCases::new(
            repo.clone(),
            repo.clone(),
            email.clone() as Arc<dyn EmailSender>,
            "http://localhost:3000".into(),
        );

        auth.request_magic_link("login@example.com", 15).await.unwrap();

        let sent = email.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "login@example.com");

        // Pull the raw token back out of the emailed link.
        let html = &sent[0].2;
        let token = html.split("token=").nth(1).unwrap().split('"').next().unwrap();

        let user_id = auth.consume_magic_link(token).await.unwrap();
        assert_eq!(user_id, Some(user.id));

        // Single use.
        assert_eq!(auth.consume_magic_link(token).await.unwrap(), None);
    }

    #[tokio::test]
    async fn unknown_email_sends_nothing() {
        let repo = Arc::new(InMemoryUserRepo::new());
        let email = Arc::new(InMemoryEmailSender::new());
        let auth = AuthUseCases::new(
            repo.clone(),
            repo,
            email.clone() as Arc<dyn EmailSender>,
            "http://localhost:3000".into(),
        );

        auth.request_magic_link("ghost@example.com", 15).await.unwrap();
        assert!(email.sent().is_empty());
    }
}
