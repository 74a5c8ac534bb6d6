use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use chrono::{NaiveDateTime, Utc};
use sha2::{Digest, Sha256};
use tracing::instrument;
use uuid::Uuid;

use crate::app_error::AppResult;
use crate::application::use_cases::user::UserRepo;

#[async_trait]
pub trait MagicLinkRepo: Send + Sync {
    async fn create_magic_link(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: NaiveDateTime,
    ) -> AppResult<()>;
    async fn get_valid_magic_link(
        &self,
        token_hash: &str,
        now: NaiveDateTime,
    ) -> AppResult<Option<Uuid>>;
    async fn consume_magic_link(&self, token_hash: &str) -> AppResult<()>;
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> AppResult<()>;
}

#[derive(Clone)]
pub struct AuthUseCases {
    users: Arc<dyn UserRepo>,
    links: Arc<dyn MagicLinkRepo>,
    email: Arc<dyn EmailSender>,
    app_origin: String,
}

impl AuthUseCases {
    pub fn new(
        users: Arc<dyn UserRepo>,
        links: Arc<dyn MagicLinkRepo>,
        email: Arc<dyn EmailSender>,
        app_origin: String,
    ) -> Self {
        Self {
            users,
            links,
            email,
            app_origin,
        }
    }

    /// Request a login link for an email address.
    ///
    /// Accounts are created by the installer or an admin, never here. An
    /// unknown address returns Ok without sending anything, so the endpoint
    /// does not leak which emails have accounts.
    #[instrument(skip(self))]
    pub async fn request_magic_link(&self, email: &str, ttl_minutes: i64) -> AppResult<()> {
        let normalized = email.trim().to_lowercase();
        let Some(user) = self.users.get_by_email(&normalized).await? else {
            return Ok(());
        };

        let raw = generate_token();
        let token_hash = hash_token(&raw);
        let expires_at = (Utc::now() + chrono::Duration::minutes(ttl_minutes)).naive_utc();
        self.links
            .create_magic_link(user.id, &token_hash, expires_at)
            .await?;

        let link = format!("{}/magic?token={}", self.app_origin, raw);
        self.email
            .send(
                &normalized,
                "Your login link",
                &format!("<a href=\"{}\">Sign in to domwatch</a>", link),
            )
            .await
    }

    #[instrument(skip(self, raw_token))]
    pub async fn consume_magic_link(&self, raw_token: &str) -> AppResult<Option<Uuid>> {
        let token_hash = hash_token(raw_token);
        let now = Utc::now().naive_utc();
        if let Some(user_id) = self.links.get_valid_magic_link(&token_hash, now).await? {
            self.links.consume_magic_link(&token_hash).await?;
            self.users.touch_last_login(user_id).await?;
            return Ok(Some(user_id));
        }
        Ok(None)
    }
}

fn generate_token() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn hash_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}
