use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tracing::instrument;
use uuid::Uuid;

use crate::app_error::{AppError, AppResult};
use crate::application::validators::is_valid_email;
use crate::domain::entities::user::UserRole;

#[derive(Debug, Clone)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub timezone: String,
    pub last_login_at: Option<NaiveDateTime>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn create(&self, email: &str, name: &str, role: UserRole) -> AppResult<UserProfile>;
    async fn get_by_id(&self, user_id: Uuid) -> AppResult<Option<UserProfile>>;
    async fn get_by_email(&self, email: &str) -> AppResult<Option<UserProfile>>;
    async fn list(&self) -> AppResult<Vec<UserProfile>>;
    async fn count(&self) -> AppResult<i64>;
    async fn count_admins(&self) -> AppResult<i64>;
    async fn update_profile(&self, user_id: Uuid, name: &str, timezone: &str)
    -> AppResult<UserProfile>;
    async fn update_role(&self, user_id: Uuid, role: UserRole) -> AppResult<UserProfile>;
    async fn touch_last_login(&self, user_id: Uuid) -> AppResult<()>;
    async fn delete(&self, user_id: Uuid) -> AppResult<()>;
}

#[derive(Clone)]
pub struct UserUseCases {
    repo: Arc<dyn UserRepo>,
}

impl UserUseCases {
    pub fn new(repo: Arc<dyn UserRepo>) -> Self {
        Self { repo }
    }

    /// True once the first (admin) user exists.
    pub async fn is_installed(&self) -> AppResult<bool> {
        Ok(self.repo.count().await? > 0)
    }

    /// First-run setup: create the initial admin account. Refused once any
    /// user exists.
    #[instrument(skip(self))]
    pub async fn install(&self, email: &str, name: &str) -> AppResult<UserProfile> {
        if self.is_installed().await? {
            return Err(AppError::Conflict("Already installed".into()));
        }
        let email = email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(AppError::InvalidInput("Invalid email format".into()));
        }
        self.repo.create(&email, name.trim(), UserRole::Admin).await
    }

    pub async fn get_user(&self, user_id: Uuid) -> AppResult<UserProfile> {
        self.repo
            .get_by_id(user_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    #[instrument(skip(self))]
    pub async fn list_users(&self, actor: &UserProfile) -> AppResult<Vec<UserProfile>> {
        require_admin(actor)?;
        self.repo.list().await
    }

    #[instrument(skip(self))]
    pub async fn create_user(
        &self,
        actor: &UserProfile,
        email: &str,
        name: &str,
        role: UserRole,
    ) -> AppResult<UserProfile> {
        require_admin(actor)?;
        let email = email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(AppError::InvalidInput("Invalid email format".into()));
        }
        self.repo.create(&email, name.trim(), role).await
    }

    #[instrument(skip(self))]
    pub async fn set_role(
        &self,
        actor: &UserProfile,
        user_id: Uuid,
        role: UserRole,
    ) -> AppResult<UserProfile> {
        require_admin(actor)?;
        let target = self.get_user(user_id).await?;

        // Demoting the last admin would lock everyone out of user management.
        if target.role == UserRole::Admin
            && role != UserRole::Admin
            && self.repo.count_admins().await? <= 1
        {
            return Err(AppError::InvalidInput(
                "Cannot demote the last admin".into(),
            ));
        }
        self.repo.update_role(user_id, role).await
    }

    #[instrument(skip(self))]
    pub async fn delete_user(&self, actor: &UserProfile, user_id: Uuid) -> AppResult<()> {
        require_admin(actor)?;
        if actor.id == user_id {
            return Err(AppError::InvalidInput(
                "Use another admin account to delete this one".into(),
            ));
        }
        let target = self.get_user(user_id).await?;
        if target.role == UserRole::Admin && self.repo.count_admins().await? <= 1 {
            return Err(AppError::InvalidInput("Cannot delete the last admin".into()));
        }
        self.repo.delete(user_id).await
    }

    #[instrument(skip(self))]
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        name: &str,
        timezone: &str,
    ) -> AppResult<UserProfile> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidInput("Name must not be empty".into()));
        }
        self.repo.update_profile(user_id, name, timezone.trim()).await
    }
}

pub fn require_admin(actor: &UserProfile) -> AppResult<()> {
    if actor.role != UserRole::Admin {
        return Err(AppError::Forbidden);
    }
    Ok(())
}
