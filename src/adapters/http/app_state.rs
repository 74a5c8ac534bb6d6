use std::sync::Arc;

use crate::{
    application::use_cases::{
        auth::AuthUseCases, domain::DomainUseCases, notification::NotificationUseCases,
        settings::SettingsUseCases, tld::TldUseCases, user::UserUseCases,
    },
    infra::config::AppConfig,
    infra::rate_limit::RateLimiterTrait,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth_use_cases: Arc<AuthUseCases>,
    pub user_use_cases: Arc<UserUseCases>,
    pub domain_use_cases: Arc<DomainUseCases>,
    pub notification_use_cases: Arc<NotificationUseCases>,
    pub tld_use_cases: Arc<TldUseCases>,
    pub settings_use_cases: Arc<SettingsUseCases>,
    pub rate_limiter: Arc<dyn RateLimiterTrait>,
}
