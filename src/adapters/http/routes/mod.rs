pub mod auth;
pub mod dashboard;
pub mod domain;
pub mod install;
pub mod notification;
pub mod notification_group;
pub mod profile;
pub mod search;
pub mod settings;
pub mod tld_registry;
pub mod user;

use axum::Router;
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    application::jwt,
    application::use_cases::user::{UserProfile, require_admin},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/install", install::router())
        .nest("/auth", auth::router())
        .nest("/dashboard", dashboard::router())
        .nest("/search", search::router())
        .nest("/domains", domain::router())
        .nest("/notification-groups", notification_group::router())
        .nest("/notifications", notification::router())
        .nest("/tld-registry", tld_registry::router())
        .merge(tld_registry::info_router())
        .nest("/settings", settings::router())
        .nest("/profile", profile::router())
        .nest("/users", user::router())
}

/// Resolve the authenticated user from the access-token cookie.
pub(crate) async fn current_user(jar: &CookieJar, app_state: &AppState) -> AppResult<UserProfile> {
    let Some(access_cookie) = jar.get("access_token") else {
        return Err(AppError::InvalidCredentials);
    };

    let claims = jwt::verify(access_cookie.value(), &app_state.config.jwt_secret)?;
    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidCredentials)?;

    // The account may have been deleted since the token was issued.
    app_state
        .user_use_cases
        .get_user(user_id)
        .await
        .map_err(|_| AppError::InvalidCredentials)
}

pub(crate) async fn current_admin(jar: &CookieJar, app_state: &AppState) -> AppResult<UserProfile> {
    let user = current_user(jar, app_state).await?;
    require_admin(&user)?;
    Ok(user)
}
