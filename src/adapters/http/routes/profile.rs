use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::{get, patch},
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState, adapters::http::routes::current_user,
    app_error::AppResult, application::use_cases::user::UserProfile,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_profile))
        .route("/", patch(update_profile))
}

#[derive(Serialize)]
struct ProfileResponse {
    id: Uuid,
    email: String,
    name: String,
    role: String,
    timezone: String,
    last_login_at: Option<chrono::NaiveDateTime>,
    created_at: Option<chrono::NaiveDateTime>,
}

impl From<UserProfile> for ProfileResponse {
    fn from(u: UserProfile) -> Self {
        ProfileResponse {
            id: u.id,
            email: u.email,
            name: u.name,
            role: u.role.as_str().to_string(),
            timezone: u.timezone,
            last_login_at: u.last_login_at,
            created_at: u.created_at,
        }
    }
}

async fn get_profile(
    State(app_state): State<AppState>,
    jar: CookieJar,
) -> AppResult<impl IntoResponse> {
    let user = current_user(&jar, &app_state).await?;
    Ok(Json(ProfileResponse::from(user)))
}

#[derive(Deserialize)]
struct UpdateProfilePayload {
    name: Option<String>,
    timezone: Option<String>,
}

async fn update_profile(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<UpdateProfilePayload>,
) -> AppResult<impl IntoResponse> {
    let user = current_user(&jar, &app_state).await?;

    let name = payload.name.unwrap_or_else(|| user.name.clone());
    let timezone = payload.timezone.unwrap_or_else(|| user.timezone.clone());

    let updated = app_state
        .user_use_cases
        .update_profile(user.id, &name, &timezone)
        .await?;

    Ok(Json(ProfileResponse::from(updated)))
}
