use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, patch, post},
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    adapters::http::routes::current_admin,
    app_error::AppResult,
    application::use_cases::user::UserProfile,
    domain::entities::user::UserRole,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/", post(create_user))
        .route("/{user_id}", get(get_user))
        .route("/{user_id}", patch(update_user))
        .route("/{user_id}", delete(delete_user))
}

#[derive(Serialize)]
struct UserResponse {
    id: Uuid,
    email: String,
    name: String,
    role: String,
    last_login_at: Option<chrono::NaiveDateTime>,
    created_at: Option<chrono::NaiveDateTime>,
}

impl From<UserProfile> for UserResponse {
    fn from(u: UserProfile) -> Self {
        UserResponse {
            id: u.id,
            email: u.email,
            name: u.name,
            role: u.role.as_str().to_string(),
            last_login_at: u.last_login_at,
            created_at: u.created_at,
        }
    }
}

async fn list_users(
    State(app_state): State<AppState>,
    jar: CookieJar,
) -> AppResult<impl IntoResponse> {
    let admin = current_admin(&jar, &app_state).await?;

    let users = app_state.user_use_cases.list_users(&admin).await?;
    let response: Vec<UserResponse> = users.into_iter().map(UserResponse::from).collect();
    Ok(Json(response))
}

#[derive(Deserialize)]
struct CreateUserPayload {
    email: String,
    name: String,
    role: Option<String>,
}

async fn create_user(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<CreateUserPayload>,
) -> AppResult<impl IntoResponse> {
    let admin = current_admin(&jar, &app_state).await?;

    let role = payload
        .role
        .as_deref()
        .map(UserRole::from_str)
        .unwrap_or(UserRole::Member);

    let user = app_state
        .user_use_cases
        .create_user(&admin, &payload.email, &payload.name, role)
        .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

async fn get_user(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Path(user_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    current_admin(&jar, &app_state).await?;

    let user = app_state.user_use_cases.get_user(user_id).await?;
    Ok(Json(UserResponse::from(user)))
}

#[derive(Deserialize)]
struct UpdateUserPayload {
    role: String,
}

async fn update_user(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateUserPayload>,
) -> AppResult<impl IntoResponse> {
    let admin = current_admin(&jar, &app_state).await?;

    let role = UserRole::from_str(&payload.role);
    let user = app_state
        .user_use_cases
        .set_role(&admin, user_id, role)
        .await?;

    Ok(Json(UserResponse::from(user)))
}

async fn delete_user(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Path(user_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let admin = current_admin(&jar, &app_state).await?;

    app_state
        .user_use_cases
        .delete_user(&admin, user_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
