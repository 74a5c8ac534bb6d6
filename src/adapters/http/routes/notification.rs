use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState, adapters::http::routes::current_user,
    app_error::AppResult, application::use_cases::notification::NotificationProfile,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/unread-count", get(unread_count))
        .route("/read-all", post(mark_all_read))
        .route("/{notification_id}/read", post(mark_read))
}

#[derive(Serialize)]
struct NotificationResponse {
    id: Uuid,
    domain_id: Option<Uuid>,
    subject: String,
    body: String,
    read_at: Option<chrono::NaiveDateTime>,
    created_at: Option<chrono::NaiveDateTime>,
}

impl From<NotificationProfile> for NotificationResponse {
    fn from(n: NotificationProfile) -> Self {
        NotificationResponse {
            id: n.id,
            domain_id: n.domain_id,
            subject: n.subject,
            body: n.body,
            read_at: n.read_at,
            created_at: n.created_at,
        }
    }
}

#[derive(Deserialize)]
struct ListQuery {
    page: Option<i64>,
    per_page: Option<i64>,
}

#[derive(Serialize)]
struct NotificationListResponse {
    notifications: Vec<NotificationResponse>,
    total: i64,
}

async fn list_notifications(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<ListQuery>,
) -> AppResult<impl IntoResponse> {
    let user = current_user(&jar, &app_state).await?;

    let (notifications, total) = app_state
        .notification_use_cases
        .list_notifications(user.id, query.page.unwrap_or(1), query.per_page.unwrap_or(25))
        .await?;

    Ok(Json(NotificationListResponse {
        notifications: notifications
            .into_iter()
            .map(NotificationResponse::from)
            .collect(),
        total,
    }))
}

#[derive(Serialize)]
struct UnreadCountResponse {
    count: i64,
}

async fn unread_count(
    State(app_state): State<AppState>,
    jar: CookieJar,
) -> AppResult<impl IntoResponse> {
    let user = current_user(&jar, &app_state).await?;

    let count = app_state
        .notification_use_cases
        .unread_count(user.id)
        .await?;

    Ok(Json(UnreadCountResponse { count }))
}

async fn mark_read(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Path(notification_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let user = current_user(&jar, &app_state).await?;

    app_state
        .notification_use_cases
        .mark_read(user.id, notification_id)
        .await?;

    Ok(StatusCode::OK)
}

#[derive(Serialize)]
struct MarkAllReadResponse {
    marked: u64,
}

async fn mark_all_read(
    State(app_state): State<AppState>,
    jar: CookieJar,
) -> AppResult<impl IntoResponse> {
    let user = current_user(&jar, &app_state).await?;

    let marked = app_state
        .notification_use_cases
        .mark_all_read(user.id)
        .await?;

    Ok(Json(MarkAllReadResponse { marked }))
}
