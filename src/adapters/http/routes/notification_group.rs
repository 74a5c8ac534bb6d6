use std::str::FromStr;

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
    adapters::http::routes::current_user,
    app_error::{AppError, AppResult},
    application::use_cases::notification::{ChannelProfile, NotificationGroupProfile},
    domain::entities::notification::ChannelKind,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_group))
        .route("/", get(list_groups))
        .route("/{group_id}", get(get_group))
        .route("/{group_id}", patch(rename_group))
        .route("/{group_id}", delete(delete_group))
        .route("/{group_id}/channels", post(create_channel))
        .route("/{group_id}/channels", get(list_channels))
        .route("/{group_id}/channels/{channel_id}", patch(update_channel))
        .route("/{group_id}/channels/{channel_id}", delete(delete_channel))
        .route("/{group_id}/channels/{channel_id}/test", post(test_channel))
}

#[derive(Serialize)]
struct GroupResponse {
    id: Uuid,
    name: String,
    channel_count: i64,
    created_at: Option<chrono::NaiveDateTime>,
}

impl From<NotificationGroupProfile> for GroupResponse {
    fn from(g: NotificationGroupProfile) -> Self {
        GroupResponse {
            id: g.id,
            name: g.name,
            channel_count: g.channel_count,
            created_at: g.created_at,
        }
    }
}

#[derive(Serialize)]
struct ChannelResponse {
    id: Uuid,
    kind: String,
    target: String,
    enabled: bool,
    has_secret: bool,
    created_at: Option<chrono::NaiveDateTime>,
}

impl From<ChannelProfile> for ChannelResponse {
    fn from(c: ChannelProfile) -> Self {
        ChannelResponse {
            id: c.id,
            kind: c.kind.as_ref().to_string(),
            target: c.target,
            enabled: c.enabled,
            has_secret: c.secret_encrypted.is_some(),
            created_at: c.created_at,
        }
    }
}

#[derive(Deserialize)]
struct GroupNamePayload {
    name: String,
}

async fn create_group(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<GroupNamePayload>,
) -> AppResult<impl IntoResponse> {
    let user = current_user(&jar, &app_state).await?;

    let group = app_state
        .notification_use_cases
        .create_group(user.id, &payload.name)
        .await?;

    Ok((StatusCode::CREATED, Json(GroupResponse::from(group))))
}

async fn list_groups(
    State(app_state): State<AppState>,
    jar: CookieJar,
) -> AppResult<impl IntoResponse> {
    let user = current_user(&jar, &app_state).await?;

    let groups = app_state
        .notification_use_cases
        .list_groups(user.id)
        .await?;

    let response: Vec<GroupResponse> = groups.into_iter().map(GroupResponse::from).collect();
    Ok(Json(response))
}

async fn get_group(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Path(group_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let user = current_user(&jar, &app_state).await?;

    let group = app_state
        .notification_use_cases
        .get_group(user.id, group_id)
        .await?;

    Ok(Json(GroupResponse::from(group)))
}

async fn rename_group(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<GroupNamePayload>,
) -> AppResult<impl IntoResponse> {
    let user = current_user(&jar, &app_state).await?;

    let group = app_state
        .notification_use_cases
        .rename_group(user.id, group_id, &payload.name)
        .await?;

    Ok(Json(GroupResponse::from(group)))
}

async fn delete_group(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Path(group_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let user = current_user(&jar, &app_state).await?;

    app_state
        .notification_use_cases
        .delete_group(user.id, group_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct CreateChannelPayload {
    kind: String,
    target: String,
}

#[derive(Serialize)]
struct CreateChannelResponse {
    #[serde(flatten)]
    channel: ChannelResponse,
    /// Webhook signing secret, shown only once.
    secret: Option<String>,
}

async fn create_channel(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<CreateChannelPayload>,
) -> AppResult<impl IntoResponse> {
    let user = current_user(&jar, &app_state).await?;

    let kind = ChannelKind::from_str(&payload.kind)
        .map_err(|_| AppError::InvalidInput("Channel kind must be 'email' or 'webhook'".into()))?;

    let (channel, secret) = app_state
        .notification_use_cases
        .create_channel(user.id, group_id, kind, &payload.target)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateChannelResponse {
            channel: ChannelResponse::from(channel),
            secret,
        }),
    ))
}

async fn list_channels(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Path(group_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let user = current_user(&jar, &app_state).await?;

    let channels = app_state
        .notification_use_cases
        .list_channels(user.id, group_id)
        .await?;

    let response: Vec<ChannelResponse> =
        channels.into_iter().map(ChannelResponse::from).collect();
    Ok(Json(response))
}

#[derive(Deserialize)]
struct ChannelPathParams {
    group_id: Uuid,
    channel_id: Uuid,
}

#[derive(Deserialize)]
struct UpdateChannelPayload {
    enabled: bool,
}

async fn update_channel(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Path(params): Path<ChannelPathParams>,
    Json(payload): Json<UpdateChannelPayload>,
) -> AppResult<impl IntoResponse> {
    let user = current_user(&jar, &app_state).await?;

    let channel = app_state
        .notification_use_cases
        .set_channel_enabled(user.id, params.group_id, params.channel_id, payload.enabled)
        .await?;

    Ok(Json(ChannelResponse::from(channel)))
}

async fn delete_channel(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Path(params): Path<ChannelPathParams>,
) -> AppResult<impl IntoResponse> {
    let user = current_user(&jar, &app_state).await?;

    app_state
        .notification_use_cases
        .delete_channel(user.id, params.group_id, params.channel_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
struct TestChannelResponse {
    delivery_id: Uuid,
}

async fn test_channel(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Path(params): Path<ChannelPathParams>,
) -> AppResult<impl IntoResponse> {
    let user = current_user(&jar, &app_state).await?;

    let delivery_id = app_state
        .notification_use_cases
        .test_channel(user.id, params.group_id, params.channel_id)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(TestChannelResponse { delivery_id }),
    ))
}
