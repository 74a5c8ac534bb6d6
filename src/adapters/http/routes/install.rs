use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{adapters::http::app_state::AppState, app_error::AppResult};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/status", get(status))
        .route("/", post(install))
}

#[derive(Serialize)]
struct InstallStatusResponse {
    installed: bool,
}

async fn status(State(app_state): State<AppState>) -> AppResult<impl IntoResponse> {
    let installed = app_state.user_use_cases.is_installed().await?;
    Ok(Json(InstallStatusResponse { installed }))
}

#[derive(Deserialize)]
struct InstallPayload {
    email: String,
    name: String,
}

#[derive(Serialize)]
struct InstallResponse {
    user_id: Uuid,
    email: String,
}

/// First-run setup: create the admin account and seed default settings.
async fn install(
    State(app_state): State<AppState>,
    Json(payload): Json<InstallPayload>,
) -> AppResult<impl IntoResponse> {
    let admin = app_state
        .user_use_cases
        .install(&payload.email, &payload.name)
        .await?;

    app_state.settings_use_cases.seed_defaults().await?;

    Ok((
        StatusCode::CREATED,
        Json(InstallResponse {
            user_id: admin.id,
            email: admin.email,
        }),
    ))
}
