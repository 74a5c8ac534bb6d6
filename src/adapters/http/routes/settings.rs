use std::collections::HashMap;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    adapters::http::app_state::AppState, adapters::http::routes::current_admin,
    app_error::AppResult,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_settings))
        .route("/", patch(update_settings))
}

async fn list_settings(
    State(app_state): State<AppState>,
    jar: CookieJar,
) -> AppResult<impl IntoResponse> {
    current_admin(&jar, &app_state).await?;

    let settings = app_state.settings_use_cases.list().await?;
    Ok(Json(settings))
}

async fn update_settings(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Json(changes): Json<HashMap<String, String>>,
) -> AppResult<impl IntoResponse> {
    current_admin(&jar, &app_state).await?;

    app_state.settings_use_cases.update(&changes).await?;
    Ok(StatusCode::OK)
}
