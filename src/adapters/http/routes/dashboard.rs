use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;

use crate::{
    adapters::http::app_state::AppState,
    adapters::http::routes::current_user,
    app_error::AppResult,
    application::use_cases::domain::PortfolioStats,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(dashboard))
}

#[derive(Serialize)]
struct DashboardResponse {
    app_name: String,
    domains: PortfolioStats,
    unread_notifications: i64,
    last_import: Option<LastImportSummary>,
}

#[derive(Serialize)]
struct LastImportSummary {
    id: uuid::Uuid,
    status: String,
    processed: i32,
    total: i32,
    finished_at: Option<chrono::NaiveDateTime>,
}

async fn dashboard(
    State(app_state): State<AppState>,
    jar: CookieJar,
) -> AppResult<impl IntoResponse> {
    let user = current_user(&jar, &app_state).await?;

    let stats = app_state.domain_use_cases.portfolio_stats(user.id).await?;
    let unread = app_state
        .notification_use_cases
        .unread_count(user.id)
        .await?;
    let last_import = app_state
        .tld_use_cases
        .latest_import()
        .await?
        .map(|log| LastImportSummary {
            id: log.id,
            status: log.status.as_ref().to_string(),
            processed: log.processed,
            total: log.total,
            finished_at: log.finished_at,
        });
    let app_name = app_state
        .settings_use_cases
        .secret_value("app_name")
        .await?
        .unwrap_or_else(|| "domwatch".to_string());

    Ok(Json(DashboardResponse {
        app_name,
        domains: stats,
        unread_notifications: unread,
        last_import,
    }))
}
