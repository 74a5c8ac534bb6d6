use std::str::FromStr;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    adapters::http::routes::{current_admin, current_user},
    app_error::{AppError, AppResult},
    application::use_cases::tld::{TldEntry, TldImportLog},
    domain::entities::tld::ImportMode,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tlds))
        .route("/import", post(start_import))
        .route("/import-progress/{log_id}", get(import_progress))
}

/// `/api/tld-info` lives outside the `/tld-registry` nest.
pub fn info_router() -> Router<AppState> {
    Router::new().route("/tld-info", get(tld_info))
}

#[derive(Serialize)]
struct TldResponse {
    tld: String,
    rdap_url: Option<String>,
    whois_server: Option<String>,
    source: String,
    last_checked_at: Option<chrono::NaiveDateTime>,
}

impl From<TldEntry> for TldResponse {
    fn from(e: TldEntry) -> Self {
        TldResponse {
            tld: e.tld,
            rdap_url: e.rdap_url,
            whois_server: e.whois_server,
            source: e.source,
            last_checked_at: e.last_checked_at,
        }
    }
}

#[derive(Serialize)]
struct ImportLogResponse {
    id: Uuid,
    mode: String,
    status: String,
    total: i32,
    processed: i32,
    imported: i32,
    updated: i32,
    failed: i32,
    last_tld: Option<String>,
    error: Option<String>,
    started_at: Option<chrono::NaiveDateTime>,
    finished_at: Option<chrono::NaiveDateTime>,
}

impl From<TldImportLog> for ImportLogResponse {
    fn from(log: TldImportLog) -> Self {
        ImportLogResponse {
            id: log.id,
            mode: log.mode.as_ref().to_string(),
            status: log.status.as_ref().to_string(),
            total: log.total,
            processed: log.processed,
            imported: log.imported,
            updated: log.updated,
            failed: log.failed,
            last_tld: log.last_tld,
            error: log.error,
            started_at: log.started_at,
            finished_at: log.finished_at,
        }
    }
}

#[derive(Deserialize)]
struct ListTldsQuery {
    q: Option<String>,
    page: Option<i64>,
    per_page: Option<i64>,
}

#[derive(Serialize)]
struct TldListResponse {
    tlds: Vec<TldResponse>,
    total: i64,
}

async fn list_tlds(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<ListTldsQuery>,
) -> AppResult<impl IntoResponse> {
    current_user(&jar, &app_state).await?;

    let (tlds, total) = app_state
        .tld_use_cases
        .list_tlds(
            query.q.as_deref(),
            query.page.unwrap_or(1),
            query.per_page.unwrap_or(50),
        )
        .await?;

    Ok(Json(TldListResponse {
        tlds: tlds.into_iter().map(TldResponse::from).collect(),
        total,
    }))
}

#[derive(Deserialize)]
struct StartImportPayload {
    mode: Option<String>,
}

#[derive(Serialize)]
struct StartImportResponse {
    log_id: Uuid,
}

/// Kick off a registry import in the background and hand back the log id for
/// progress polling.
async fn start_import(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<StartImportPayload>,
) -> AppResult<impl IntoResponse> {
    current_admin(&jar, &app_state).await?;

    let mode = match payload.mode.as_deref() {
        None => ImportMode::Full,
        Some(raw) => ImportMode::from_str(raw).map_err(|_| {
            AppError::InvalidInput(
                "Mode must be one of full, rdap_only, whois_only, check_updates".into(),
            )
        })?,
    };

    let log = app_state.tld_use_cases.start_import(mode).await?;
    let log_id = log.id;

    let tld_uc = app_state.tld_use_cases.clone();
    tokio::spawn(async move {
        if let Err(e) = tld_uc.run_import(log_id, mode).await {
            error!(log_id = %log_id, error = ?e, "Background TLD import failed");
        }
    });

    Ok((StatusCode::ACCEPTED, Json(StartImportResponse { log_id })))
}

async fn import_progress(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Path(log_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    current_user(&jar, &app_state).await?;

    let log = app_state.tld_use_cases.import_progress(log_id).await?;
    Ok(Json(ImportLogResponse::from(log)))
}

#[derive(Deserialize)]
struct TldInfoQuery {
    domain: String,
}

async fn tld_info(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<TldInfoQuery>,
) -> AppResult<impl IntoResponse> {
    current_user(&jar, &app_state).await?;

    let entry = app_state.tld_use_cases.tld_info(&query.domain).await?;
    Ok(Json(TldResponse::from(entry)))
}
