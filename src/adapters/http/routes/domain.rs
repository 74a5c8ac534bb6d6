use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, patch, post},
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    adapters::http::routes::current_user,
    app_error::AppResult,
    application::use_cases::domain::{
        BulkAddOutcome, DomainListFilter, DomainProfile, UpdateDomainInput,
    },
    domain::entities::domain::DomainStatus,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_domain))
        .route("/", get(list_domains))
        .route("/bulk", post(bulk_add))
        .route("/bulk-delete", post(bulk_delete))
        .route("/bulk-assign-group", post(bulk_assign_group))
        .route("/{domain_id}", get(get_domain))
        .route("/{domain_id}", patch(update_domain))
        .route("/{domain_id}", delete(delete_domain))
        .route("/{domain_id}/refresh", post(refresh_domain))
}

#[derive(Serialize)]
struct DomainResponse {
    id: Uuid,
    name: String,
    status: String,
    registrar: Option<String>,
    registered_at: Option<chrono::NaiveDateTime>,
    expires_at: Option<chrono::NaiveDateTime>,
    last_checked_at: Option<chrono::NaiveDateTime>,
    nameservers: Vec<String>,
    notification_group_id: Option<Uuid>,
    auto_renew: bool,
    notes: Option<String>,
    created_at: Option<chrono::NaiveDateTime>,
    updated_at: Option<chrono::NaiveDateTime>,
}

impl From<DomainProfile> for DomainResponse {
    fn from(d: DomainProfile) -> Self {
        DomainResponse {
            id: d.id,
            name: d.name,
            status: d.status.as_str().to_string(),
            registrar: d.registrar,
            registered_at: d.registered_at,
            expires_at: d.expires_at,
            last_checked_at: d.last_checked_at,
            nameservers: d.nameservers,
            notification_group_id: d.notification_group_id,
            auto_renew: d.auto_renew,
            notes: d.notes,
            created_at: d.created_at,
            updated_at: d.updated_at,
        }
    }
}

#[derive(Deserialize)]
struct CreateDomainPayload {
    name: String,
}

async fn create_domain(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<CreateDomainPayload>,
) -> AppResult<impl IntoResponse> {
    let user = current_user(&jar, &app_state).await?;

    let domain = app_state
        .domain_use_cases
        .add_domain(user.id, &payload.name)
        .await?;

    Ok((StatusCode::CREATED, Json(DomainResponse::from(domain))))
}

#[derive(Deserialize)]
struct ListDomainsQuery {
    status: Option<String>,
    q: Option<String>,
    page: Option<i64>,
    per_page: Option<i64>,
}

#[derive(Serialize)]
struct DomainListResponse {
    domains: Vec<DomainResponse>,
    total: i64,
    page: i64,
    per_page: i64,
}

async fn list_domains(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<ListDomainsQuery>,
) -> AppResult<impl IntoResponse> {
    let user = current_user(&jar, &app_state).await?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(25).clamp(1, 100);
    let filter = DomainListFilter {
        status: query.status.as_deref().map(DomainStatus::from_str),
        q: query.q.clone(),
        page,
        per_page,
    };

    let (domains, total) = app_state
        .domain_use_cases
        .list_domains(user.id, &filter)
        .await?;

    Ok(Json(DomainListResponse {
        domains: domains.into_iter().map(DomainResponse::from).collect(),
        total,
        page,
        per_page,
    }))
}

async fn get_domain(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Path(domain_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let user = current_user(&jar, &app_state).await?;

    let domain = app_state
        .domain_use_cases
        .get_domain(user.id, domain_id)
        .await?;

    Ok(Json(DomainResponse::from(domain)))
}

/// Distinguishes an absent field from an explicit null, so PATCH can clear
/// the notification group.
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: Deserializer<'de>,
{
    serde::Deserialize::deserialize(deserializer).map(Some)
}

#[derive(Deserialize)]
struct UpdateDomainPayload {
    registrar: Option<String>,
    expires_at: Option<chrono::NaiveDateTime>,
    auto_renew: Option<bool>,
    notes: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    notification_group_id: Option<Option<Uuid>>,
}

async fn update_domain(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Path(domain_id): Path<Uuid>,
    Json(payload): Json<UpdateDomainPayload>,
) -> AppResult<impl IntoResponse> {
    let user = current_user(&jar, &app_state).await?;

    let input = UpdateDomainInput {
        registrar: payload.registrar,
        expires_at: payload.expires_at,
        auto_renew: payload.auto_renew,
        notes: payload.notes,
        notification_group_id: payload.notification_group_id,
    };
    let domain = app_state
        .domain_use_cases
        .update_domain(user.id, domain_id, input)
        .await?;

    Ok(Json(DomainResponse::from(domain)))
}

async fn delete_domain(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Path(domain_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let user = current_user(&jar, &app_state).await?;

    app_state
        .domain_use_cases
        .delete_domain(user.id, domain_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn refresh_domain(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Path(domain_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let user = current_user(&jar, &app_state).await?;

    let domain = app_state
        .domain_use_cases
        .refresh_domain(user.id, domain_id)
        .await?;

    Ok(Json(DomainResponse::from(domain)))
}

#[derive(Deserialize)]
struct BulkAddPayload {
    names: Vec<String>,
}

#[derive(Serialize)]
struct BulkAddResponse {
    results: Vec<BulkAddOutcome>,
    added: usize,
}

async fn bulk_add(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<BulkAddPayload>,
) -> AppResult<impl IntoResponse> {
    let user = current_user(&jar, &app_state).await?;

    let results = app_state
        .domain_use_cases
        .bulk_add(user.id, &payload.names)
        .await;
    let added = results.iter().filter(|r| r.id.is_some()).count();

    Ok((StatusCode::CREATED, Json(BulkAddResponse { results, added })))
}

#[derive(Deserialize)]
struct BulkDeletePayload {
    ids: Vec<Uuid>,
}

#[derive(Serialize)]
struct BulkCountResponse {
    affected: u64,
}

async fn bulk_delete(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<BulkDeletePayload>,
) -> AppResult<impl IntoResponse> {
    let user = current_user(&jar, &app_state).await?;

    let affected = app_state
        .domain_use_cases
        .bulk_delete(user.id, &payload.ids)
        .await?;

    Ok(Json(BulkCountResponse { affected }))
}

#[derive(Deserialize)]
struct BulkAssignGroupPayload {
    ids: Vec<Uuid>,
    group_id: Option<Uuid>,
}

async fn bulk_assign_group(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<BulkAssignGroupPayload>,
) -> AppResult<impl IntoResponse> {
    let user = current_user(&jar, &app_state).await?;

    let affected = app_state
        .domain_use_cases
        .bulk_assign_group(user.id, &payload.ids, payload.group_id)
        .await?;

    Ok(Json(BulkCountResponse { affected }))
}
