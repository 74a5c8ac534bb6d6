use axum::{
    Json, Router,
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use crate::{
    adapters::http::app_state::AppState, adapters::http::routes::current_user,
    app_error::AppResult,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/suggest", get(suggest))
}

#[derive(Deserialize)]
struct SuggestParams {
    q: String,
}

#[derive(Serialize)]
struct SuggestResponse {
    suggestions: Vec<String>,
}

async fn suggest(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<SuggestParams>,
) -> AppResult<impl IntoResponse> {
    let user = current_user(&jar, &app_state).await?;
    let suggestions = app_state
        .domain_use_cases
        .suggest(user.id, &params.q)
        .await?;
    Ok(Json(SuggestResponse { suggestions }))
}
