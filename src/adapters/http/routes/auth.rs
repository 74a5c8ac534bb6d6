use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    application::jwt,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/request", post(request))
        .route("/consume", post(consume))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
}

#[derive(Deserialize)]
struct RequestPayload {
    email: String,
}

#[derive(Deserialize)]
struct ConsumePayload {
    token: String,
}

async fn request(
    State(app_state): State<AppState>,
    Json(payload): Json<RequestPayload>,
) -> AppResult<impl IntoResponse> {
    app_state
        .auth_use_cases
        .request_magic_link(&payload.email, app_state.config.magic_link_ttl_minutes)
        .await?;
    Ok((StatusCode::ACCEPTED, ()))
}

async fn consume(
    State(app_state): State<AppState>,
    Json(payload): Json<ConsumePayload>,
) -> AppResult<impl IntoResponse> {
    if let Some(user_id) = app_state
        .auth_use_cases
        .consume_magic_link(&payload.token)
        .await?
    {
        let headers = session_headers(&app_state, user_id)?;
        return Ok((StatusCode::OK, headers));
    }
    Err(AppError::InvalidCredentials)
}

/// Exchange a valid refresh-token cookie for a fresh pair of cookies.
async fn refresh(
    State(app_state): State<AppState>,
    jar: CookieJar,
) -> AppResult<impl IntoResponse> {
    let Some(refresh_cookie) = jar.get("refresh_token") else {
        return Err(AppError::InvalidCredentials);
    };
    let claims = jwt::verify(refresh_cookie.value(), &app_state.config.jwt_secret)?;
    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidCredentials)?;

    // Refuse to mint tokens for an account that no longer exists.
    app_state
        .user_use_cases
        .get_user(user_id)
        .await
        .map_err(|_| AppError::InvalidCredentials)?;

    let headers = session_headers(&app_state, user_id)?;
    Ok((StatusCode::OK, headers))
}

async fn logout() -> impl IntoResponse {
    let mut headers = HeaderMap::new();
    for name in ["access_token", "refresh_token"] {
        let cookie = Cookie::build((name, ""))
            .http_only(true)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(time::Duration::ZERO)
            .build();
        headers.append("set-cookie", cookie.to_string().parse().unwrap());
    }
    (StatusCode::OK, headers)
}

fn session_headers(app_state: &AppState, user_id: Uuid) -> AppResult<HeaderMap> {
    let access = jwt::issue(
        user_id,
        &app_state.config.jwt_secret,
        app_state.config.access_token_ttl,
    )?;
    let refresh = jwt::issue(
        user_id,
        &app_state.config.jwt_secret,
        app_state.config.refresh_token_ttl,
    )?;

    let mut headers = HeaderMap::new();
    let access = Cookie::build(("access_token", access))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .build();
    let refresh = Cookie::build(("refresh_token", refresh))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .build();
    headers.append(
        "set-cookie",
        access
            .to_string()
            .parse()
            .map_err(|_| AppError::Internal("cookie encoding failed".into()))?,
    );
    headers.append(
        "set-cookie",
        refresh
            .to_string()
            .parse()
            .map_err(|_| AppError::Internal("cookie encoding failed".into()))?,
    );
    Ok(headers)
}
