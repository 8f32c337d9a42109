use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use axum_extra::extract::CookieJar;
use serde::Serialize;
use telemon_providers::Collector;

#[derive(Clone)]
pub struct AppState {
    pub collector: Arc<Collector>,
    /// When set, API routes require this token.
    pub auth_token: Option<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Middleware for API routes: checks Authorization: Bearer <token> header.
/// Open when no token is configured.
pub async fn require_api_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected) = state.auth_token.as_deref() else {
        return next.run(request).await;
    };

    let authHeader = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    // Also accept session_token cookie for API requests from the browser
    let cookieToken = jar.get("session_token").map(|c| c.value().to_string());

    let isAuthorized = match authHeader.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) => token == expected,
        None => cookieToken.as_deref() == Some(expected),
    };

    if !isAuthorized {
        return (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "unauthorized".into(),
            }),
        )
            .into_response();
    }

    next.run(request).await
}
