use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::{common::ApiError, server::AppState};

pub async fn check_auth(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get("authorization")
        .and_then(|h| h.to_str().ok());

    let reason = match auth_header {
        Some(auth) if auth == state.config.server.password => return Ok(next.run(req).await),
        Some(_) => "Invalid password",
        None => "Missing Authorization header",
    };

    warn!("REST Authorization failed on {}: {}", req.uri().path(), reason);
    Err(ApiError::new(
        StatusCode::UNAUTHORIZED,
        reason,
        req.uri().path(),
    ))
}

pub async fn add_response_headers(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    response
        .headers_mut()
        .insert("Rustbeat-Api-Version", HeaderValue::from_static("1"));
    response
}
