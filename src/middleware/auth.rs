use axum::{
    extract::Request,
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::auth::{validate_jwt, Session};

/// Resolves the session from an optional bearer token and injects it into the
/// request extensions. A missing or invalid token simply leaves the request
/// anonymous; procedures that need a session reject it themselves.
pub async fn session_middleware(headers: HeaderMap, mut request: Request, next: Next) -> Response {
    match extract_jwt_from_headers(&headers) {
        Ok(Some(token)) => match validate_jwt(&token) {
            Ok(claims) => {
                let session = Session::from(claims);
                tracing::debug!("Resolved session for user {}", session.user_id);
                request.extensions_mut().insert(session);
            }
            Err(e) => tracing::warn!("Ignoring bearer token: {}", e),
        },
        Ok(None) => {}
        Err(msg) => tracing::warn!("Ignoring Authorization header: {}", msg),
    }

    next.run(request).await
}

/// Extract a bearer token from the Authorization header, if there is one.
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<Option<String>, String> {
    let Some(auth_header) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if token.trim().is_empty() => Err("Empty JWT token".to_string()),
        Some(token) => Ok(Some(token.trim().to_string())),
        None => Err("Authorization header must use Bearer token format".to_string()),
    }
}
