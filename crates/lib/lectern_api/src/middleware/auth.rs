//! Authentication middleware: Bearer token extraction and JWT verification.

use axum::http::header::AUTHORIZATION;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use lectern_core::classroom::Actor;
use lectern_core::models::auth::TokenClaims;

use crate::AppState;
use crate::error::AppError;

/// Verified caller, stored in request extensions.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub claims: TokenClaims,
    pub actor: Actor,
}

/// Axum middleware: extracts `Authorization: Bearer <token>`, verifies the JWT
/// (signature, issuer, audience, expiry) and injects `AuthenticatedUser` into
/// request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".into()))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization scheme".into()))?;

    let claims = state
        .accounts
        .tokens()
        .verify(token)
        .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;
    let actor = Actor::from_claims(&claims)
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired token".into()))?;

    request
        .extensions_mut()
        .insert(AuthenticatedUser { claims, actor });

    Ok(next.run(request).await)
}
