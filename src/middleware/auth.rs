use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::database::models::Role;
use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated caller context injected into protected requests. The
/// tenant scope comes from the account record, re-read on every request
/// so a deleted account stops working immediately.
#[derive(Clone, Debug)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub organization: Uuid,
    pub role: Role,
}

/// Token-checking middleware for the protected routes.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(request.headers())?;
    let user = state.users.resolve_token(&token).await?;

    let context = AuthContext {
        user_id: user.id,
        name: user.name,
        email: user.email,
        organization: user.organization,
        role: Role::parse(&user.role).unwrap_or_default(),
    };
    request.extensions_mut().insert(context);

    Ok(next.run(request).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<String, ApiError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::unauthenticated("No token provided"))?;

    match header.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        _ => Err(ApiError::unauthenticated("No token provided")),
    }
}
