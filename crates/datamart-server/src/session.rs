use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use chrono::{DateTime, Utc};
use datamart_core::AppError;

use crate::error::RequestError;
use crate::SharedState;

/// Proof that the request carried a valid admin bearer token.
#[derive(Debug, Clone, Copy)]
pub struct AdminSession {
    pub expires_at: DateTime<Utc>,
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then_some(token.trim())
        .filter(|token| !token.is_empty())
}

impl FromRequestParts<SharedState> for AdminSession {
    type Rejection = RequestError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AppError::Unauthorized)?;
        let expires_at = state.auth.verify(token, Utc::now())?;
        Ok(AdminSession { expires_at })
    }
}

/// Layered over every admin route except `verify`.
pub async fn require_admin(
    State(_state): State<SharedState>,
    _session: AdminSession,
    request: Request,
    next: Next,
) -> Response {
    next.run(request).await
}
