// auth.rs — Bearer token → Caller.
//
// A thin session layer: each configured account has one static token. A
// request without a known token is answered with 401 before any handler
// runs.

use std::collections::HashMap;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use coach_policy::{Caller, PolicyError};

use crate::api::{ApiError, AppState};
use crate::config::AccountConfig;

#[derive(Debug, Clone, Default)]
pub struct Sessions {
    by_token: HashMap<String, Caller>,
}

impl Sessions {
    pub fn from_accounts(accounts: &[AccountConfig]) -> Result<Self, PolicyError> {
        let mut by_token = HashMap::new();
        for account in accounts {
            if account.token.trim().is_empty() {
                tracing::warn!(account = %account.id, "account has an empty token; skipped");
                continue;
            }
            by_token.insert(account.token.clone(), account.caller()?);
        }
        Ok(Self { by_token })
    }

    pub fn len(&self) -> usize {
        self.by_token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_token.is_empty()
    }

    /// Resolve the caller from an `Authorization: Bearer <token>` header.
    pub fn resolve(&self, headers: &HeaderMap) -> Option<Caller> {
        let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
        let token = value
            .strip_prefix("Bearer ")
            .or_else(|| value.strip_prefix("bearer "))?
            .trim();
        self.by_token.get(token).cloned()
    }
}

/// Extractor for an authenticated caller.
pub struct Authenticated(pub Caller);

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        state
            .sessions
            .resolve(&parts.headers)
            .map(Authenticated)
            .ok_or(ApiError::Unauthorized)
    }
}
