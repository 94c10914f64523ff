//! Identity resolution seam.
//!
//! The API treats authentication as an external collaborator: all it needs
//! is something that turns a bearer token into a stable owner id. The
//! default implementation resolves against a configured token map; a real
//! deployment can plug in a JWT validator behind the same trait.

use std::collections::HashMap;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Resolves a bearer token to a stable owner id, or `None` when the token
/// is unknown.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, token: &str) -> Option<Uuid>;
}

/// Token-map resolver built from configuration.
#[derive(Debug, Default)]
pub struct StaticTokenResolver {
    tokens: HashMap<String, Uuid>,
}

impl StaticTokenResolver {
    pub fn new(tokens: HashMap<String, Uuid>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl IdentityResolver for StaticTokenResolver {
    async fn resolve(&self, token: &str) -> Option<Uuid> {
        self.tokens.get(token).copied()
    }
}

/// The resolved caller identity, extracted from the `Authorization` header.
///
/// Extraction failure is an input-layer rejection (401) before any handler
/// side effects.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub Uuid);

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

        let token = header
            .strip_prefix("Bearer ")
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::unauthorized("Invalid Authorization header format"))?;

        match state.identity.resolve(token).await {
            Some(owner_id) => Ok(AuthenticatedUser(owner_id)),
            None => {
                tracing::debug!("token did not resolve to a known identity");
                Err(ApiError::unauthorized("Invalid token"))
            }
        }
    }
}
