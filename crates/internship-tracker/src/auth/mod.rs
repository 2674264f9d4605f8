//! Account registration, credential checks, and bearer sessions.
//!
//! The tracker only ever consumes the [`OwnerId`] an [`Authenticator`] resolves from a
//! bearer token; it never sees credentials.

pub mod memory;
mod password;
pub mod router;

use std::sync::Arc;

use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::applications::OwnerId;

pub use memory::InMemoryAuthenticator;
pub use password::{is_valid_cost, DEFAULT_PASSWORD_COST, MIN_PASSWORD_COST};
pub use router::auth_routes;

/// Sign-up payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub age: Option<u8>,
    pub gender: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Public view of an account. The password hash never leaves the authenticator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub id: OwnerId,
    pub username: String,
    pub email: String,
    pub age: Option<u8>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Bearer session issued on login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserProfile,
}

/// Identity capability consumed by the gateway.
pub trait Authenticator: Send + Sync {
    fn register(&self, registration: Registration) -> Result<UserProfile, AuthError>;
    fn login(&self, credentials: Credentials) -> Result<Session, AuthError>;
    /// Resolve a bearer token to the user it was issued for.
    fn authorize(&self, token: &str) -> Result<OwnerId, AuthError>;
    fn profile(&self, user: OwnerId) -> Result<UserProfile, AuthError>;
}

pub type SharedAuthenticator = Arc<dyn Authenticator>;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid registration: {0}")]
    InvalidRegistration(&'static str),
    #[error("invalid request: {0}")]
    MalformedRequest(String),
    #[error("username already taken")]
    UsernameTaken,
    #[error("email already registered")]
    EmailTaken,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("missing bearer token")]
    MissingToken,
    #[error("invalid bearer token")]
    InvalidToken,
    #[error("session expired")]
    SessionExpired,
    #[error("user not found")]
    UnknownUser,
    #[error("authenticator unavailable: {0}")]
    Unavailable(String),
}

/// Extractor resolving the `Authorization: Bearer` header to the caller's identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser(pub OwnerId);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    SharedAuthenticator: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(AuthError::MissingToken)?;
        let authenticator = SharedAuthenticator::from_ref(state);
        let owner = authenticator.authorize(token)?;
        Ok(Self(owner))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_accepts_case_insensitive_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer abc123"));
        assert_eq!(bearer_token(&headers), Some("abc123"));
    }

    #[test]
    fn bearer_token_rejects_other_schemes_and_blank_tokens() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwdw=="));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert_eq!(bearer_token(&headers), None);

        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
