//! Bearer-token authentication.
//!
//! Tokens are issued by the external auth service, which also writes the
//! `sessions` table. This side only checks them.

use async_trait::async_trait;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::extract::FromRequestParts;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::AppState;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// Who a valid token belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Principal {
    pub subject_id: Uuid,
    pub role: Role,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing or invalid authorization header")]
    MissingToken,

    #[error("invalid or expired token")]
    InvalidToken,

    #[error("session is inactive")]
    Inactive,

    #[error("user is blocked")]
    Blocked,

    #[error("{0} access required")]
    WrongRole(&'static str),

    #[error("failed to validate token: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, token: &str) -> Result<Principal, AuthError>;
}

#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    subject_id: Uuid,
    role: String,
    status: String,
    expires_at: DateTime<Utc>,
    is_blocked: Option<bool>,
}

impl SessionRow {
    fn check(self, now: DateTime<Utc>) -> Result<Principal, AuthError> {
        let role = Role::parse(&self.role).ok_or(AuthError::InvalidToken)?;
        if self.expires_at <= now {
            return Err(AuthError::InvalidToken);
        }
        if self.status != "active" {
            return Err(AuthError::Inactive);
        }
        if role == Role::User {
            match self.is_blocked {
                None => return Err(AuthError::InvalidToken),
                Some(true) => return Err(AuthError::Blocked),
                Some(false) => {}
            }
        }
        Ok(Principal { subject_id: self.subject_id, role })
    }
}

/// Looks tokens up in the `sessions` table.
#[derive(Debug, Clone)]
pub struct PgSessionAuthenticator {
    pool: PgPool,
}

impl PgSessionAuthenticator {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl Authenticator for PgSessionAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<Principal, AuthError> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT s.subject_id, s.role, s.status, s.expires_at, u.is_blocked \
             FROM sessions s LEFT JOIN users u ON u.id = s.subject_id \
             WHERE s.token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(AuthError::InvalidToken)?.check(Utc::now())
    }
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let mut parts = value.splitn(2, ' ');

    let scheme = parts.next()?;
    let token = parts.next()?.trim();

    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return None;
    }

    Some(token)
}

async fn principal(parts: &Parts, state: &AppState) -> Result<Principal, AuthError> {
    let token = extract_bearer_token(&parts.headers).ok_or(AuthError::MissingToken)?;
    state.auth.authenticate(token).await
}

/// A signed-in, unblocked shopper.
#[derive(Clone, Copy, Debug)]
pub struct CurrentUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match principal(parts, state).await? {
            Principal { subject_id, role: Role::User } => Ok(Self(subject_id)),
            Principal { role: Role::Admin, .. } => Err(AuthError::WrongRole("user").into()),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct CurrentAdmin(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for CurrentAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match principal(parts, state).await? {
            Principal { subject_id, role: Role::Admin } => Ok(Self(subject_id)),
            Principal { role: Role::User, .. } => Err(AuthError::WrongRole("admin").into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use testresult::TestResult;

    use super::*;

    fn session(role: &str, status: &str, expires_in: i64, is_blocked: Option<bool>) -> SessionRow {
        SessionRow {
            subject_id: Uuid::now_v7(),
            role: role.into(),
            status: status.into(),
            expires_at: Utc::now() + Duration::minutes(expires_in),
            is_blocked,
        }
    }

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value.parse().unwrap());
        headers
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token(&headers("Bearer abc123")), Some("abc123"));
        assert_eq!(extract_bearer_token(&headers("bearer  abc123 ")), Some("abc123"));
        assert_eq!(extract_bearer_token(&headers("Basic abc123")), None);
        assert_eq!(extract_bearer_token(&headers("Bearer ")), None);
        assert_eq!(extract_bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_active_user_session() -> TestResult {
        let row = session("user", "active", 30, Some(false));
        let subject_id = row.subject_id;
        assert_eq!(row.check(Utc::now())?, Principal { subject_id, role: Role::User });
        Ok(())
    }

    #[test]
    fn test_rejected_sessions() {
        let now = Utc::now();
        assert!(matches!(session("user", "active", -1, Some(false)).check(now), Err(AuthError::InvalidToken)));
        assert!(matches!(session("user", "inactive", 30, Some(false)).check(now), Err(AuthError::Inactive)));
        assert!(matches!(session("user", "active", 30, Some(true)).check(now), Err(AuthError::Blocked)));
        assert!(matches!(session("user", "active", 30, None).check(now), Err(AuthError::InvalidToken)));
        assert!(matches!(session("root", "active", 30, None).check(now), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_admin_needs_no_user_row() -> TestResult {
        let principal = session("admin", "active", 30, None).check(Utc::now())?;
        assert_eq!(principal.role, Role::Admin);
        Ok(())
    }
}
