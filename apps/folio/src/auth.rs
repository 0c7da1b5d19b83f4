//! Reader identity supplied by the authentication context
//!
//! Token issuance and verification happen upstream. Folio only consumes the
//! resulting identity: in-process callers construct a [`ReaderIdentity`]
//! directly, HTTP callers pass it through gateway headers.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Header carrying the authenticated user id
pub const READER_ID_HEADER: &str = "x-reader-id";
/// Header carrying the authenticated role
pub const READER_ROLE_HEADER: &str = "x-reader-role";

/// Role of an authenticated identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular reader; the only role with progress tracking
    #[serde(alias = "user")]
    Reader,
    /// Catalog administrator
    Admin,
}

impl Role {
    /// Parse a role name ("user" is accepted for readers)
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "reader" | "user" => Some(Self::Reader),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reader => "reader",
            Self::Admin => "admin",
        }
    }
}

/// Authenticated identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReaderIdentity {
    pub user_id: String,
    pub role: Role,
}

impl ReaderIdentity {
    /// Identity with the reader role
    pub fn reader(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: Role::Reader,
        }
    }

    /// Identity with the admin role
    pub fn admin(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: Role::Admin,
        }
    }

    /// Whether reading progress is tracked for this identity
    pub fn tracks_progress(&self) -> bool {
        self.role == Role::Reader
    }
}

/// Extracts the identity forwarded by the authentication gateway.
///
/// Missing or empty id is `401`; an unknown role is `401`.
#[async_trait]
impl<S> FromRequestParts<S> for ReaderIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(READER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AppError::Unauthorized("No reader identity provided".to_string()))?;

        let role = parts
            .headers
            .get(READER_ROLE_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(Role::parse)
            .ok_or_else(|| AppError::Unauthorized("Invalid or missing role".to_string()))?;

        Ok(Self {
            user_id: user_id.to_string(),
            role,
        })
    }
}

/// Identity restricted to the reader role (`403` otherwise)
#[derive(Debug, Clone)]
pub struct RequireReader(pub ReaderIdentity);

#[async_trait]
impl<S> FromRequestParts<S> for RequireReader
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let identity = ReaderIdentity::from_request_parts(parts, state).await?;
        if !identity.tracks_progress() {
            return Err(AppError::Forbidden("Reader only".to_string()));
        }
        Ok(Self(identity))
    }
}
