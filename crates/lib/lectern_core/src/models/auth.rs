//! Authentication domain models.
//!
//! These are internal domain models, distinct from the API request/response
//! shapes in `lectern_api::models` (which carry camelCase renames).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a principal, both system-wide and inside a course membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "principal_role")]
pub enum Role {
    Student,
    Teacher,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "Student",
            Role::Teacher => "Teacher",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "teacher" => Ok(Role::Teacher),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// Domain principal (an authenticated user).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Principal {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Principal with password hash (for internal auth flows).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PrincipalWithPassword {
    #[sqlx(flatten)]
    pub principal: Principal,
    pub password_hash: String,
}

/// Refresh token record stored in the database.
///
/// Only the SHA-256 hash of the opaque secret is persisted.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct RefreshTokenRecord {
    pub id: i64,
    pub principal_id: i64,
    pub token_hash: String,
    pub jwt_id: String,
    pub used: bool,
    pub revoked: bool,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    #[inline]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Redeemable: neither used, revoked nor expired.
    #[inline]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.used && !self.revoked && !self.is_expired(now)
    }
}

/// Fields required to persist a new refresh token.
#[derive(Debug, Clone)]
pub struct NewRefreshToken {
    pub principal_id: i64,
    pub token_hash: String,
    pub jwt_id: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// JWT claims embedded in access tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: principal ID as a decimal string.
    pub sub: String,
    pub email: String,
    /// Display name.
    pub name: String,
    pub role: Role,
    /// Unique token ID, linked from the refresh token issued alongside.
    pub jti: String,
    pub iss: String,
    pub aud: String,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiry (unix timestamp).
    pub exp: i64,
}

impl TokenClaims {
    /// Principal ID parsed from `sub`.
    pub fn principal_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

/// Freshly minted access/refresh token pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    /// Opaque refresh secret, returned to the client exactly once.
    pub refresh_token: String,
    /// Access token expiry.
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn record(used: bool, revoked: bool, expires_in: Duration) -> RefreshTokenRecord {
        let now = Utc::now();
        RefreshTokenRecord {
            id: 1,
            principal_id: 7,
            token_hash: "h".into(),
            jwt_id: "j".into(),
            used,
            revoked,
            issued_at: now,
            expires_at: now + expires_in,
        }
    }

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("teacher".parse::<Role>(), Ok(Role::Teacher));
        assert_eq!("Student".parse::<Role>(), Ok(Role::Student));
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn role_serializes_as_pascal_case() {
        assert_eq!(serde_json::to_string(&Role::Teacher).unwrap(), "\"Teacher\"");
    }

    #[test]
    fn refresh_token_activity() {
        let now = Utc::now();
        assert!(record(false, false, Duration::days(1)).is_active(now));
        assert!(!record(true, false, Duration::days(1)).is_active(now));
        assert!(!record(false, true, Duration::days(1)).is_active(now));
        assert!(!record(false, false, Duration::seconds(-1)).is_active(now));
    }
}
