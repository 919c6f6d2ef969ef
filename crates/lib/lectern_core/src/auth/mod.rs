//! Authentication.
//!
//! Password hashing, JWT signing and the refresh-token lifecycle, plus the
//! account flows built on top of them. Shared by every `lectern_api` handler
//! through [`accounts::AccountService`] and [`tokens::TokenIssuer`].

pub mod accounts;
pub mod jwt;
pub mod password;
pub mod tokens;

use thiserror::Error;

use crate::store::StoreError;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email or wrong password. The two cases share one message.
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid access token")]
    InvalidToken,

    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    #[error("{0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}
