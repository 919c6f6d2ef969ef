//! JWT signing and verification.

use std::path::PathBuf;

use chrono::Duration;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use tracing::info;

use super::AuthError;
use crate::models::auth::TokenClaims;

/// Default issuer claim.
pub const DEFAULT_ISSUER: &str = "lectern";

/// Default audience claim.
pub const DEFAULT_AUDIENCE: &str = "lectern-clients";

/// Signing key and token lifetimes, loaded once at startup.
#[derive(Clone)]
pub struct TokenSettings {
    pub secret: Vec<u8>,
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl TokenSettings {
    /// Settings with the default issuer/audience, 15 minute access tokens and
    /// 30 day refresh tokens.
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
            issuer: DEFAULT_ISSUER.to_string(),
            audience: DEFAULT_AUDIENCE.to_string(),
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(30),
        }
    }

    fn validation(&self, validate_exp: bool) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.validate_exp = validate_exp;
        validation.leeway = 0;
        validation
    }
}

impl std::fmt::Debug for TokenSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSettings")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

/// Sign a claim set with HS256.
pub fn encode_access_token(claims: &TokenClaims, settings: &TokenSettings) -> Result<String, AuthError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(&settings.secret),
    )
    .map_err(|e| AuthError::Internal(format!("jwt encode: {e}")))
}

/// Verify an access token, including expiry.
pub fn verify_access_token(token: &str, settings: &TokenSettings) -> Option<TokenClaims> {
    decode_with(token, settings, true)
}

/// Verify signature, algorithm, issuer and audience but accept an expired
/// token. Only the refresh flow may use this.
pub fn verify_ignoring_expiry(token: &str, settings: &TokenSettings) -> Option<TokenClaims> {
    decode_with(token, settings, false)
}

fn decode_with(token: &str, settings: &TokenSettings, validate_exp: bool) -> Option<TokenClaims> {
    let key = DecodingKey::from_secret(&settings.secret);
    decode::<TokenClaims>(token, &key, &settings.validation(validate_exp))
        .ok()
        .map(|data| data.claims)
}

/// Resolve the JWT secret: env var `JWT_SECRET` → `AUTH_SECRET` → persisted file.
pub fn resolve_jwt_secret() -> String {
    for var in ["JWT_SECRET", "AUTH_SECRET"] {
        if let Ok(secret) = std::env::var(var)
            && !secret.is_empty()
        {
            return secret;
        }
    }
    let secret_path = jwt_secret_path();
    if let Ok(existing) = std::fs::read_to_string(&secret_path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let secret: String = rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    if let Some(parent) = secret_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = std::fs::write(&secret_path, &secret);
    info!(path = %secret_path.display(), "generated new JWT secret");
    secret
}

/// Path to the persisted JWT secret file.
fn jwt_secret_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lectern")
        .join("jwt-secret")
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::auth::Role;

    fn claims(settings: &TokenSettings, exp_offset: Duration) -> TokenClaims {
        let now = Utc::now();
        TokenClaims {
            sub: "42".into(),
            email: "t@example.com".into(),
            name: "T".into(),
            role: Role::Teacher,
            jti: "jti-1".into(),
            iss: settings.issuer.clone(),
            aud: settings.audience.clone(),
            iat: now.timestamp(),
            exp: (now + exp_offset).timestamp(),
        }
    }

    #[test]
    fn valid_token_round_trips() {
        let settings = TokenSettings::new("secret");
        let token = encode_access_token(&claims(&settings, Duration::minutes(5)), &settings).unwrap();
        let decoded = verify_access_token(&token, &settings).unwrap();
        assert_eq!(decoded.principal_id(), Some(42));
        assert_eq!(decoded.role, Role::Teacher);
    }

    #[test]
    fn expired_token_only_passes_lenient_check() {
        let settings = TokenSettings::new("secret");
        let token = encode_access_token(&claims(&settings, Duration::hours(-1)), &settings).unwrap();
        assert!(verify_access_token(&token, &settings).is_none());
        assert!(verify_ignoring_expiry(&token, &settings).is_some());
    }

    #[test]
    fn recently_expired_token_is_rejected() {
        let settings = TokenSettings::new("secret");
        let token = encode_access_token(&claims(&settings, Duration::seconds(-30)), &settings).unwrap();
        assert!(verify_access_token(&token, &settings).is_none());
        assert!(verify_ignoring_expiry(&token, &settings).is_some());
    }

    #[test]
    fn wrong_key_issuer_or_audience_is_rejected() {
        let settings = TokenSettings::new("secret");
        let token = encode_access_token(&claims(&settings, Duration::minutes(5)), &settings).unwrap();

        let other_key = TokenSettings::new("other");
        assert!(verify_ignoring_expiry(&token, &other_key).is_none());

        let mut other_issuer = TokenSettings::new("secret");
        other_issuer.issuer = "someone-else".into();
        assert!(verify_ignoring_expiry(&token, &other_issuer).is_none());

        let mut other_audience = TokenSettings::new("secret");
        other_audience.audience = "another-app".into();
        assert!(verify_ignoring_expiry(&token, &other_audience).is_none());
    }

    #[test]
    fn other_algorithms_are_rejected() {
        let settings = TokenSettings::new("secret");
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims(&settings, Duration::minutes(5)),
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert!(verify_access_token(&token, &settings).is_none());
    }
}
