//! Access/refresh token lifecycle.
//!
//! A refresh token is an opaque random secret handed to the client once; only
//! its SHA-256 hash is stored. Each refresh token can be redeemed exactly
//! once: redemption flips `used` with a conditional update, so concurrent
//! redemptions of the same secret yield a single winner.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use rand::{RngCore, rng};
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use uuid::Uuid;

use super::AuthError;
use super::jwt::{self, TokenSettings};
use crate::models::auth::{NewRefreshToken, Principal, TokenClaims, TokenPair};
use crate::store::Store;

/// Refresh secret length in bytes before encoding.
const REFRESH_SECRET_BYTES: usize = 64;

/// Generate a random refresh secret (64 bytes, base64url).
fn generate_refresh_secret() -> String {
    let mut bytes = [0u8; REFRESH_SECRET_BYTES];
    rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// SHA-256 hash a refresh secret for storage.
fn hash_refresh_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Issues, rotates, verifies and revokes tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    store: Arc<dyn Store>,
    settings: Arc<TokenSettings>,
}

impl TokenIssuer {
    pub fn new(store: Arc<dyn Store>, settings: TokenSettings) -> Self {
        Self {
            store,
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> &TokenSettings {
        &self.settings
    }

    /// Mint a signed access token and a fresh refresh token for `principal`.
    pub async fn issue(&self, principal: &Principal) -> Result<TokenPair, AuthError> {
        let now = Utc::now();
        let expires_at = now + self.settings.access_ttl;
        let jti = Uuid::new_v4().to_string();
        let claims = TokenClaims {
            sub: principal.id.to_string(),
            email: principal.email.clone(),
            name: principal.name.clone(),
            role: principal.role,
            jti: jti.clone(),
            iss: self.settings.issuer.clone(),
            aud: self.settings.audience.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let access_token = jwt::encode_access_token(&claims, &self.settings)?;

        let refresh_token = generate_refresh_secret();
        self.store
            .insert_refresh_token(NewRefreshToken {
                principal_id: principal.id,
                token_hash: hash_refresh_secret(&refresh_token),
                jwt_id: jti,
                issued_at: now,
                expires_at: now + self.settings.refresh_ttl,
            })
            .await?;

        debug!(principal_id = principal.id, "issued token pair");
        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_at,
        })
    }

    /// Exchange a (possibly expired) access token plus its refresh secret for
    /// a new pair. The refresh token is consumed.
    pub async fn redeem(&self, access_token: &str, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = jwt::verify_ignoring_expiry(access_token, &self.settings)
            .ok_or(AuthError::InvalidToken)?;
        let principal_id = claims.principal_id().ok_or(AuthError::InvalidToken)?;

        let record = self
            .store
            .find_refresh_token(&hash_refresh_secret(refresh_token))
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        if record.principal_id != principal_id || !record.is_active(Utc::now()) {
            debug!(principal_id, token_id = record.id, "refresh token not redeemable");
            return Err(AuthError::InvalidRefreshToken);
        }

        if !self.store.mark_refresh_token_used(record.id).await? {
            info!(principal_id, token_id = record.id, "lost refresh token race");
            return Err(AuthError::InvalidRefreshToken);
        }

        let principal = self
            .store
            .find_principal(principal_id)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?
            .principal;

        self.issue(&principal).await
    }

    /// Verify an access token for request authentication.
    pub fn verify(&self, access_token: &str) -> Result<TokenClaims, AuthError> {
        jwt::verify_access_token(access_token, &self.settings).ok_or(AuthError::InvalidToken)
    }

    /// Revoke a single refresh token. Returns whether an active token was found.
    pub async fn revoke(&self, refresh_token: &str) -> Result<bool, AuthError> {
        Ok(self
            .store
            .revoke_refresh_token(&hash_refresh_secret(refresh_token))
            .await?)
    }

    /// Revoke every active refresh token of a principal.
    pub async fn revoke_all(&self, principal_id: i64) -> Result<u64, AuthError> {
        let revoked = self.store.revoke_all_refresh_tokens(principal_id).await?;
        info!(principal_id, revoked, "revoked refresh tokens");
        Ok(revoked)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::models::auth::Role;
    use crate::store::{MemoryStore, PrincipalStore, TokenStore};

    async fn setup(settings: TokenSettings) -> (Arc<MemoryStore>, TokenIssuer, Principal) {
        let store = Arc::new(MemoryStore::new());
        let principal = store
            .create_principal("Grace", "grace@example.com", "unused", Role::Student)
            .await
            .unwrap();
        let issuer = TokenIssuer::new(store.clone(), settings);
        (store, issuer, principal)
    }

    #[test]
    fn refresh_secret_is_random_and_hashed() {
        let a = generate_refresh_secret();
        let b = generate_refresh_secret();
        assert_ne!(a, b);
        let hash = hash_refresh_secret(&a);
        assert_eq!(hash.len(), 64);
        assert_ne!(hash, a);
    }

    #[tokio::test]
    async fn issue_then_verify() {
        let (_, issuer, principal) = setup(TokenSettings::new("k")).await;
        let pair = issuer.issue(&principal).await.unwrap();
        let claims = issuer.verify(&pair.access_token).unwrap();
        assert_eq!(claims.principal_id(), Some(principal.id));
        assert_eq!(claims.role, Role::Student);
        assert_eq!(claims.name, "Grace");
    }

    #[tokio::test]
    async fn redeem_rotates_and_consumes() {
        let (store, issuer, principal) = setup(TokenSettings::new("k")).await;
        let pair = issuer.issue(&principal).await.unwrap();

        let next = issuer.redeem(&pair.access_token, &pair.refresh_token).await.unwrap();
        assert_ne!(next.refresh_token, pair.refresh_token);

        let old = store
            .find_refresh_token(&hash_refresh_secret(&pair.refresh_token))
            .await
            .unwrap()
            .unwrap();
        assert!(old.used);

        let again = issuer.redeem(&pair.access_token, &pair.refresh_token).await;
        assert!(matches!(again, Err(AuthError::InvalidRefreshToken)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_redemptions_have_one_winner() {
        let (store, issuer, principal) = setup(TokenSettings::new("k")).await;
        let pair = issuer.issue(&principal).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let issuer = issuer.clone();
            let access = pair.access_token.clone();
            let refresh = pair.refresh_token.clone();
            handles.push(tokio::spawn(async move { issuer.redeem(&access, &refresh).await }));
        }

        let mut wins = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => wins += 1,
                Err(e) => assert!(matches!(e, AuthError::InvalidRefreshToken)),
            }
        }
        assert_eq!(wins, 1);

        let record = store
            .find_refresh_token(&hash_refresh_secret(&pair.refresh_token))
            .await
            .unwrap()
            .unwrap();
        assert!(record.used);
    }

    #[tokio::test]
    async fn expired_refresh_token_fails() {
        let mut settings = TokenSettings::new("k");
        settings.refresh_ttl = Duration::seconds(-1);
        let (_, issuer, principal) = setup(settings).await;
        let pair = issuer.issue(&principal).await.unwrap();

        let result = issuer.redeem(&pair.access_token, &pair.refresh_token).await;
        assert!(matches!(result, Err(AuthError::InvalidRefreshToken)));
    }

    #[tokio::test]
    async fn expired_refresh_token_fails_whatever_its_flags() {
        let mut settings = TokenSettings::new("k");
        settings.refresh_ttl = Duration::seconds(-1);
        let (store, issuer, principal) = setup(settings).await;

        let revoked = issuer.issue(&principal).await.unwrap();
        assert!(issuer.revoke(&revoked.refresh_token).await.unwrap());
        let result = issuer.redeem(&revoked.access_token, &revoked.refresh_token).await;
        assert!(matches!(result, Err(AuthError::InvalidRefreshToken)));

        let used = issuer.issue(&principal).await.unwrap();
        let record = store
            .find_refresh_token(&hash_refresh_secret(&used.refresh_token))
            .await
            .unwrap()
            .unwrap();
        assert!(store.mark_refresh_token_used(record.id).await.unwrap());
        let result = issuer.redeem(&used.access_token, &used.refresh_token).await;
        assert!(matches!(result, Err(AuthError::InvalidRefreshToken)));
    }

    #[tokio::test]
    async fn expired_access_token_can_still_be_refreshed() {
        let mut settings = TokenSettings::new("k");
        settings.access_ttl = Duration::hours(-1);
        let (_, issuer, principal) = setup(settings).await;
        let pair = issuer.issue(&principal).await.unwrap();

        assert!(issuer.verify(&pair.access_token).is_err());
        assert!(issuer.redeem(&pair.access_token, &pair.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn refresh_token_of_another_principal_fails() {
        let (store, issuer, grace) = setup(TokenSettings::new("k")).await;
        let alan = store
            .create_principal("Alan", "alan@example.com", "unused", Role::Student)
            .await
            .unwrap();
        let grace_pair = issuer.issue(&grace).await.unwrap();
        let alan_pair = issuer.issue(&alan).await.unwrap();

        let result = issuer
            .redeem(&alan_pair.access_token, &grace_pair.refresh_token)
            .await;
        assert!(matches!(result, Err(AuthError::InvalidRefreshToken)));
    }

    #[tokio::test]
    async fn foreign_signature_is_invalid_token() {
        let (store, issuer, principal) = setup(TokenSettings::new("k")).await;
        let pair = issuer.issue(&principal).await.unwrap();

        let forger = TokenIssuer::new(store, TokenSettings::new("not-k"));
        let forged = forger.issue(&principal).await.unwrap();

        let result = issuer.redeem(&forged.access_token, &pair.refresh_token).await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn unknown_refresh_token_fails() {
        let (_, issuer, principal) = setup(TokenSettings::new("k")).await;
        let pair = issuer.issue(&principal).await.unwrap();
        let result = issuer.redeem(&pair.access_token, "made-up").await;
        assert!(matches!(result, Err(AuthError::InvalidRefreshToken)));
    }

    #[tokio::test]
    async fn revoked_tokens_cannot_be_redeemed() {
        let (_, issuer, principal) = setup(TokenSettings::new("k")).await;
        let first = issuer.issue(&principal).await.unwrap();
        let second = issuer.issue(&principal).await.unwrap();

        assert!(issuer.revoke(&first.refresh_token).await.unwrap());
        assert!(!issuer.revoke(&first.refresh_token).await.unwrap());
        let result = issuer.redeem(&first.access_token, &first.refresh_token).await;
        assert!(matches!(result, Err(AuthError::InvalidRefreshToken)));

        assert_eq!(issuer.revoke_all(principal.id).await.unwrap(), 1);
        let result = issuer.redeem(&second.access_token, &second.refresh_token).await;
        assert!(matches!(result, Err(AuthError::InvalidRefreshToken)));
    }
}
