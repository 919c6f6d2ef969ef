//! Account flows: registration, login, token refresh, profile and password.

use std::sync::{Arc, LazyLock};

use tracing::{info, warn};

use super::AuthError;
use super::password::{hash_password, verify_password};
use super::tokens::TokenIssuer;
use crate::models::auth::{Principal, Role, TokenPair};
use crate::store::{Store, StoreError};

/// Minimum password length accepted on registration and password change.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Checked against when no account matches, so an unknown email costs the
/// same bcrypt verify as a wrong password.
static UNKNOWN_ACCOUNT_HASH: LazyLock<String> =
    LazyLock::new(|| hash_password("unknown-account").unwrap_or_default());

/// Registration form.
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub role: Role,
}

/// Principal plus the token pair issued for them.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub principal: Principal,
    pub tokens: TokenPair,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

fn check_new_password(password: &str, confirm: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if password != confirm {
        return Err(AuthError::Validation("Passwords do not match".into()));
    }
    Ok(())
}

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn Store>,
    tokens: TokenIssuer,
}

impl AccountService {
    pub fn new(store: Arc<dyn Store>, tokens: TokenIssuer) -> Self {
        Self { store, tokens }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Create a principal and sign them in.
    pub async fn register(&self, input: RegisterInput) -> Result<AuthSession, AuthError> {
        let name = input.name.trim();
        let email = normalize_email(&input.email);
        if name.is_empty() {
            return Err(AuthError::Validation("Name is required".into()));
        }
        if email.is_empty() || !email.contains('@') {
            return Err(AuthError::Validation("A valid email is required".into()));
        }
        check_new_password(&input.password, &input.confirm_password)?;

        if self.store.email_exists(&email).await? {
            return Err(AuthError::Validation("Email already registered".into()));
        }

        let hash = hash_password(&input.password)?;
        let principal = match self
            .store
            .create_principal(name, &email, &hash, input.role)
            .await
        {
            Ok(p) => p,
            // Lost a race against a concurrent registration.
            Err(StoreError::Conflict(_)) => {
                return Err(AuthError::Validation("Email already registered".into()));
            }
            Err(e) => return Err(e.into()),
        };

        info!(principal_id = principal.id, role = %principal.role, "registered principal");
        let tokens = self.tokens.issue(&principal).await?;
        Ok(AuthSession { principal, tokens })
    }

    /// Authenticate with email and password.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let Some(row) = self.store.find_principal_by_email(&normalize_email(email)).await? else {
            let _ = verify_password(password, &UNKNOWN_ACCOUNT_HASH);
            return Err(AuthError::InvalidCredentials);
        };
        if !verify_password(password, &row.password_hash) {
            warn!(principal_id = row.principal.id, "failed login");
            return Err(AuthError::InvalidCredentials);
        }
        let tokens = self.tokens.issue(&row.principal).await?;
        Ok(AuthSession {
            principal: row.principal,
            tokens,
        })
    }

    pub async fn refresh(&self, access_token: &str, refresh_token: &str) -> Result<TokenPair, AuthError> {
        self.tokens.redeem(access_token, refresh_token).await
    }

    /// Revoke the given refresh token. Unknown tokens are not an error.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        self.tokens.revoke(refresh_token).await?;
        Ok(())
    }

    pub async fn me(&self, principal_id: i64) -> Result<Principal, AuthError> {
        self.store
            .find_principal(principal_id)
            .await?
            .map(|p| p.principal)
            .ok_or(AuthError::InvalidToken)
    }

    pub async fn update_profile(&self, principal_id: i64, name: &str) -> Result<Principal, AuthError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AuthError::Validation("Name is required".into()));
        }
        self.store
            .update_principal_name(principal_id, name)
            .await?
            .ok_or(AuthError::InvalidToken)
    }

    /// Replace the password and revoke every outstanding refresh token.
    pub async fn change_password(
        &self,
        principal_id: i64,
        current: &str,
        new_password: &str,
        confirm: &str,
    ) -> Result<(), AuthError> {
        let row = self
            .store
            .find_principal(principal_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;
        if !verify_password(current, &row.password_hash) {
            return Err(AuthError::Validation("Current password is incorrect".into()));
        }
        check_new_password(new_password, confirm)?;

        let hash = hash_password(new_password)?;
        self.store.update_password_hash(principal_id, &hash).await?;
        self.tokens.revoke_all(principal_id).await?;
        info!(principal_id, "password changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::TokenSettings;
    use crate::store::MemoryStore;

    fn service() -> AccountService {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let tokens = TokenIssuer::new(store.clone(), TokenSettings::new("test-secret"));
        AccountService::new(store, tokens)
    }

    fn input(email: &str, password: &str, confirm: &str) -> RegisterInput {
        RegisterInput {
            name: "Marie".into(),
            email: email.into(),
            password: password.into(),
            confirm_password: confirm.into(),
            role: Role::Teacher,
        }
    }

    #[tokio::test]
    async fn register_and_login() {
        let svc = service();
        let session = svc
            .register(input("Marie@Example.com", "radium-88", "radium-88"))
            .await
            .unwrap();
        assert_eq!(session.principal.email, "marie@example.com");
        assert_eq!(session.principal.role, Role::Teacher);

        let login = svc.login("marie@example.com", "radium-88").await.unwrap();
        assert_eq!(login.principal.id, session.principal.id);
    }

    #[tokio::test]
    async fn register_rejects_bad_input() {
        let svc = service();
        let mismatch = svc.register(input("a@b.c", "password1", "password2")).await;
        assert!(matches!(mismatch, Err(AuthError::Validation(_))));

        let short = svc.register(input("a@b.c", "short", "short")).await;
        assert!(matches!(short, Err(AuthError::Validation(_))));

        let mut nameless = input("a@b.c", "password1", "password1");
        nameless.name = "  ".into();
        assert!(matches!(svc.register(nameless).await, Err(AuthError::Validation(_))));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let svc = service();
        svc.register(input("dup@example.com", "password1", "password1"))
            .await
            .unwrap();
        let err = svc
            .register(input("DUP@example.com", "password1", "password1"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Email already registered");
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let svc = service();
        svc.register(input("known@example.com", "password1", "password1"))
            .await
            .unwrap();

        let unknown = svc.login("nobody@example.com", "password1").await.unwrap_err();
        let wrong = svc.login("known@example.com", "password2").await.unwrap_err();
        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
        assert_eq!(unknown.to_string(), "Invalid email or password");
    }

    #[test]
    fn unknown_account_hash_is_a_real_digest() {
        assert!(UNKNOWN_ACCOUNT_HASH.starts_with("$2b$10$"));
        assert!(!verify_password("password1", &UNKNOWN_ACCOUNT_HASH));
    }

    #[tokio::test]
    async fn logout_revokes_refresh_token() {
        let svc = service();
        let session = svc
            .register(input("out@example.com", "password1", "password1"))
            .await
            .unwrap();
        svc.logout(&session.tokens.refresh_token).await.unwrap();
        let result = svc
            .refresh(&session.tokens.access_token, &session.tokens.refresh_token)
            .await;
        assert!(matches!(result, Err(AuthError::InvalidRefreshToken)));
    }

    #[tokio::test]
    async fn change_password_revokes_all_tokens() {
        let svc = service();
        let session = svc
            .register(input("pw@example.com", "password1", "password1"))
            .await
            .unwrap();
        let id = session.principal.id;

        let wrong = svc.change_password(id, "nope-nope", "password2", "password2").await;
        assert!(matches!(wrong, Err(AuthError::Validation(_))));

        svc.change_password(id, "password1", "password2", "password2")
            .await
            .unwrap();

        let refresh = svc
            .refresh(&session.tokens.access_token, &session.tokens.refresh_token)
            .await;
        assert!(matches!(refresh, Err(AuthError::InvalidRefreshToken)));
        assert!(svc.login("pw@example.com", "password1").await.is_err());
        assert!(svc.login("pw@example.com", "password2").await.is_ok());
    }

    #[tokio::test]
    async fn update_profile_trims_and_requires_name() {
        let svc = service();
        let session = svc
            .register(input("p@example.com", "password1", "password1"))
            .await
            .unwrap();
        let id = session.principal.id;
        let updated = svc.update_profile(id, "  Marie C.  ").await.unwrap();
        assert_eq!(updated.name, "Marie C.");
        assert_eq!(svc.me(id).await.unwrap().name, "Marie C.");
        assert!(svc.update_profile(id, "").await.is_err());
    }
}
