//! API server configuration.

use std::sync::Arc;

use chrono::Duration;
use lectern_core::auth::jwt::{DEFAULT_AUDIENCE, DEFAULT_ISSUER, TokenSettings, resolve_jwt_secret};
use lectern_core::mail::{HttpRelayMailer, LogMailer, MailError, Mailer};

/// Default request body limit: 10 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3100").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// JWT signing secret.
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub access_token_minutes: i64,
    pub refresh_token_days: i64,
    /// HTTP mail relay endpoint. `None` logs mail instead of sending it.
    pub mail_relay_url: Option<String>,
    pub mail_relay_token: Option<String>,
    pub mail_from: String,
    /// Largest accepted request body.
    pub max_upload_bytes: usize,
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.into())
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env_opt(name).and_then(|v| v.parse().ok()).unwrap_or(default)
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                     | Default                            |
    /// |------------------------------|------------------------------------|
    /// | `BIND_ADDR`                  | `127.0.0.1:3100`                   |
    /// | `DATABASE_URL`               | `postgres://localhost:5432/lectern`|
    /// | `JWT_SECRET` / `AUTH_SECRET` | generated & persisted to file      |
    /// | `JWT_ISSUER`                 | `lectern`                          |
    /// | `JWT_AUDIENCE`               | `lectern-clients`                  |
    /// | `ACCESS_TOKEN_MINUTES`       | `15`                               |
    /// | `REFRESH_TOKEN_DAYS`         | `30`                               |
    /// | `MAIL_RELAY_URL`             | unset (mail is logged)             |
    /// | `MAIL_RELAY_TOKEN`           | unset                              |
    /// | `MAIL_FROM`                  | `noreply@lectern.local`            |
    /// | `MAX_UPLOAD_BYTES`           | `10485760`                         |
    pub fn from_env() -> Self {
        Self {
            bind_addr: env_or("BIND_ADDR", "127.0.0.1:3100"),
            database_url: env_or("DATABASE_URL", "postgres://localhost:5432/lectern"),
            jwt_secret: resolve_jwt_secret(),
            jwt_issuer: env_or("JWT_ISSUER", DEFAULT_ISSUER),
            jwt_audience: env_or("JWT_AUDIENCE", DEFAULT_AUDIENCE),
            access_token_minutes: env_parse("ACCESS_TOKEN_MINUTES", 15),
            refresh_token_days: env_parse("REFRESH_TOKEN_DAYS", 30),
            mail_relay_url: env_opt("MAIL_RELAY_URL"),
            mail_relay_token: env_opt("MAIL_RELAY_TOKEN"),
            mail_from: env_or("MAIL_FROM", "noreply@lectern.local"),
            max_upload_bytes: env_parse("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES),
        }
    }

    /// Defaults for everything except the signing secret. Reads no environment.
    pub fn with_secret(jwt_secret: impl Into<String>) -> Self {
        Self {
            bind_addr: "127.0.0.1:3100".into(),
            database_url: "postgres://localhost:5432/lectern".into(),
            jwt_secret: jwt_secret.into(),
            jwt_issuer: DEFAULT_ISSUER.into(),
            jwt_audience: DEFAULT_AUDIENCE.into(),
            access_token_minutes: 15,
            refresh_token_days: 30,
            mail_relay_url: None,
            mail_relay_token: None,
            mail_from: "noreply@lectern.local".into(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn token_settings(&self) -> TokenSettings {
        let mut settings = TokenSettings::new(self.jwt_secret.as_bytes());
        settings.issuer = self.jwt_issuer.clone();
        settings.audience = self.jwt_audience.clone();
        settings.access_ttl = Duration::minutes(self.access_token_minutes);
        settings.refresh_ttl = Duration::days(self.refresh_token_days);
        settings
    }

    /// Relay mailer when `mail_relay_url` is set, otherwise a log-only mailer.
    pub fn mailer(&self) -> Result<Arc<dyn Mailer>, MailError> {
        Ok(match &self.mail_relay_url {
            Some(url) => Arc::new(HttpRelayMailer::new(
                url.clone(),
                self.mail_relay_token.clone(),
                self.mail_from.clone(),
            )?),
            None => Arc::new(LogMailer),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_settings_follow_config() {
        let mut config = ApiConfig::with_secret("s3cret");
        config.access_token_minutes = 5;
        config.jwt_issuer = "school".into();
        let settings = config.token_settings();
        assert_eq!(settings.secret, b"s3cret".to_vec());
        assert_eq!(settings.issuer, "school");
        assert_eq!(settings.access_ttl, Duration::minutes(5));
        assert_eq!(settings.refresh_ttl, Duration::days(30));
    }

    #[test]
    fn mailer_without_relay_is_log_only() {
        assert!(ApiConfig::with_secret("s").mailer().is_ok());
    }
}
