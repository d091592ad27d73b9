//! Application Configuration
//!
//! Configuration for the Auth application layer.

use std::path::Path;

use chrono::Duration;
use kernel::error::{
    app_error::{AppError, AppResult, ResultExt},
    kind::ErrorKind,
};
use platform::{password::{HashingParams, PasswordPolicy}, rate_limit::RateLimitConfig};

/// Auth application configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Access token lifetime (15 minutes)
    pub access_token_ttl: Duration,
    /// Refresh token lifetime without "Remember Me" (7 days)
    pub refresh_token_ttl: Duration,
    /// Refresh token lifetime with "Remember Me" (30 days)
    pub remember_me_refresh_ttl: Duration,
    /// `iss` claim written and required
    pub jwt_issuer: String,
    /// `aud` claim written and required
    pub jwt_audience: String,
    /// RSA private key, PKCS#1 or PKCS#8 PEM
    pub jwt_private_key_pem: String,
    /// RSA public key, PKCS#1 or SPKI PEM
    pub jwt_public_key_pem: String,
    /// Failed-login throttle (5 per 15 minutes)
    pub login_throttle: RateLimitConfig,
    /// Extra attempts after a serialization failure or deadlock
    pub max_transaction_retries: u32,
    /// Operations per unit of work in batch execution
    pub batch_size: usize,
    /// Largest page served by session listings
    pub session_page_limit: u32,
    pub password_policy: PasswordPolicy,
    pub password_hashing: HashingParams,
    /// Password pepper (optional, application-wide secret)
    pub password_pepper: Option<Vec<u8>>,
    /// How long login attempts are kept before the maintenance purge
    pub attempt_retention: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_token_ttl: Duration::minutes(15),
            refresh_token_ttl: Duration::days(7),
            remember_me_refresh_ttl: Duration::days(30),
            jwt_issuer: "auth-service".to_string(),
            jwt_audience: "auth-clients".to_string(),
            jwt_private_key_pem: String::new(),
            jwt_public_key_pem: String::new(),
            login_throttle: RateLimitConfig::default(),
            max_transaction_retries: 3,
            batch_size: 100,
            session_page_limit: 100,
            password_policy: PasswordPolicy::default(),
            password_hashing: HashingParams::default(),
            password_pepper: None,
            attempt_retention: Duration::days(30),
        }
    }
}

impl AuthConfig {
    /// Defaults plus the given key pair
    pub fn with_keys(private_pem: impl Into<String>, public_pem: impl Into<String>) -> Self {
        Self {
            jwt_private_key_pem: private_pem.into(),
            jwt_public_key_pem: public_pem.into(),
            ..Default::default()
        }
    }

    /// Cheap hashing for local runs and tests
    pub fn development(private_pem: impl Into<String>, public_pem: impl Into<String>) -> Self {
        Self {
            password_hashing: HashingParams {
                memory_kib: 1024,
                iterations: 1,
                parallelism: 1,
            },
            ..Self::with_keys(private_pem, public_pem)
        }
    }

    /// Build from environment variables
    ///
    /// `JWT_PRIVATE_KEY_PATH` and `JWT_PUBLIC_KEY_PATH` are required; every
    /// other setting falls back to its default.
    pub fn from_env() -> AppResult<Self> {
        let defaults = Self::default();

        let private_path = required_var("JWT_PRIVATE_KEY_PATH")?;
        let public_path = required_var("JWT_PUBLIC_KEY_PATH")?;

        let login_throttle = RateLimitConfig::new(
            parsed_var("LOGIN_MAX_FAILURES", defaults.login_throttle.max_requests)?,
            parsed_var("LOGIN_WINDOW_SECS", defaults.login_throttle.window.as_secs())?,
        );

        Ok(Self {
            access_token_ttl: seconds_var("ACCESS_TOKEN_TTL_SECS", defaults.access_token_ttl)?,
            refresh_token_ttl: seconds_var("REFRESH_TOKEN_TTL_SECS", defaults.refresh_token_ttl)?,
            remember_me_refresh_ttl: seconds_var(
                "REMEMBER_ME_REFRESH_TTL_SECS",
                defaults.remember_me_refresh_ttl,
            )?,
            jwt_issuer: std::env::var("JWT_ISSUER").unwrap_or(defaults.jwt_issuer),
            jwt_audience: std::env::var("JWT_AUDIENCE").unwrap_or(defaults.jwt_audience),
            jwt_private_key_pem: read_pem(&private_path)?,
            jwt_public_key_pem: read_pem(&public_path)?,
            login_throttle,
            max_transaction_retries: parsed_var(
                "MAX_TRANSACTION_RETRIES",
                defaults.max_transaction_retries,
            )?,
            batch_size: parsed_var("BATCH_SIZE", defaults.batch_size)?,
            session_page_limit: parsed_var("SESSION_PAGE_LIMIT", defaults.session_page_limit)?,
            password_policy: defaults.password_policy,
            password_hashing: defaults.password_hashing,
            password_pepper: std::env::var("PASSWORD_PEPPER")
                .ok()
                .filter(|p| !p.is_empty())
                .map(String::into_bytes),
            attempt_retention: seconds_var(
                "LOGIN_ATTEMPT_RETENTION_SECS",
                defaults.attempt_retention,
            )?,
        })
    }

    /// Refresh lifetime for a login
    pub fn refresh_ttl(&self, remember_me: bool) -> Duration {
        if remember_me {
            self.remember_me_refresh_ttl
        } else {
            self.refresh_token_ttl
        }
    }

    /// Get password pepper as slice
    pub fn pepper(&self) -> Option<&[u8]> {
        self.password_pepper.as_deref()
    }
}

fn required_var(name: &'static str) -> AppResult<String> {
    std::env::var(name).map_app_err(
        ErrorKind::InternalServerError,
        format!("Environment variable {name} is not set"),
    )
}

fn parsed_var<T>(name: &'static str, default: T) -> AppResult<T>
where
    T: std::str::FromStr<Err = std::num::ParseIntError>,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::from(e).with_code("INVALID_CONFIGURATION")),
        Err(_) => Ok(default),
    }
}

fn seconds_var(name: &'static str, default: Duration) -> AppResult<Duration> {
    let secs = parsed_var(name, default.num_seconds())?;
    Ok(Duration::seconds(secs))
}

fn read_pem(path: &str) -> AppResult<String> {
    std::fs::read_to_string(Path::new(path))
        .map_err(|e| AppError::from(e).with_code("INVALID_KEY_CONFIGURATION"))
}
