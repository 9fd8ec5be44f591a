use std::fmt;

use chrono::Duration;

use crate::config::JwtConfig;
use crate::error::AppError;

/// HS256 keys shorter than the hash output (256 bits) weaken the MAC.
pub const MIN_SECRET_BYTES: usize = 32;

/// Upper bound for any configured duration, so `exp` always stays a valid
/// timestamp.
pub const MAX_DURATION_SECS: i64 = 100 * 365 * 24 * 60 * 60;

/// Validated token options, built once at startup and shared read-only by the
/// issuer and the validator.
#[derive(Clone)]
pub struct TokenSettings {
    issuer: String,
    audience: String,
    secret: Vec<u8>,
    access_token_lifetime: Duration,
    refresh_token_lifetime: Duration,
    clock_skew: Duration,
}

impl TokenSettings {
    pub fn new(
        issuer: impl Into<String>,
        audience: impl Into<String>,
        secret: impl AsRef<[u8]>,
        access_token_lifetime: Duration,
    ) -> Result<Self, AppError> {
        let issuer = issuer.into();
        let audience = audience.into();
        let secret = secret.as_ref();

        if issuer.trim().is_empty() {
            return Err(AppError::ConfigError("jwt.issuer must not be empty".into()));
        }
        if audience.trim().is_empty() {
            return Err(AppError::ConfigError("jwt.audience must not be empty".into()));
        }
        if secret.is_empty() {
            return Err(AppError::ConfigError("jwt.secret is not set".into()));
        }
        if secret.len() < MIN_SECRET_BYTES {
            return Err(AppError::ConfigError(format!(
                "jwt.secret is {} bytes; HS256 requires at least {}",
                secret.len(),
                MIN_SECRET_BYTES
            )));
        }
        if access_token_lifetime <= Duration::zero() {
            return Err(AppError::ConfigError(
                "jwt.access_token_lifetime_secs must be positive".into(),
            ));
        }
        if access_token_lifetime.num_seconds() > MAX_DURATION_SECS {
            return Err(AppError::ConfigError(format!(
                "jwt.access_token_lifetime_secs must be at most {}",
                MAX_DURATION_SECS
            )));
        }

        Ok(Self {
            issuer,
            audience,
            secret: secret.to_vec(),
            access_token_lifetime,
            refresh_token_lifetime: Duration::zero(),
            clock_skew: Duration::zero(),
        })
    }

    pub fn from_config(config: &JwtConfig) -> Result<Self, AppError> {
        if config.refresh_token_lifetime_secs < 0 {
            return Err(AppError::ConfigError(
                "jwt.refresh_token_lifetime_secs must not be negative".into(),
            ));
        }
        if config.clock_skew_secs < 0 {
            return Err(AppError::ConfigError(
                "jwt.clock_skew_secs must not be negative".into(),
            ));
        }

        Ok(Self::new(
            &config.issuer,
            &config.audience,
            &config.secret,
            bounded_seconds("jwt.access_token_lifetime_secs", config.access_token_lifetime_secs)?,
        )?
        .with_refresh_token_lifetime(bounded_seconds(
            "jwt.refresh_token_lifetime_secs",
            config.refresh_token_lifetime_secs,
        )?)
        .with_clock_skew(bounded_seconds("jwt.clock_skew_secs", config.clock_skew_secs)?))
    }

    pub fn with_refresh_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.refresh_token_lifetime = lifetime;
        self
    }

    pub fn with_clock_skew(mut self, skew: Duration) -> Self {
        self.clock_skew = skew;
        self
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    pub fn access_token_lifetime(&self) -> Duration {
        self.access_token_lifetime
    }

    /// Carried from configuration; nothing issues refresh tokens yet.
    pub fn refresh_token_lifetime(&self) -> Duration {
        self.refresh_token_lifetime
    }

    pub fn clock_skew(&self) -> Duration {
        self.clock_skew
    }
}

fn bounded_seconds(key: &str, secs: i64) -> Result<Duration, AppError> {
    if secs > MAX_DURATION_SECS {
        return Err(AppError::ConfigError(format!(
            "{} must be at most {}",
            key, MAX_DURATION_SECS
        )));
    }
    Duration::try_seconds(secs)
        .ok_or_else(|| AppError::ConfigError(format!("{} is out of range", key)))
}

impl fmt::Debug for TokenSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSettings")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("secret", &"<redacted>")
            .field("access_token_lifetime", &self.access_token_lifetime)
            .field("refresh_token_lifetime", &self.refresh_token_lifetime)
            .field("clock_skew", &self.clock_skew)
            .finish()
    }
}
