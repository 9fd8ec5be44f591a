use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string. Accounts are kept in memory when unset.
    pub url: Option<String>,
    pub max_connections: u32,
}

/// Raw token options as read from configuration. Turned into
/// [`crate::auth::TokenSettings`] at startup, which rejects weak key material.
#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    pub issuer: String,
    pub audience: String,
    pub secret: String,
    pub access_token_lifetime_secs: i64,
    pub refresh_token_lifetime_secs: i64,
    pub clock_skew_secs: i64,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct PasswordConfig {
    pub required_length: usize,
    pub require_digit: bool,
    pub require_lowercase: bool,
    pub require_uppercase: bool,
    pub require_non_alphanumeric: bool,
    pub required_unique_chars: usize,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            required_length: 6,
            require_digit: true,
            require_lowercase: true,
            require_uppercase: true,
            require_non_alphanumeric: false,
            required_unique_chars: 1,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub environment: String,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub password: PasswordConfig,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        Self::defaults()?
            // Add in settings from the config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add in settings from environment variables (with prefix "APP_")
            // E.g., `APP_JWT__SECRET=...` would set `Settings.jwt.secret`
            .add_source(
                Environment::with_prefix("app")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Builder pre-loaded with every default. The signing secret defaults to
    /// empty, which startup rejects.
    pub fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let password = PasswordConfig::default();

        Config::builder()
            .set_default("environment", "development")?
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.workers", num_cpus::get() as i64)?
            .set_default("database.max_connections", 5)?
            .set_default("jwt.issuer", "login-server")?
            .set_default("jwt.audience", "login-server")?
            .set_default("jwt.secret", "")?
            .set_default("jwt.access_token_lifetime_secs", 3600)?
            .set_default("jwt.refresh_token_lifetime_secs", 7 * 24 * 3600)?
            .set_default("jwt.clock_skew_secs", 0)?
            .set_default("password.required_length", password.required_length as i64)?
            .set_default("password.require_digit", password.require_digit)?
            .set_default("password.require_lowercase", password.require_lowercase)?
            .set_default("password.require_uppercase", password.require_uppercase)?
            .set_default("password.require_non_alphanumeric", password.require_non_alphanumeric)?
            .set_default("password.required_unique_chars", password.required_unique_chars as i64)
    }
}
