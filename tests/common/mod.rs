#![allow(dead_code)]

use std::sync::Arc;

use login_server::auth::{TokenIssuer, TokenSettings, TokenValidator};
use login_server::config::{DatabaseConfig, JwtConfig, PasswordConfig, ServerConfig};
use login_server::store::InMemoryCredentialStore;
use login_server::{AppState, Settings};

pub const SECRET: &str = "integration-test-secret-0123456789";

pub fn settings() -> Settings {
    Settings {
        environment: "test".into(),
        server: ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            workers: 1,
        },
        database: DatabaseConfig {
            url: None,
            max_connections: 1,
        },
        jwt: JwtConfig {
            issuer: "login-server".into(),
            audience: "login-clients".into(),
            secret: SECRET.into(),
            access_token_lifetime_secs: 3600,
            refresh_token_lifetime_secs: 7 * 24 * 3600,
            clock_skew_secs: 0,
        },
        password: PasswordConfig::default(),
    }
}

pub fn state() -> AppState {
    AppState::with_store(settings(), Arc::new(InMemoryCredentialStore::default()))
        .expect("Failed to build test state")
}

pub fn token_settings() -> Arc<TokenSettings> {
    Arc::new(TokenSettings::from_config(&settings().jwt).expect("Failed to build token settings"))
}

pub fn issuer() -> TokenIssuer {
    TokenIssuer::new(token_settings())
}

pub fn validator() -> TokenValidator {
    TokenValidator::new(token_settings())
}
