pub mod auth;
pub mod config;
pub mod error;
pub mod store;

use std::sync::Arc;

use actix_web::{middleware, web, HttpResponse};
use tracing::info;

pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;
pub use config::Settings;

use auth::{AuthService, BearerAuthentication, InterceptorChain, TokenIssuer, TokenSettings, TokenValidator};
use error::ValidationErrors;
use store::{CredentialStore, InMemoryCredentialStore, PasswordPolicy, PgCredentialStore};

/// Health check endpoint handler
/// Returns a JSON response with server status and timestamp
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Application state shared across all workers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub auth_service: Arc<AuthService>,
    pub pipeline: Arc<InterceptorChain>,
}

impl AppState {
    /// Builds the state from configuration, connecting to PostgreSQL when a
    /// database URL is set. Fails on unusable token settings.
    pub async fn new(config: Settings) -> Result<Self> {
        // Checked before any connection is attempted.
        let token_settings = TokenSettings::from_config(&config.jwt)?;
        let policy = PasswordPolicy::new(config.password.clone());

        let store: Arc<dyn CredentialStore> = match &config.database.url {
            Some(url) => Arc::new(
                PgCredentialStore::connect(url, config.database.max_connections, policy).await?,
            ),
            None => {
                info!("No database configured, accounts are kept in memory");
                Arc::new(InMemoryCredentialStore::new(policy))
            }
        };

        Ok(Self::assemble(config, token_settings, store))
    }

    /// Builds the state over an existing credential store.
    pub fn with_store(config: Settings, store: Arc<dyn CredentialStore>) -> Result<Self> {
        let token_settings = TokenSettings::from_config(&config.jwt)?;
        Ok(Self::assemble(config, token_settings, store))
    }

    fn assemble(
        config: Settings,
        token_settings: TokenSettings,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        let token_settings = Arc::new(token_settings);
        let issuer = Arc::new(TokenIssuer::new(token_settings.clone()));
        let validator = Arc::new(TokenValidator::new(token_settings));
        let pipeline = InterceptorChain::new().with(BearerAuthentication::new(validator));

        Self {
            config: Arc::new(config),
            auth_service: Arc::new(AuthService::new(store, issuer)),
            pipeline: Arc::new(pipeline),
        }
    }
}

/// Registers every route. Health, login and registration are open; `/api/auth/me`
/// is wrapped in the authentication pipeline.
pub fn configure(cfg: &mut web::ServiceConfig) {
    let json_config = web::JsonConfig::default().error_handler(|err, _req| {
        let mut errors = ValidationErrors::new();
        errors.add("body", err.to_string());
        AppError::ValidationError(errors).into()
    });

    cfg.app_data(json_config)
        .route("/health", web::get().to(health_check))
        .service(
            web::scope("/api/auth")
                .route("/login", web::post().to(auth::handlers::login))
                .route("/register", web::post().to(auth::handlers::register))
                .service(
                    web::resource("/me")
                        .route(web::get().to(auth::handlers::me))
                        .wrap(middleware::from_fn(auth::require_authentication)),
                ),
        );
}
