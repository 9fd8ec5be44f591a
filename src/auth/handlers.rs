use actix_web::{web, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::middleware::AuthenticatedUser;
use crate::error::AppError;
use crate::AppState;

// Absent and `null` fields both reach validation as empty and are reported
// as required.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl LoginRequest {
    fn credentials(&self) -> (&str, &str) {
        (
            self.email.as_deref().unwrap_or_default(),
            self.password.as_deref().unwrap_or_default(),
        )
    }
}

impl RegisterRequest {
    fn credentials(&self) -> (&str, &str) {
        (
            self.email.as_deref().unwrap_or_default(),
            self.password.as_deref().unwrap_or_default(),
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
}

pub async fn login(
    req: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let (email, password) = req.credentials();
    info!("Received login request for email: {}", email);
    match state.auth_service.login(email, password).await {
        Ok(token) => Ok(HttpResponse::Ok().json(AuthResponse { token })),
        Err(e) => {
            if e.status_code().is_server_error() {
                error!("Login failed for email: {}: {}", email, e);
            }
            Err(e)
        }
    }
}

pub async fn register(
    req: web::Json<RegisterRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let (email, password) = req.credentials();
    info!("Received registration request for email: {}", email);
    match state.auth_service.register(email, password).await {
        Ok(token) => Ok(HttpResponse::Ok().json(AuthResponse { token })),
        Err(e) => {
            if e.status_code().is_server_error() {
                error!("Registration failed for email: {}: {}", email, e);
            }
            Err(e)
        }
    }
}

/// Identity carried by the caller's access token.
pub async fn me(user: AuthenticatedUser) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "sub": user.user_id,
        "email": user.email,
        "jti": user.token_id,
        "expires_at": user.expires_at.to_rfc3339(),
    }))
}
