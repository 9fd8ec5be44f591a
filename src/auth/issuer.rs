use std::sync::Arc;

use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::settings::TokenSettings;
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // User ID
    pub jti: String,  // Token ID
    pub email: String,
    pub iss: String,
    pub aud: String,
    pub iat: i64,     // Issued at
    pub nbf: i64,     // Not before
    pub exp: i64,     // Expiration time
}

/// Signs access tokens for users whose credentials were already checked.
pub struct TokenIssuer {
    settings: Arc<TokenSettings>,
    encoding_key: EncodingKey,
    header: Header,
}

impl TokenIssuer {
    pub fn new(settings: Arc<TokenSettings>) -> Self {
        let encoding_key = EncodingKey::from_secret(settings.secret());
        Self {
            settings,
            encoding_key,
            header: Header::new(Algorithm::HS256),
        }
    }

    pub fn issue(&self, user_id: &str, email: &str) -> Result<String, AppError> {
        self.issue_at(user_id, email, Utc::now())
    }

    pub fn issue_at(
        &self,
        user_id: &str,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let claims = self.claims_at(user_id, email, now);

        debug!(
            "Issuing token {} for user {}, expires at {}",
            claims.jti, claims.sub, claims.exp
        );

        encode(&self.header, &claims, &self.encoding_key)
            .map_err(|e| AppError::InternalError(format!("failed to sign token: {}", e)))
    }

    fn claims_at(&self, user_id: &str, email: &str, now: DateTime<Utc>) -> Claims {
        let iat = now.timestamp();
        Claims {
            sub: user_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            email: email.to_string(),
            iss: self.settings.issuer().to_string(),
            aud: self.settings.audience().to_string(),
            iat,
            nbf: iat,
            exp: iat + self.settings.access_token_lifetime().num_seconds(),
        }
    }
}
