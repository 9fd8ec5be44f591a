use std::sync::Arc;

use actix_web::http::header::{HeaderMap, AUTHORIZATION};
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use tracing::debug;

use super::issuer::Claims;
use super::settings::TokenSettings;
use crate::error::{AppError, AuthError};

/// Verifies access tokens. A pure function of the token, the supplied clock
/// and the settings; nothing is looked up.
pub struct TokenValidator {
    settings: Arc<TokenSettings>,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenValidator {
    pub fn new(settings: Arc<TokenSettings>) -> Self {
        let decoding_key = DecodingKey::from_secret(settings.secret());

        // Time-based claims are checked against the caller's clock below.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;
        validation.set_issuer(&[settings.issuer()]);
        validation.set_audience(&[settings.audience()]);
        validation.set_required_spec_claims(&["sub", "iss", "aud", "exp"]);

        Self {
            settings,
            decoding_key,
            validation,
        }
    }

    pub fn validate(&self, token: &str) -> Result<Claims, AppError> {
        self.validate_at(token, Utc::now())
    }

    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, AppError> {
        if !is_token_shaped(token) {
            return Err(AuthError::Unauthenticated.into());
        }

        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                debug!("Token rejected: {}", e);
                AuthError::InvalidToken
            })?
            .claims;

        if claims.sub.is_empty() {
            return Err(AuthError::InvalidToken.into());
        }

        let now = now.timestamp();
        let skew = self.settings.clock_skew().num_seconds();

        if claims.nbf > now.saturating_add(skew) {
            debug!("Token {} used before its nbf", claims.jti);
            return Err(AuthError::InvalidToken.into());
        }
        if now >= claims.exp.saturating_add(skew) {
            debug!("Token {} expired at {}", claims.jti, claims.exp);
            return Err(AuthError::TokenExpired.into());
        }

        Ok(claims)
    }
}

/// The token carried by an `Authorization: Bearer <token>` header.
pub fn extract_bearer(headers: &HeaderMap) -> Result<&str, AppError> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AuthError::Unauthenticated)?;

    let (scheme, token) = value
        .trim()
        .split_once(' ')
        .ok_or(AuthError::Unauthenticated)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::Unauthenticated.into());
    }

    let token = token.trim();
    if !is_token_shaped(token) {
        return Err(AuthError::Unauthenticated.into());
    }

    Ok(token)
}

/// Three non-empty base64url segments separated by dots.
fn is_token_shaped(token: &str) -> bool {
    let segments: Vec<&str> = token.split('.').collect();
    segments.len() == 3
        && segments.iter().all(|s| {
            !s.is_empty()
                && s
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        })
}
