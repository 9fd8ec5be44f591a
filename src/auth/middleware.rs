//! Request pipeline run in front of protected endpoints.
//!
//! Interceptors run in order against a [`RequestContext`]. The first one to
//! fail short-circuits the request with its error response and the handler
//! never runs. On success, the identity established by the chain is placed in
//! the request extensions, where [`AuthenticatedUser`] extracts it.

use std::future::{ready, Ready};
use std::sync::Arc;

use actix_web::body::{EitherBody, MessageBody};
use actix_web::dev::{Payload, ServiceRequest, ServiceResponse};
use actix_web::http::header::HeaderMap;
use actix_web::middleware::Next;
use actix_web::{web, Error, FromRequest, HttpMessage, HttpRequest};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use super::issuer::Claims;
use super::validator::{extract_bearer, TokenValidator};
use crate::error::{AppError, AuthError};
use crate::AppState;

/// Identity attached to a request that presented a valid access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub email: String,
    pub token_id: String,
    pub expires_at: DateTime<Utc>,
}

impl TryFrom<Claims> for AuthenticatedUser {
    type Error = AppError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let expires_at =
            DateTime::from_timestamp(claims.exp, 0).ok_or(AuthError::InvalidToken)?;
        Ok(Self {
            user_id: claims.sub,
            email: claims.email,
            token_id: claims.jti,
            expires_at,
        })
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthenticatedUser>()
                .cloned()
                .ok_or(AppError::AuthError(AuthError::Unauthenticated)),
        )
    }
}

/// What an interceptor sees of the inbound request.
pub struct RequestContext<'a> {
    headers: &'a HeaderMap,
    now: DateTime<Utc>,
    user: Option<AuthenticatedUser>,
}

impl<'a> RequestContext<'a> {
    pub fn new(headers: &'a HeaderMap, now: DateTime<Utc>) -> Self {
        Self {
            headers,
            now,
            user: None,
        }
    }

    pub fn headers(&self) -> &'a HeaderMap {
        self.headers
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn user(&self) -> Option<&AuthenticatedUser> {
        self.user.as_ref()
    }

    pub fn set_user(&mut self, user: AuthenticatedUser) {
        self.user = Some(user);
    }

    pub fn into_user(self) -> Option<AuthenticatedUser> {
        self.user
    }
}

pub trait Interceptor: Send + Sync {
    /// Pass by returning `Ok`, optionally enriching the context; reject the
    /// request by returning the error to respond with.
    fn intercept(&self, ctx: &mut RequestContext<'_>) -> Result<(), AppError>;
}

#[derive(Default, Clone)]
pub struct InterceptorChain {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    pub fn run(&self, ctx: &mut RequestContext<'_>) -> Result<(), AppError> {
        for interceptor in &self.interceptors {
            interceptor.intercept(ctx)?;
        }
        Ok(())
    }
}

/// Requires a valid bearer token and establishes the caller's identity.
pub struct BearerAuthentication {
    validator: Arc<TokenValidator>,
}

impl BearerAuthentication {
    pub fn new(validator: Arc<TokenValidator>) -> Self {
        Self { validator }
    }
}

impl Interceptor for BearerAuthentication {
    fn intercept(&self, ctx: &mut RequestContext<'_>) -> Result<(), AppError> {
        let token = extract_bearer(ctx.headers())?;
        let claims = self.validator.validate_at(token, ctx.now())?;
        let user = AuthenticatedUser::try_from(claims)?;
        debug!("Authenticated user {} with token {}", user.user_id, user.token_id);
        ctx.set_user(user);
        Ok(())
    }
}

/// actix-web middleware running the application's interceptor chain. Wrap
/// protected resources with `middleware::from_fn(require_authentication)`.
pub async fn require_authentication<B: MessageBody + 'static>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, Error> {
    let state = match req.app_data::<web::Data<AppState>>() {
        Some(state) => state.clone(),
        None => {
            let err = AppError::InternalError("application state is not configured".into());
            return Ok(req.error_response(err).map_into_right_body());
        }
    };

    let outcome = {
        let mut ctx = RequestContext::new(req.headers(), Utc::now());
        state.pipeline.run(&mut ctx).map(|_| ctx.into_user())
    };

    match outcome {
        Ok(user) => {
            if let Some(user) = user {
                req.extensions_mut().insert(user);
            }
            let res = next.call(req).await?;
            Ok(res.map_into_left_body())
        }
        Err(e) => {
            warn!("Rejected {} {}: {}", req.method(), req.path(), e);
            Ok(req.error_response(e).map_into_right_body())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{TokenIssuer, TokenSettings};
    use actix_web::http::header::{HeaderValue, AUTHORIZATION};
    use chrono::Duration;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn settings() -> Arc<TokenSettings> {
        Arc::new(TokenSettings::new("login-server", "login-clients", SECRET, Duration::hours(1)).unwrap())
    }

    struct Counting(Arc<AtomicUsize>);

    impl Interceptor for Counting {
        fn intercept(&self, _ctx: &mut RequestContext<'_>) -> Result<(), AppError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Reject;

    impl Interceptor for Reject {
        fn intercept(&self, _ctx: &mut RequestContext<'_>) -> Result<(), AppError> {
            Err(AuthError::Unauthenticated.into())
        }
    }

    #[test]
    fn test_chain_short_circuits_on_first_error() {
        let before = Arc::new(AtomicUsize::new(0));
        let after = Arc::new(AtomicUsize::new(0));
        let chain = InterceptorChain::new()
            .with(Counting(before.clone()))
            .with(Reject)
            .with(Counting(after.clone()));
        assert_eq!(chain.len(), 3);

        let headers = HeaderMap::new();
        let mut ctx = RequestContext::new(&headers, Utc::now());
        assert!(chain.run(&mut ctx).is_err());
        assert_eq!(before.load(Ordering::SeqCst), 1);
        assert_eq!(after.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_empty_chain_passes() {
        let chain = InterceptorChain::new();
        assert!(chain.is_empty());

        let headers = HeaderMap::new();
        let mut ctx = RequestContext::new(&headers, Utc::now());
        assert!(chain.run(&mut ctx).is_ok());
        assert!(ctx.into_user().is_none());
    }

    #[test]
    fn test_bearer_authentication_sets_user() {
        let settings = settings();
        let token = TokenIssuer::new(settings.clone()).issue("u1", "a@b.com").unwrap();
        let chain = InterceptorChain::new()
            .with(BearerAuthentication::new(Arc::new(TokenValidator::new(settings))));

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        let mut ctx = RequestContext::new(&headers, Utc::now());
        chain.run(&mut ctx).unwrap();

        let user = ctx.user().unwrap();
        assert_eq!(user.user_id, "u1");
        assert_eq!(user.email, "a@b.com");
    }

    #[test]
    fn test_bearer_authentication_uses_context_clock() {
        let settings = settings();
        let issued = Utc::now();
        let token = TokenIssuer::new(settings.clone())
            .issue_at("u1", "a@b.com", issued)
            .unwrap();
        let chain = InterceptorChain::new()
            .with(BearerAuthentication::new(Arc::new(TokenValidator::new(settings))));

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        let mut ctx = RequestContext::new(&headers, issued + Duration::hours(2));
        match chain.run(&mut ctx) {
            Err(AppError::AuthError(AuthError::TokenExpired)) => {}
            other => panic!("Expected TokenExpired, got {:?}", other),
        }
        assert!(ctx.user().is_none());
    }

    #[test]
    fn test_bearer_authentication_requires_header() {
        let settings = settings();
        let auth = BearerAuthentication::new(Arc::new(TokenValidator::new(settings)));

        let headers = HeaderMap::new();
        let mut ctx = RequestContext::new(&headers, Utc::now());
        match auth.intercept(&mut ctx) {
            Err(AppError::AuthError(AuthError::Unauthenticated)) => {}
            other => panic!("Expected Unauthenticated, got {:?}", other),
        }
    }
}
