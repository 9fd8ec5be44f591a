//! Authentication for the login server.
//!
//! Token issuance and validation, the request pipeline guarding protected
//! routes, and the login/registration endpoints.

pub mod handlers;
pub mod issuer;
pub mod middleware;
pub mod service;
pub mod settings;
pub mod validation;
pub mod validator;

pub use issuer::{Claims, TokenIssuer};
pub use middleware::{
    require_authentication, AuthenticatedUser, BearerAuthentication, Interceptor,
    InterceptorChain, RequestContext,
};
pub use service::AuthService;
pub use settings::{TokenSettings, MIN_SECRET_BYTES};
pub use validator::{extract_bearer, TokenValidator};
