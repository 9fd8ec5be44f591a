//! Credential storage for user accounts.
//!
//! The auth service only talks to [`CredentialStore`]; which backend sits
//! behind it is decided once at startup.

pub mod memory;
pub mod models;
pub mod password;
pub mod postgres;

use async_trait::async_trait;

use crate::error::{AppError, IdentityError};

pub use memory::InMemoryCredentialStore;
pub use models::UserIdentity;
pub use password::PasswordPolicy;
pub use postgres::PgCredentialStore;

/// Outcome of an account creation the store refused.
#[derive(Debug)]
pub enum CreateUserError {
    /// The store rejected the account; reasons are meant for the client.
    Rejected(Vec<IdentityError>),
    /// The store itself failed.
    Failed(AppError),
}

impl From<AppError> for CreateUserError {
    fn from(err: AppError) -> Self {
        CreateUserError::Failed(err)
    }
}

impl From<CreateUserError> for AppError {
    fn from(err: CreateUserError) -> Self {
        match err {
            CreateUserError::Rejected(reasons) => AppError::RegistrationFailed(reasons),
            CreateUserError::Failed(e) => e,
        }
    }
}

/// Lookup, verification and creation of accounts. Emails passed in are
/// already normalized to lowercase.
///
/// `create_user` checks the password policy before the email; a weak password
/// is rejected with the policy reasons alone.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserIdentity>, AppError>;

    async fn check_password(&self, user: &UserIdentity, password: &str) -> Result<bool, AppError>;

    async fn create_user(&self, email: &str, password: &str)
        -> Result<UserIdentity, CreateUserError>;
}

/// Reason reported when the email already belongs to an account.
pub fn duplicate_user_name(email: &str) -> IdentityError {
    IdentityError::new(
        "DuplicateUserName",
        format!("Username '{}' is already taken.", email),
    )
}
