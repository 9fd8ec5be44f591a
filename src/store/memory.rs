use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::password::{hash_password, verify_password, PasswordPolicy};
use super::{duplicate_user_name, CreateUserError, CredentialStore, UserIdentity};
use crate::error::AppError;

/// Accounts kept in process memory, keyed by email. Used when no database is
/// configured and throughout the tests.
#[derive(Clone, Default)]
pub struct InMemoryCredentialStore {
    users: Arc<RwLock<HashMap<String, UserIdentity>>>,
    policy: PasswordPolicy,
}

impl InMemoryCredentialStore {
    pub fn new(policy: PasswordPolicy) -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
            policy,
        }
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserIdentity>, AppError> {
        Ok(self.users.read().await.get(email).cloned())
    }

    async fn check_password(&self, user: &UserIdentity, password: &str) -> Result<bool, AppError> {
        verify_password(password, &user.password_hash)
    }

    async fn create_user(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserIdentity, CreateUserError> {
        let reasons = self.policy.check(password);
        if !reasons.is_empty() {
            return Err(CreateUserError::Rejected(reasons));
        }

        let password_hash = hash_password(password)?;

        let mut users = self.users.write().await;
        if users.contains_key(email) {
            return Err(CreateUserError::Rejected(vec![duplicate_user_name(email)]));
        }

        let user = UserIdentity::new(email.to_string(), password_hash);
        users.insert(email.to_string(), user.clone());
        debug!("Created account {} for {}", user.id, email);

        Ok(user)
    }
}
