use std::sync::Arc;

use tracing::{info, warn};

use super::issuer::TokenIssuer;
use super::validation::{normalize_email, validate_login, validate_registration};
use crate::error::{AppError, AuthError};
use crate::store::CredentialStore;

/// Login and registration on top of a credential store. Both return a freshly
/// issued access token on success.
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    issuer: Arc<TokenIssuer>,
}

impl AuthService {
    pub fn new(store: Arc<dyn CredentialStore>, issuer: Arc<TokenIssuer>) -> Self {
        Self { store, issuer }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<String, AppError> {
        validate_login(email, password)?;
        let email = normalize_email(email);

        // Unknown email and wrong password must be indistinguishable.
        let user = match self.store.find_by_email(&email).await? {
            Some(user) => user,
            None => {
                warn!("Login rejected for {}: no such account", email);
                return Err(AuthError::InvalidCredentials.into());
            }
        };

        if !self.store.check_password(&user, password).await? {
            warn!("Login rejected for {}: wrong password", email);
            return Err(AuthError::InvalidCredentials.into());
        }

        let token = self.issuer.issue(&user.id.to_string(), &user.email)?;
        info!("User {} logged in", user.id);
        Ok(token)
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<String, AppError> {
        validate_registration(email, password)?;
        let email = normalize_email(email);

        let user = self.store.create_user(&email, password).await.map_err(|e| {
            let err = AppError::from(e);
            warn!("Registration rejected for {}: {}", email, err);
            err
        })?;

        let token = self.issuer.issue(&user.id.to_string(), &user.email)?;
        info!("Registered user {} ({})", user.id, user.email);
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{TokenSettings, TokenValidator};
    use crate::error::IdentityError;
    use crate::store::password::hash_password;
    use crate::store::{CreateUserError, InMemoryCredentialStore, MockCredentialStore, UserIdentity};
    use chrono::Duration;
    use mockall::predicate::eq;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn token_settings() -> Arc<TokenSettings> {
        Arc::new(TokenSettings::new("login-server", "login-clients", SECRET, Duration::hours(1)).unwrap())
    }

    fn service(store: impl CredentialStore + 'static) -> (AuthService, TokenValidator) {
        let settings = token_settings();
        let service = AuthService::new(Arc::new(store), Arc::new(TokenIssuer::new(settings.clone())));
        (service, TokenValidator::new(settings))
    }

    fn user(email: &str) -> UserIdentity {
        UserIdentity::new(email.to_string(), "$argon2id$stub".to_string())
    }

    #[tokio::test]
    async fn test_login_issues_token_for_user() {
        let account = user("a@b.com");
        let expected_sub = account.id.to_string();

        let mut store = MockCredentialStore::new();
        store
            .expect_find_by_email()
            .with(eq("a@b.com"))
            .times(1)
            .returning(move |_| Ok(Some(account.clone())));
        store
            .expect_check_password()
            .times(1)
            .returning(|_, password| Ok(password == "Abcdef1"));

        let (service, validator) = service(store);
        let token = service.login("A@B.com", "Abcdef1").await.unwrap();

        let claims = validator.validate(&token).unwrap();
        assert_eq!(claims.sub, expected_sub);
        assert_eq!(claims.email, "a@b.com");
    }

    #[tokio::test]
    async fn test_unknown_email_and_wrong_password_look_the_same() {
        let mut store = MockCredentialStore::new();
        store
            .expect_find_by_email()
            .with(eq("nobody@b.com"))
            .returning(|_| Ok(None));
        store
            .expect_find_by_email()
            .with(eq("a@b.com"))
            .returning(|_| Ok(Some(user("a@b.com"))));
        store.expect_check_password().returning(|_, _| Ok(false));

        let (service, _) = service(store);
        let unknown = service.login("nobody@b.com", "Abcdef1").await.unwrap_err();
        let wrong = service.login("a@b.com", "Wrong99").await.unwrap_err();

        assert!(matches!(unknown, AppError::AuthError(AuthError::InvalidCredentials)));
        assert!(matches!(wrong, AppError::AuthError(AuthError::InvalidCredentials)));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn test_login_validates_before_touching_store() {
        let mut store = MockCredentialStore::new();
        store.expect_find_by_email().times(0);

        let (service, _) = service(store);
        let err = service.login("not-an-email", "").await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let mut store = MockCredentialStore::new();
        store
            .expect_find_by_email()
            .returning(|_| Err(AppError::InternalError("connection reset".into())));

        let (service, _) = service(store);
        let err = service.login("a@b.com", "Abcdef1").await.unwrap_err();
        assert!(matches!(err, AppError::InternalError(_)));
    }

    #[tokio::test]
    async fn test_register_normalizes_email() {
        let mut store = MockCredentialStore::new();
        store
            .expect_create_user()
            .with(eq("a@b.com"), eq("Abcdef1"))
            .times(1)
            .returning(|email, _| Ok(user(email)));

        let (service, validator) = service(store);
        let token = service.register("A@B.com", "Abcdef1").await.unwrap();
        assert_eq!(validator.validate(&token).unwrap().email, "a@b.com");
    }

    #[tokio::test]
    async fn test_register_passes_store_reasons_through() {
        let mut store = MockCredentialStore::new();
        store.expect_create_user().returning(|_, _| {
            Err(CreateUserError::Rejected(vec![IdentityError::new(
                "PasswordRequiresDigit",
                "Passwords must have at least one digit ('0'-'9').",
            )]))
        });

        let (service, _) = service(store);
        match service.register("a@b.com", "Abcdefg").await {
            Err(AppError::RegistrationFailed(reasons)) => {
                assert_eq!(reasons.len(), 1);
                assert_eq!(reasons[0].code, "PasswordRequiresDigit");
            }
            other => panic!("Expected RegistrationFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_register_rejects_short_password_before_store() {
        let mut store = MockCredentialStore::new();
        store.expect_create_user().times(0);

        let (service, _) = service(store);
        let err = service.register("a@b.com", "Ab1").await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_register_then_login_with_memory_store() {
        let store = InMemoryCredentialStore::default();
        let (service, validator) = service(store.clone());

        let registered = service.register("A@B.com", "Abcdef1").await.unwrap();
        let created = store.find_by_email("a@b.com").await.unwrap().unwrap();
        assert_eq!(validator.validate(&registered).unwrap().sub, created.id.to_string());

        let logged_in = service.login("a@b.com", "Abcdef1").await.unwrap();
        assert_eq!(validator.validate(&logged_in).unwrap().sub, created.id.to_string());

        let duplicate = service.register("a@b.com", "Abcdef1").await.unwrap_err();
        assert!(matches!(duplicate, AppError::RegistrationFailed(_)));
    }

    #[tokio::test]
    async fn test_login_verifies_stored_hash() {
        let mut account = user("a@b.com");
        account.password_hash = hash_password("Abcdef1").unwrap();

        let mut store = MockCredentialStore::new();
        store
            .expect_find_by_email()
            .returning(move |_| Ok(Some(account.clone())));
        store
            .expect_check_password()
            .returning(|user, password| {
                crate::store::password::verify_password(password, &user.password_hash)
            });

        let (service, _) = service(store);
        assert!(service.login("a@b.com", "Abcdef1").await.is_ok());
        assert!(service.login("a@b.com", "abcdef1").await.is_err());
    }
}
