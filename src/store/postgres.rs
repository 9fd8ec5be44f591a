use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, info};

use super::password::{hash_password, verify_password, PasswordPolicy};
use super::{duplicate_user_name, CreateUserError, CredentialStore, UserIdentity};
use crate::error::AppError;

const CREATE_USERS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL
    )
"#;

/// Accounts stored in PostgreSQL. Email uniqueness is enforced by the table's
/// unique constraint, so concurrent registrations cannot both succeed.
pub struct PgCredentialStore {
    pool: PgPool,
    policy: PasswordPolicy,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool, policy: PasswordPolicy) -> Self {
        Self { pool, policy }
    }

    pub async fn connect(
        url: &str,
        max_connections: u32,
        policy: PasswordPolicy,
    ) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(url)
            .await?;

        sqlx::query(CREATE_USERS_TABLE).execute(&pool).await?;
        info!("Connected to credential database");

        Ok(Self::new(pool, policy))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserIdentity>, AppError> {
        let user = sqlx::query_as::<_, UserIdentity>(
            "SELECT id, email, password_hash, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
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

        let candidate = UserIdentity::new(email.to_string(), hash_password(password)?);
        let inserted = sqlx::query_as::<_, UserIdentity>(
            r#"
            INSERT INTO users (id, email, password_hash, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO NOTHING
            RETURNING id, email, password_hash, created_at
            "#,
        )
        .bind(candidate.id)
        .bind(&candidate.email)
        .bind(&candidate.password_hash)
        .bind(candidate.created_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;

        match inserted {
            Some(user) => {
                debug!("Created account {} for {}", user.id, email);
                Ok(user)
            }
            None => Err(CreateUserError::Rejected(vec![duplicate_user_name(email)])),
        }
    }
}
