use std::collections::HashSet;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::config::PasswordConfig;
use crate::error::{AppError, IdentityError};

/// Strength rules applied when an account is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordPolicy {
    config: PasswordConfig,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self::new(PasswordConfig::default())
    }
}

impl PasswordPolicy {
    pub fn new(config: PasswordConfig) -> Self {
        Self { config }
    }

    /// Every rule the password breaks; empty when it is acceptable.
    pub fn check(&self, password: &str) -> Vec<IdentityError> {
        let cfg = &self.config;
        let mut errors = Vec::new();

        if password.chars().count() < cfg.required_length {
            errors.push(IdentityError::new(
                "PasswordTooShort",
                format!("Passwords must be at least {} characters.", cfg.required_length),
            ));
        }
        if cfg.require_non_alphanumeric && password.chars().all(|c| c.is_ascii_alphanumeric()) {
            errors.push(IdentityError::new(
                "PasswordRequiresNonAlphanumeric",
                "Passwords must have at least one non alphanumeric character.",
            ));
        }
        if cfg.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            errors.push(IdentityError::new(
                "PasswordRequiresDigit",
                "Passwords must have at least one digit ('0'-'9').",
            ));
        }
        if cfg.require_lowercase && !password.chars().any(|c| c.is_ascii_lowercase()) {
            errors.push(IdentityError::new(
                "PasswordRequiresLower",
                "Passwords must have at least one lowercase ('a'-'z').",
            ));
        }
        if cfg.require_uppercase && !password.chars().any(|c| c.is_ascii_uppercase()) {
            errors.push(IdentityError::new(
                "PasswordRequiresUpper",
                "Passwords must have at least one uppercase ('A'-'Z').",
            ));
        }
        if cfg.required_unique_chars >= 1
            && password.chars().collect::<HashSet<_>>().len() < cfg.required_unique_chars
        {
            errors.push(IdentityError::new(
                "PasswordRequiresUniqueChars",
                format!(
                    "Passwords must use at least {} different characters.",
                    cfg.required_unique_chars
                ),
            ));
        }

        errors
    }
}

/// Argon2 PHC string for `password` with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(password_hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e.into()),
    }
}
