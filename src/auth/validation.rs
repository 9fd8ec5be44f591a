use crate::error::{AppError, ValidationErrors};

pub const EMAIL_REQUIRED: &str = "El correo electrónico es obligatorio.";
pub const EMAIL_INVALID: &str = "Correo electrónico no válido.";
pub const PASSWORD_REQUIRED: &str = "La contraseña es obligatoria.";
pub const PASSWORD_TOO_SHORT: &str = "La contraseña debe tener al menos 6 caracteres.";

pub const MIN_PASSWORD_LENGTH: usize = 6;

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Exactly one `@`, neither first nor last, and no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

fn check_email(email: &str, errors: &mut ValidationErrors) {
    if email.trim().is_empty() {
        errors.add("email", EMAIL_REQUIRED);
    } else if !is_valid_email(email) {
        errors.add("email", EMAIL_INVALID);
    }
}

pub fn validate_login(email: &str, password: &str) -> Result<(), AppError> {
    let mut errors = ValidationErrors::new();
    check_email(email, &mut errors);
    if password.trim().is_empty() {
        errors.add("password", PASSWORD_REQUIRED);
    }
    errors.into_result()
}

pub fn validate_registration(email: &str, password: &str) -> Result<(), AppError> {
    let mut errors = ValidationErrors::new();
    check_email(email, &mut errors);
    if password.trim().is_empty() {
        errors.add("password", PASSWORD_REQUIRED);
    } else if password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.add("password", PASSWORD_TOO_SHORT);
    }
    errors.into_result()
}
