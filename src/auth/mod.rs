//! Credential handling.
//!
//! Passwords are stored as Argon2 PHC strings. Verification goes through
//! argon2's own comparison, which does not short-circuit on the first byte.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::errors::AppError;
use crate::models::normalize_email;

/// Minimum account name length.
pub const MIN_NAME_LENGTH: usize = 3;
/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Hash a plaintext password into a PHC string.
pub fn hash_password(plain_text: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain_text.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Password hash failed: {}", e)))?;
    Ok(hash.to_string())
}

/// Check a plaintext password against a stored PHC string.
///
/// A malformed stored hash never verifies.
pub fn verify_password(plain_text: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(plain_text.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!("Stored password hash is malformed: {}", e);
            false
        }
    }
}

/// Validated account fields, ready to be hashed and stored.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountFields {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Validate name, email and password shape for a new account.
pub fn validate_account(
    name: &str,
    email: &str,
    password: &str,
) -> Result<AccountFields, AppError> {
    let name = name.trim();
    let email = normalize_email(email);

    if name.chars().count() < MIN_NAME_LENGTH {
        return Err(AppError::Validation(format!(
            "Name must have at least {} characters",
            MIN_NAME_LENGTH
        )));
    }
    if !email.contains('@') {
        return Err(AppError::Validation("Invalid email".to_string()));
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::Validation(format!(
            "Password must have at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }

    Ok(AccountFields {
        name: name.to_string(),
        email,
        password: password.to_string(),
    })
}
