use std::sync::OnceLock;

use bcrypt::{hash, verify, DEFAULT_COST};
use tracing::error;

use crate::models::UserError;

pub const MIN_PASSWORD_LENGTH: usize = 6;

pub fn hash_password(password: &str) -> Result<String, UserError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(UserError::ValidationError(format!(
            "Password must have at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }

    hash(password, DEFAULT_COST).map_err(|e| {
        error!("bcrypt hashing failed: {}", e);
        UserError::PasswordHash
    })
}

/// A malformed stored hash counts as a mismatch.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    verify(password, password_hash).unwrap_or(false)
}

fn decoy_hash() -> &'static str {
    static DECOY_HASH: OnceLock<String> = OnceLock::new();
    DECOY_HASH.get_or_init(|| {
        hash("decoy-password-never-stored", DEFAULT_COST).unwrap_or_else(|e| {
            error!("bcrypt decoy hashing failed: {}", e);
            String::new()
        })
    })
}

/// Runs a full-cost comparison against a throwaway hash and always fails.
/// Login calls this when there is no usable stored hash so that every
/// rejection costs the same.
pub fn verify_against_decoy(password: &str) -> bool {
    let _ = verify_password(password, decoy_hash());
    false
}
