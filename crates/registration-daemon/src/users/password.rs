//! Argon2 password hashing

use super::UserError;
use argon2::password_hash::{
    rand_core::OsRng, Error as PasswordHashError, PasswordHash, PasswordHasher, PasswordVerifier,
    SaltString,
};
use argon2::Argon2;

/// Hash a password into a PHC string with a fresh salt.
pub fn hash_password(password: &str) -> Result<String, UserError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| UserError::Credentials(format!("failed to hash password: {err}")))?;
    Ok(hash.to_string())
}

/// Check a candidate password against a stored PHC string.
pub fn verify_password(stored_hash: &str, candidate: &str) -> Result<bool, UserError> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|err| UserError::Credentials(format!("invalid stored hash: {err}")))?;
    match Argon2::default().verify_password(candidate.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(PasswordHashError::Password) => Ok(false),
        Err(err) => Err(UserError::Credentials(format!(
            "failed to verify password: {err}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("Password1#").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&hash, "Password1#").unwrap());
        assert!(!verify_password(&hash, "Password2#").unwrap());
    }

    #[test]
    fn test_salts_differ() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_garbage_hash_is_an_error() {
        assert!(verify_password("not-a-phc-string", "x").is_err());
    }
}
