//! One-way password hashing.
//!
//! Hashes are Argon2id PHC strings produced with `Argon2::default()`
//! (19 MiB memory, 2 iterations, 1 lane). The parameters travel inside each
//! hash, so verification always uses whatever cost the hash was created with.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use once_cell::sync::Lazy;
use rand_core::OsRng;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("failed to hash password: {0}")]
    Hashing(String),
    #[error("password worker failed: {0}")]
    Worker(String),
}

/// Hash checked when a login names an unknown email, so that path costs the
/// same as a real mismatch.
static DUMMY_HASH: Lazy<Option<String>> =
    Lazy::new(|| hash_password("timing-equaliser-not-a-real-password").ok());

pub fn hash_password(plaintext: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| PasswordError::Hashing(err.to_string()))
}

/// Never errors: an unparseable hash is simply a mismatch.
pub fn verify_password(plaintext: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Burns one verification against a throwaway hash. The result is ignored.
pub fn verify_dummy(plaintext: &str) {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_password(plaintext, hash);
    }
}

/// [`hash_password`] on the blocking pool, keeping argon2 off the async workers.
pub async fn hash_password_async(plaintext: &str) -> Result<String, PasswordError> {
    let plaintext = plaintext.to_owned();
    tokio::task::spawn_blocking(move || hash_password(&plaintext))
        .await
        .map_err(|err| PasswordError::Worker(err.to_string()))?
}

/// Checks `plaintext` against `hash` on the blocking pool. With no hash (an
/// unknown account) the dummy hash is checked instead and the result is always
/// a mismatch.
pub async fn verify_password_async(
    plaintext: &str,
    hash: Option<&str>,
) -> Result<bool, PasswordError> {
    let plaintext = plaintext.to_owned();
    let hash = hash.map(str::to_owned);
    tokio::task::spawn_blocking(move || match hash {
        Some(hash) => verify_password(&plaintext, &hash),
        None => {
            verify_dummy(&plaintext);
            false
        }
    })
    .await
    .map_err(|err| PasswordError::Worker(err.to_string()))
}
