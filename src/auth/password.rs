use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use regex::Regex;
use tracing::error;

pub const MIN_PASSWORD_LEN: usize = 8;

lazy_static! {
    static ref EMAIL: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email)
}

fn argon_failure(stage: &'static str, e: password_hash::Error) -> anyhow::Error {
    error!(error = %e, stage, "argon2 failure");
    anyhow::anyhow!("argon2 {stage}: {e}")
}

/// Argon2id PHC string with a fresh random salt.
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| argon_failure("hash", e))
}

/// `Ok(false)` on a wrong password, `Err` only when the stored hash is unreadable.
pub fn verify_password(plain: &str, stored: &str) -> anyhow::Result<bool> {
    let stored = PasswordHash::new(stored).map_err(|e| argon_failure("parse", e))?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &stored)
        .is_ok())
}
