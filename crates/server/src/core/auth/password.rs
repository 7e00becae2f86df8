//! Password hashing (bcrypt).

use crate::core::error::{Error, Result};
use bcrypt::{non_truncating_hash, non_truncating_verify, DEFAULT_COST};

/// Salted, deliberately slow one-way password hashing.
#[derive(Clone, Copy, Debug)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self { cost: DEFAULT_COST }
    }
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Hash `password` with a fresh salt. Passwords longer than bcrypt's
    /// 72-byte input are refused rather than truncated.
    pub fn hash(&self, password: &str) -> bcrypt::BcryptResult<String> {
        non_truncating_hash(password, self.cost)
    }

    /// `true` only if `password` matches `hashed` exactly. A malformed hash
    /// or an over-long password counts as a mismatch.
    pub fn verify(&self, password: &str, hashed: &str) -> bool {
        non_truncating_verify(password, hashed).unwrap_or(false)
    }

    /// Runs on the blocking pool; bcrypt takes tens of milliseconds.
    pub async fn hash_async(&self, password: String) -> Result<String> {
        let hasher = *self;
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| Error::Internal(format!("hashing task failed: {e}")))?
            .map_err(|e| Error::Internal(format!("failed to hash password: {e}")))
    }

    pub async fn verify_async(&self, password: String, hashed: String) -> bool {
        let hasher = *self;
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hashed))
            .await
            .unwrap_or(false)
    }
}
