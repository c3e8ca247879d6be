//! Secret hashing using Argon2id.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HashError {
    #[error("crypto error: {0}")]
    Crypto(String),
}

/// One-way hashing primitive for user secrets.
///
/// Output is an opaque digest (PHC string for the Argon2 implementation).
pub trait SecretHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> Result<String, HashError>;
}

/// Argon2id hasher with an optional server-side pepper.
///
/// If a pepper is configured it is prepended to the secret before hashing,
/// so verifiers must apply the same pepper.
#[derive(Debug, Clone, Default)]
pub struct Argon2SecretHasher {
    pepper: Option<String>,
}

impl Argon2SecretHasher {
    pub fn new(pepper: Option<String>) -> Self {
        Self { pepper }
    }
}

fn peppered(password: &str, pepper: Option<&str>) -> String {
    match pepper {
        Some(p) => format!("{p}{password}"),
        None => password.to_string(),
    }
}

impl SecretHasher for Argon2SecretHasher {
    fn hash(&self, plaintext: &str) -> Result<String, HashError> {
        let input = peppered(plaintext, self.pepper.as_deref());
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(input.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| HashError::Crypto(format!("hash error: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use argon2::{PasswordHash, PasswordVerifier};

    use super::*;

    fn verifies(password: &str, hash: &str, pepper: Option<&str>) -> bool {
        let parsed = PasswordHash::new(hash).unwrap();
        Argon2::default()
            .verify_password(peppered(password, pepper).as_bytes(), &parsed)
            .is_ok()
    }

    #[test]
    fn hash_is_not_plaintext_and_verifies() {
        let hasher = Argon2SecretHasher::default();
        let hash = hasher.hash("hunter22").unwrap();
        assert_ne!(hash, "hunter22");
        assert!(hash.starts_with("$argon2"));
        assert!(verifies("hunter22", &hash, None));
        assert!(!verifies("wrong", &hash, None));
    }

    #[test]
    fn pepper_is_applied() {
        let hasher = Argon2SecretHasher::new(Some("pepper!".to_string()));
        let hash = hasher.hash("hunter22").unwrap();
        assert!(verifies("hunter22", &hash, Some("pepper!")));
        assert!(!verifies("hunter22", &hash, None));
    }
}
