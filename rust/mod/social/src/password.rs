//! Opaque hash/verify capability used at registration and login.

/// Hashes and verifies passwords. The service never inspects the hash.
pub trait PasswordHasher: Send + Sync {
    /// Hash a plain password for storage.
    fn hash(&self, password: &str) -> Result<String, String>;

    /// Check a plain password against a stored hash.
    fn verify(&self, password: &str, hash: &str) -> bool;
}

/// argon2id with the crate's default parameters.
#[derive(Debug, Default, Clone, Copy)]
pub struct Argon2Hasher;

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, String> {
        use argon2::Argon2;
        use password_hash::PasswordHasher as _;
        use password_hash::SaltString;
        use password_hash::rand_core::OsRng;

        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| e.to_string())
    }

    fn verify(&self, password: &str, hash: &str) -> bool {
        use argon2::Argon2;
        use password_hash::{PasswordHash, PasswordVerifier};

        match PasswordHash::new(hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argon2_round_trip() {
        let hasher = Argon2Hasher;
        let hash = hasher.hash("hunter22").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(hasher.verify("hunter22", &hash));
        assert!(!hasher.verify("hunter23", &hash));
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(!Argon2Hasher.verify("anything", "not-a-phc-string"));
    }
}
