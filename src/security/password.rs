use anyhow::Result;
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use thiserror::Error;

use crate::config::SecurityConfig;

/// New password rejected by the strength policy.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct WeakPasswordError(pub String);

/// Hash a password using Argon2id with the configured cost parameters.
/// Every call draws a fresh random salt, so two hashes of the same input
/// produce different strings while both still verify.
pub fn hash_password(password: &str, config: &SecurityConfig) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let params = Params::new(
        config.argon2_memory_cost_kib,
        config.argon2_time_cost,
        config.argon2_parallelism,
        None, // output length (use default)
    )
    .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Verify a password against a stored PHC hash string.
/// Returns false on mismatch or an unparseable hash, never an error.
/// The cost parameters are read back from the hash itself, so hashes
/// created under older configs keep verifying.
#[must_use]
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(hash) else {
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Strength policy for the change-password path. Registration is exempt.
pub fn check_strength(password: &str, config: &SecurityConfig) -> Result<(), WeakPasswordError> {
    if password.len() < config.password_min_length {
        return Err(WeakPasswordError(format!(
            "New password must be at least {} characters",
            config.password_min_length
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> SecurityConfig {
        SecurityConfig {
            argon2_memory_cost_kib: 256,
            argon2_time_cost: 1,
            argon2_parallelism: 1,
            password_min_length: 8,
        }
    }

    #[test]
    fn hash_and_verify_roundtrip() {
        let config = fast_config();
        let hash = hash_password("p@ssw0rd", &config).unwrap();

        assert!(verify_password("p@ssw0rd", &hash));
        assert!(!verify_password("wrong", &hash));
    }

    #[test]
    fn hashing_twice_produces_different_strings() {
        let config = fast_config();
        let first = hash_password("p@ssw0rd", &config).unwrap();
        let second = hash_password("p@ssw0rd", &config).unwrap();

        assert_ne!(first, second);
        assert!(verify_password("p@ssw0rd", &first));
        assert!(verify_password("p@ssw0rd", &second));
    }

    #[test]
    fn verify_rejects_garbage_hash() {
        assert!(!verify_password("anything", "not-a-phc-string"));
        assert!(!verify_password("anything", ""));
    }

    #[test]
    fn strength_policy_enforces_minimum_length() {
        let config = fast_config();

        assert!(check_strength("12345678", &config).is_ok());
        let err = check_strength("1234567", &config).unwrap_err();
        assert!(err.to_string().contains("at least 8"));
    }
}
