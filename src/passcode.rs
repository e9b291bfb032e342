//! Argon2id hashing for clipboard passcodes
//!
//! Private clipboards store a PHC-formatted hash string. Verification reads
//! the parameters back out of the stored string, so changing the configured
//! cost only affects clipboards created afterwards.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use thiserror::Error;

use crate::config::SecurityConfig;

/// Passcode hashing errors
#[derive(Debug, Error)]
pub enum PasscodeError {
    /// Argon2 parameters rejected
    #[error("Invalid Argon2 parameters: {0}")]
    Params(String),

    /// Hashing failed
    #[error("Argon2id hashing failed: {0}")]
    Hash(String),

    /// Stored hash could not be parsed
    #[error("Malformed passcode hash: {0}")]
    Malformed(String),

    /// Blocking hash task did not complete
    #[error("Hashing task failed: {0}")]
    Task(String),
}

/// Hashes and verifies passcodes off the async executor
#[derive(Debug, Clone)]
pub struct PasscodeHasher {
    params: Params,
}

impl Default for PasscodeHasher {
    fn default() -> Self {
        Self {
            params: Params::DEFAULT,
        }
    }
}

impl PasscodeHasher {
    pub fn with_params(
        memory_kib: u32,
        iterations: u32,
        parallelism: u32,
    ) -> Result<Self, PasscodeError> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| PasscodeError::Params(e.to_string()))?;
        Ok(Self { params })
    }

    pub fn from_config(config: &SecurityConfig) -> Result<Self, PasscodeError> {
        Self::with_params(
            config.argon2_memory_kib,
            config.argon2_iterations,
            config.argon2_parallelism,
        )
    }

    fn argon(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash `passcode` with a fresh random salt, returning a PHC string
    pub fn hash_blocking(&self, passcode: &str) -> Result<String, PasscodeError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon()
            .hash_password(passcode.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PasscodeError::Hash(e.to_string()))
    }

    /// Check `passcode` against a stored PHC string
    pub fn verify_blocking(&self, passcode: &str, stored: &str) -> Result<bool, PasscodeError> {
        let parsed = PasswordHash::new(stored).map_err(|e| PasscodeError::Malformed(e.to_string()))?;
        match self.argon().verify_password(passcode.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PasscodeError::Hash(e.to_string())),
        }
    }

    pub async fn hash(&self, passcode: &str) -> Result<String, PasscodeError> {
        let hasher = self.clone();
        let passcode = passcode.to_owned();
        tokio::task::spawn_blocking(move || hasher.hash_blocking(&passcode))
            .await
            .map_err(|e| PasscodeError::Task(e.to_string()))?
    }

    pub async fn verify(&self, passcode: &str, stored: &str) -> Result<bool, PasscodeError> {
        let hasher = self.clone();
        let passcode = passcode.to_owned();
        let stored = stored.to_owned();
        tokio::task::spawn_blocking(move || hasher.verify_blocking(&passcode, &stored))
            .await
            .map_err(|e| PasscodeError::Task(e.to_string()))?
    }
}
