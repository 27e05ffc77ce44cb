//! Password hashing and verification.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use thiserror::Error;

use crate::config::PasswordConfig;
use crate::errors::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    /// The plaintext cannot be hashed
    #[error("cannot hash input: {0}")]
    Input(String),

    /// The configured Argon2 parameters are rejected, or hashing itself failed
    #[error("cannot hash with configured parameters: {0}")]
    Params(String),

    /// The stored hash is not a parseable PHC string
    #[error("cannot verify against stored hash: {0}")]
    Verification(String),
}

impl From<PasswordError> for Error {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::Input(message) => Error::BadRequest { message },
            PasswordError::Params(message) => Error::Internal {
                operation: format!("hash password: {message}"),
            },
            PasswordError::Verification(message) => Error::Internal {
                operation: format!("verify password: {message}"),
            },
        }
    }
}

/// Argon2 hashing parameters.
#[derive(Debug, Clone, Copy)]
pub struct Argon2Params {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Argon2Params {
    /// Check the parameters against Argon2's limits.
    pub fn validate(self) -> Result<Params, PasswordError> {
        Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|e| PasswordError::Params(format!("invalid argon2 params: {e}")))
    }

    /// Create Argon2 instance with these parameters.
    fn to_argon2(self) -> Result<Argon2<'static>, PasswordError> {
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, self.validate()?))
    }
}

impl Default for Argon2Params {
    /// Secure defaults for production (Argon2id RFC recommendations)
    fn default() -> Self {
        Self {
            memory_kib: 19456, // 19 MB
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl From<&PasswordConfig> for Argon2Params {
    fn from(config: &PasswordConfig) -> Self {
        Self {
            memory_kib: config.argon2_memory_kib,
            iterations: config.argon2_iterations,
            parallelism: config.argon2_parallelism,
        }
    }
}

/// Hash a string using Argon2id with a random salt.
///
/// Uses the provided parameters or secure defaults if None.
pub fn hash_string_with_params(input: &str, params: Option<Argon2Params>) -> Result<String, PasswordError> {
    if input.is_empty() {
        return Err(PasswordError::Input("password must not be empty".to_string()));
    }

    let salt = SaltString::generate(&mut OsRng);
    let argon2 = params.unwrap_or_default().to_argon2()?;

    let hash = argon2
        .hash_password(input.as_bytes(), &salt)
        .map_err(|e| PasswordError::Params(e.to_string()))?;

    Ok(hash.to_string())
}

/// Verify a string against a hash.
///
/// Verification uses the parameters embedded in the hash itself, so hashes created under an
/// older work factor keep verifying after the configuration changes.
pub fn verify_string(input: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| PasswordError::Verification(e.to_string()))?;

    match Argon2::default().verify_password(input.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::Verification(e.to_string())),
    }
}
