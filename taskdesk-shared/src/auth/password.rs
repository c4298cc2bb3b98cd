//! Password hashing module using Argon2id
//!
//! Passwords are hashed with Argon2id and a fresh random salt per call. The
//! cost parameters live in [`HashParams`] so deployments can tune them from
//! configuration instead of relying on constants baked into the binary.
//!
//! # Security
//!
//! - **Algorithm**: Argon2id (hybrid of Argon2i and Argon2d)
//! - **Default cost**: 64 MB memory, 3 iterations, 4 lanes
//! - **Salt**: 16 random bytes from the OS RNG
//! - **Output**: 32-byte hash in PHC string format
//!
//! Verification reads the parameters back out of the stored PHC string, so
//! hashes created under older parameters keep verifying after a cost change.
//!
//! # Example
//!
//! ```
//! use taskdesk_shared::auth::password::{hash_password, verify_password, HashParams};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let params = HashParams::default();
//! let hash = hash_password("super_secret_password_123", &params)?;
//!
//! assert!(verify_password("super_secret_password_123", &hash)?);
//! assert!(!verify_password("wrong_password", &hash)?);
//! # Ok(())
//! # }
//! ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};
use serde::{Deserialize, Serialize};

/// Longest password accepted for hashing, in bytes
pub const MAX_PASSWORD_BYTES: usize = 1024;

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Failed to verify password
    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    /// Invalid password hash format
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashParams {
    /// Memory cost in KiB
    pub memory_kib: u32,

    /// Number of passes over memory
    pub iterations: u32,

    /// Degree of parallelism (lanes)
    pub parallelism: u32,
}

impl Default for HashParams {
    fn default() -> Self {
        Self {
            memory_kib: 65536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl HashParams {
    /// Checks that argon2 accepts these cost parameters
    ///
    /// # Errors
    ///
    /// Returns `PasswordError::HashError` naming the rejected parameter
    pub fn validate(&self) -> Result<(), PasswordError> {
        self.hasher().map(|_| ())
    }

    fn hasher(&self) -> Result<Argon2<'static>, PasswordError> {
        let params = ParamsBuilder::new()
            .m_cost(self.memory_kib)
            .t_cost(self.iterations)
            .p_cost(self.parallelism)
            .output_len(32)
            .build()
            .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

        Ok(Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params))
    }
}

/// Hashes a password using Argon2id
///
/// # Returns
///
/// PHC string format hash (includes algorithm, parameters, salt, and hash):
///
/// ```text
/// $argon2id$v=19$m=65536,t=3,p=4$c2FsdHNhbHRzYWx0$hash...
/// ```
///
/// # Errors
///
/// Returns `PasswordError::HashError` if the parameters are out of range or
/// hashing fails
pub fn hash_password(password: &str, params: &HashParams) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = params.hasher()?;

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

    Ok(password_hash.to_string())
}

/// Verifies a password against a stored hash
///
/// The comparison is constant-time with respect to where a mismatch occurs.
///
/// # Returns
///
/// `Ok(true)` if the password matches, `Ok(false)` if it doesn't
///
/// # Errors
///
/// Returns `PasswordError::InvalidHash` when `hash` is not a PHC string or
/// carries no digest, and `PasswordError::VerifyError` for any other
/// verification failure
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

    // argon2 reports a missing digest as a mismatch
    if parsed_hash.hash.is_none() {
        return Err(PasswordError::InvalidHash("Hash has no digest".to_string()));
    }

    // Parameters come from the PHC string, not from Argon2::default()
    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(format!("Verification failed: {}", e))),
    }
}

/// Validates that a password is acceptable for hashing
///
/// Only rejects empty passwords and passwords longer than
/// [`MAX_PASSWORD_BYTES`], which would make hashing needlessly expensive.
///
/// ```
/// use taskdesk_shared::auth::password::validate_password_strength;
///
/// assert!(validate_password_strength("pw1234").is_ok());
/// assert!(validate_password_strength("").is_err());
/// ```
pub fn validate_password_strength(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("password must not be empty".to_string());
    }

    if password.len() > MAX_PASSWORD_BYTES {
        return Err(format!(
            "password must be at most {} bytes",
            MAX_PASSWORD_BYTES
        ));
    }

    Ok(())
}
