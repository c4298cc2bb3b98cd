//! Authentication utilities
//!
//! # Modules
//!
//! - [`password`]: Argon2id password hashing and verification
//! - [`jwt`]: JWT bearer token issuance and validation
//! - [`middleware`]: Resolving a request's bearer token to a user
//!
//! # Example
//!
//! ```no_run
//! use taskdesk_shared::auth::jwt::{create_token, Claims};
//! use taskdesk_shared::auth::password::{hash_password, verify_password, HashParams};
//! use chrono::Duration;
//! use uuid::Uuid;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let hash = hash_password("user_password", &HashParams::default())?;
//! assert!(verify_password("user_password", &hash)?);
//!
//! let claims = Claims::new(Uuid::new_v4(), Duration::days(7));
//! let token = create_token(&claims, "secret-key")?;
//! # Ok(())
//! # }
//! ```

pub mod jwt;
pub mod middleware;
pub mod password;
