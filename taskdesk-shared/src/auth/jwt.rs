//! JWT token generation and validation module
//!
//! Bearer tokens are HS256-signed JWTs carrying the user id as `sub`. They are
//! time-bounded (7 days by default) and unforgeable without the signing secret.
//!
//! # Security
//!
//! - **Algorithm**: HS256 (HMAC with SHA-256)
//! - **Expiration**: Configurable, checked with zero leeway
//! - **Validation**: Signature, expiration, not-before, and issuer checks
//!
//! # Example
//!
//! ```
//! use taskdesk_shared::auth::jwt::{create_token, validate_token, Claims, DEFAULT_TOKEN_TTL_HOURS};
//! use chrono::Duration;
//! use uuid::Uuid;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let user_id = Uuid::new_v4();
//!
//! let claims = Claims::new(user_id, Duration::hours(DEFAULT_TOKEN_TTL_HOURS));
//! let token = create_token(&claims, "your-secret-key")?;
//!
//! let validated = validate_token(&token, "your-secret-key")?;
//! assert_eq!(validated.sub, user_id);
//! # Ok(())
//! # }
//! ```

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issuer stamped into and required on every token
pub const ISSUER: &str = "taskdesk";

/// Default token lifetime (7 days)
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24 * 7;

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Signature does not match the secret
    #[error("Invalid token signature")]
    InvalidSignature,

    /// Token was issued by someone else
    #[error("Invalid issuer")]
    InvalidIssuer,

    /// Token could not be decoded or failed another validation rule
    #[error("Malformed token: {0}")]
    Malformed(String),
}

/// JWT claims structure
///
/// - `sub`: Subject (user ID)
/// - `iss`: Issuer (always "taskdesk")
/// - `iat`: Issued at timestamp
/// - `exp`: Expiration timestamp
/// - `nbf`: Not before timestamp
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - User ID
    pub sub: Uuid,

    /// Issuer - Always "taskdesk"
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,
}

impl Claims {
    /// Creates claims for `user_id` that expire after `ttl`
    ///
    /// A negative `ttl` yields claims that are already expired, which is
    /// mostly useful in tests.
    pub fn new(user_id: Uuid, ttl: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            nbf: now.timestamp(),
        }
    }
}

/// Creates a JWT token from claims
///
/// Signs the token using HS256 with the provided secret.
///
/// # Errors
///
/// Returns `JwtError::CreateError` if encoding fails
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Validates a JWT token and extracts claims
///
/// Verifies that:
/// - the signature matches `secret`
/// - the token hasn't expired (no leeway)
/// - the token is not used before its `nbf` time
/// - the issuer is "taskdesk"
///
/// # Errors
///
/// - `JwtError::Expired` past the expiry boundary
/// - `JwtError::InvalidSignature` for tampered tokens or a different secret
/// - `JwtError::InvalidIssuer` for tokens minted by another issuer
/// - `JwtError::Malformed` for anything that does not decode
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.set_required_spec_claims(&["exp", "sub", "iss"]);
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.leeway = 0;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => JwtError::Expired,
        ErrorKind::InvalidSignature => JwtError::InvalidSignature,
        ErrorKind::InvalidIssuer => JwtError::InvalidIssuer,
        _ => JwtError::Malformed(e.to_string()),
    })?;

    Ok(token_data.claims)
}
