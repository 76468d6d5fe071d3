/// JWT Claims structure
///
/// Shared payload of access and refresh tokens. Which secret signed a token
/// decides what it is good for; the claim set is the same.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::error::{AppError, AuthError};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (identity ID as UUID string)
    pub sub: String,
    /// Identity email
    pub email: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Issuer
    pub iss: String,
    /// Unique token ID, keeps tokens minted in the same second distinct
    pub jti: String,
}

impl Claims {
    /// Create new claims with identity information
    ///
    /// # Arguments
    /// * `user_id` - Identity UUID
    /// * `email` - Identity email address
    /// * `expiry_seconds` - Token expiration in seconds from now
    /// * `issuer` - Issuer identifier
    pub fn new(
        user_id: Uuid,
        email: String,
        expiry_seconds: i64,
        issuer: String,
    ) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: user_id.to_string(),
            email,
            exp: now + expiry_seconds,
            iat: now,
            iss: issuer,
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// Extract identity ID from claims
    ///
    /// # Errors
    /// Returns `TokenInvalid` if the subject is not a valid UUID
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub).map_err(|_| AppError::Auth(AuthError::TokenInvalid))
    }
}
