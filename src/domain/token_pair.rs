use crate::domain::Identity;

/// Freshly minted access/refresh tokens for one identity.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    pub token_type: &'static str,
    pub identity: Identity,
}
