/// Refresh token records
///
/// A record is created for every issued refresh token and is never deleted
/// by the service. Once a record is used or revoked it is terminal.

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Caller details captured when a token is issued. Audit only.
#[derive(Debug, Clone, Default)]
pub struct ClientMetadata {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Lookup filter for refresh token records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFilter {
    /// Match regardless of used/revoked state
    Any,
    /// Match only records with `is_revoked = false`
    NotRevoked,
}

impl RecordFilter {
    pub fn matches(&self, record: &RefreshTokenRecord) -> bool {
        match self {
            RecordFilter::Any => true,
            RecordFilter::NotRevoked => !record.is_revoked,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    /// SHA-256 hex digest of the signed refresh token
    pub token_hash: String,
    pub user_id: Uuid,
    pub is_used: bool,
    pub is_revoked: bool,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshTokenRecord {
    /// Build a fresh record for `token`, expiring `ttl_seconds` after `now`.
    pub fn new(
        user_id: Uuid,
        token: &str,
        now: DateTime<Utc>,
        ttl_seconds: i64,
        client: ClientMetadata,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            token_hash: fingerprint(token),
            user_id,
            is_used: false,
            is_revoked: false,
            ip_address: client.ip_address,
            user_agent: client.user_agent,
            created_at: now,
            expires_at: now + Duration::seconds(ttl_seconds),
            used_at: None,
            revoked_at: None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Lookup key for a refresh token. Tokens are never stored in plaintext.
pub fn fingerprint(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
