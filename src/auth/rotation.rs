/// Refresh token rotation
///
/// A refresh token can be exchanged exactly once. The exchange is decided by
/// the store's atomic compare-and-set on `is_used`; when several callers
/// present the same token concurrently only one of them wins.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;

use crate::auth::issuer::TokenIssuer;
use crate::auth::jwt::TokenCodec;
use crate::domain::{fingerprint, ClientMetadata, RecordFilter, TokenPair};
use crate::error::{AppError, AuthError};
use crate::store::{CredentialStore, TokenRecordStore};

/// Why a rotation did not produce a new pair.
#[derive(Debug)]
pub enum RotationError {
    /// Bad signature, expired, unknown, revoked or already used. The cause
    /// is deliberately not reported.
    InvalidToken,
    /// The store failed; not a statement about the token.
    Store(AppError),
}

impl fmt::Display for RotationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RotationError::InvalidToken => write!(f, "Invalid refresh token"),
            RotationError::Store(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for RotationError {}

impl From<AppError> for RotationError {
    fn from(err: AppError) -> Self {
        RotationError::Store(err)
    }
}

impl From<RotationError> for AppError {
    fn from(err: RotationError) -> Self {
        match err {
            RotationError::InvalidToken => AppError::Auth(AuthError::TokenInvalid),
            RotationError::Store(e) => e,
        }
    }
}

pub struct RotationProtocol {
    codec: Arc<TokenCodec>,
    records: Arc<dyn TokenRecordStore>,
    credentials: Arc<dyn CredentialStore>,
    issuer: Arc<TokenIssuer>,
}

impl RotationProtocol {
    pub fn new(
        codec: Arc<TokenCodec>,
        records: Arc<dyn TokenRecordStore>,
        credentials: Arc<dyn CredentialStore>,
        issuer: Arc<TokenIssuer>,
    ) -> Self {
        Self {
            codec,
            records,
            credentials,
            issuer,
        }
    }

    pub async fn rotate(&self, token: &str, client: ClientMetadata) -> Result<TokenPair, RotationError> {
        // Signature, issuer and expiry first; no store access for forged tokens
        let claims = self
            .codec
            .decode_refresh(token)
            .map_err(|_| RotationError::InvalidToken)?;
        let subject = claims.user_id().map_err(|_| RotationError::InvalidToken)?;

        let record = match self
            .records
            .find_by_token(&fingerprint(token), RecordFilter::NotRevoked)
            .await?
        {
            Some(record) => record,
            None => {
                tracing::warn!(user_id = %subject, "Refresh token not found or revoked");
                return Err(RotationError::InvalidToken);
            }
        };

        if record.user_id != subject {
            tracing::warn!(record_id = %record.id, "Refresh token subject does not match record owner");
            return Err(RotationError::InvalidToken);
        }

        let now = Utc::now();
        if record.is_expired(now) {
            tracing::info!(user_id = %record.user_id, record_id = %record.id, "Refresh token expired");
            return Err(RotationError::InvalidToken);
        }

        if !self.records.compare_and_set_used(record.id, now).await? {
            tracing::warn!(
                user_id = %record.user_id,
                record_id = %record.id,
                "Refresh token replayed after use"
            );
            return Err(RotationError::InvalidToken);
        }

        let identity = match self.credentials.find_by_id(record.user_id).await? {
            Some(identity) if identity.is_active => identity,
            _ => {
                tracing::warn!(user_id = %record.user_id, "Refresh token owner missing or inactive");
                return Err(RotationError::InvalidToken);
            }
        };

        let pair = self.issuer.issue(&identity, client).await?;
        tracing::info!(user_id = %identity.id, consumed = %record.id, "Refresh token rotated");
        Ok(pair)
    }
}
