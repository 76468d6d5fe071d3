use std::sync::Arc;

use chrono::Utc;

use crate::auth::jwt::TokenCodec;
use crate::domain::{ClientMetadata, Identity, RefreshTokenRecord, TokenPair};
use crate::error::AppError;
use crate::store::TokenRecordStore;

/// Mints an access/refresh pair and persists the refresh token record.
pub struct TokenIssuer {
    codec: Arc<TokenCodec>,
    records: Arc<dyn TokenRecordStore>,
}

impl TokenIssuer {
    pub fn new(codec: Arc<TokenCodec>, records: Arc<dyn TokenRecordStore>) -> Self {
        Self { codec, records }
    }

    /// Issue a new token pair for `identity`
    ///
    /// # Errors
    /// Returns error if signing fails or the record cannot be stored
    pub async fn issue(&self, identity: &Identity, client: ClientMetadata) -> Result<TokenPair, AppError> {
        let access_token = self.codec.encode_access(identity)?;
        let refresh_token = self.codec.encode_refresh(identity)?;

        let record = RefreshTokenRecord::new(
            identity.id,
            &refresh_token,
            Utc::now(),
            self.codec.refresh_ttl(),
            client,
        );
        let record_id = record.id;
        self.records.insert(record).await?;

        tracing::info!(user_id = %identity.id, record_id = %record_id, "Token pair issued");

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.codec.access_ttl(),
            token_type: "Bearer",
            identity: identity.clone(),
        })
    }
}
