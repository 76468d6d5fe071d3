use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::{fingerprint, RecordFilter};
use crate::error::AppError;
use crate::store::TokenRecordStore;

/// Revokes refresh tokens. Both operations are idempotent and a missing
/// record is never an error.
pub struct RevocationService {
    records: Arc<dyn TokenRecordStore>,
}

impl RevocationService {
    pub fn new(records: Arc<dyn TokenRecordStore>) -> Self {
        Self { records }
    }

    pub async fn revoke_one(&self, token: &str) -> Result<(), AppError> {
        if let Some(record) = self
            .records
            .find_by_token(&fingerprint(token), RecordFilter::Any)
            .await?
        {
            self.records.set_revoked(record.id, Utc::now()).await?;
            tracing::info!(user_id = %record.user_id, record_id = %record.id, "Refresh token revoked");
        }
        Ok(())
    }

    /// Revoke every live refresh token of an identity ("log out everywhere").
    pub async fn revoke_all(&self, identity_id: Uuid) -> Result<u64, AppError> {
        let revoked = self
            .records
            .bulk_set_revoked_for_identity(identity_id, Utc::now())
            .await?;
        tracing::info!(user_id = %identity_id, revoked = revoked, "All refresh tokens revoked for user");
        Ok(revoked)
    }
}
