/// Persistence contracts for identities and refresh token records
///
/// The token lifecycle core only talks to these traits. `postgres` is the
/// production backend; `memory` is a reference implementation with the same
/// atomicity guarantees, used by tests and local tooling.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Identity, RecordFilter, RefreshTokenRecord};
use crate::error::AppError;

mod memory;
mod postgres;

pub use memory::{InMemoryCredentialStore, InMemoryTokenRecordStore};
pub use postgres::{PgCredentialStore, PgTokenRecordStore};

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, AppError>;

    /// Persist a new identity.
    ///
    /// # Errors
    /// `AppError::Conflict` when the email is already registered.
    async fn insert(&self, identity: Identity) -> Result<Identity, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>, AppError>;
}

#[async_trait]
pub trait TokenRecordStore: Send + Sync {
    async fn insert(&self, record: RefreshTokenRecord) -> Result<(), AppError>;

    async fn find_by_token(
        &self,
        token_hash: &str,
        filter: RecordFilter,
    ) -> Result<Option<RefreshTokenRecord>, AppError>;

    /// Atomically flip `is_used` from false to true.
    ///
    /// Succeeds only for a record that is neither used nor revoked, and
    /// returns `false` when no row was changed. Implementations must make the
    /// check and the write a single step.
    async fn compare_and_set_used(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, AppError>;

    async fn set_revoked(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AppError>;

    /// Revoke every not-yet-revoked record owned by `identity_id`.
    /// Returns the number of records changed.
    async fn bulk_set_revoked_for_identity(
        &self,
        identity_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64, AppError>;
}
