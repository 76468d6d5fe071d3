use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::domain::{Identity, RecordFilter, RefreshTokenRecord};
use crate::error::{AppError, DatabaseError};
use crate::store::{CredentialStore, TokenRecordStore};

#[derive(Default)]
struct Identities {
    by_id: HashMap<Uuid, Identity>,
    by_email: HashMap<String, Uuid>,
}

/// Credential store backed by a process-local map.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    inner: Mutex<Identities>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the active flag of an identity. Returns false if it does not exist.
    pub fn set_active(&self, id: Uuid, active: bool) -> bool {
        let mut inner = self.inner.lock();
        match inner.by_id.get_mut(&id) {
            Some(identity) => {
                identity.is_active = active;
                identity.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, AppError> {
        let inner = self.inner.lock();
        Ok(inner
            .by_email
            .get(email)
            .and_then(|id| inner.by_id.get(id))
            .cloned())
    }

    async fn insert(&self, identity: Identity) -> Result<Identity, AppError> {
        let mut inner = self.inner.lock();
        if inner.by_email.contains_key(&identity.email) {
            return Err(AppError::Conflict(
                "User with this email already exists".to_string(),
            ));
        }
        inner.by_email.insert(identity.email.clone(), identity.id);
        inner.by_id.insert(identity.id, identity.clone());
        Ok(identity)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>, AppError> {
        Ok(self.inner.lock().by_id.get(&id).cloned())
    }
}

#[derive(Default)]
struct Records {
    by_id: HashMap<Uuid, RefreshTokenRecord>,
    by_hash: HashMap<String, Uuid>,
}

/// Refresh token store backed by a process-local map.
///
/// Every operation runs under one mutex, so `compare_and_set_used` is a
/// single atomic step exactly like the conditional `UPDATE` in Postgres.
#[derive(Default)]
pub struct InMemoryTokenRecordStore {
    inner: Mutex<Records>,
}

impl InMemoryTokenRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record owned by `identity_id`.
    pub fn records_for(&self, identity_id: Uuid) -> Vec<RefreshTokenRecord> {
        self.inner
            .lock()
            .by_id
            .values()
            .filter(|record| record.user_id == identity_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl TokenRecordStore for InMemoryTokenRecordStore {
    async fn insert(&self, record: RefreshTokenRecord) -> Result<(), AppError> {
        let mut inner = self.inner.lock();
        if inner.by_hash.contains_key(&record.token_hash) || inner.by_id.contains_key(&record.id) {
            return Err(AppError::Database(DatabaseError::UniqueConstraintViolation(
                "refresh token already stored".to_string(),
            )));
        }
        inner.by_hash.insert(record.token_hash.clone(), record.id);
        inner.by_id.insert(record.id, record);
        Ok(())
    }

    async fn find_by_token(
        &self,
        token_hash: &str,
        filter: RecordFilter,
    ) -> Result<Option<RefreshTokenRecord>, AppError> {
        let inner = self.inner.lock();
        Ok(inner
            .by_hash
            .get(token_hash)
            .and_then(|id| inner.by_id.get(id))
            .filter(|record| filter.matches(record))
            .cloned())
    }

    async fn compare_and_set_used(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, AppError> {
        let mut inner = self.inner.lock();
        match inner.by_id.get_mut(&id) {
            Some(record) if !record.is_used && !record.is_revoked => {
                record.is_used = true;
                record.used_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_revoked(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
        if let Some(record) = self.inner.lock().by_id.get_mut(&id) {
            record.is_revoked = true;
            record.revoked_at.get_or_insert(at);
        }
        Ok(())
    }

    async fn bulk_set_revoked_for_identity(
        &self,
        identity_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let mut inner = self.inner.lock();
        let mut revoked = 0;
        for record in inner
            .by_id
            .values_mut()
            .filter(|record| record.user_id == identity_id && !record.is_revoked)
        {
            record.is_revoked = true;
            record.revoked_at = Some(at);
            revoked += 1;
        }
        Ok(revoked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{fingerprint, ClientMetadata};

    fn identity(email: &str) -> Identity {
        Identity::new(email.to_string(), "Test".into(), "User".into(), "hash".into())
    }

    fn record(user_id: Uuid, token: &str) -> RefreshTokenRecord {
        RefreshTokenRecord::new(user_id, token, Utc::now(), 3600, ClientMetadata::default())
    }

    #[tokio::test]
    async fn test_credential_insert_and_lookup() {
        let store = InMemoryCredentialStore::new();
        let alice = store.insert(identity("alice@example.com")).await.unwrap();

        let by_email = store.find_by_email("alice@example.com").await.unwrap().unwrap();
        let by_id = store.find_by_id(alice.id).await.unwrap().unwrap();
        assert_eq!(by_email.id, alice.id);
        assert_eq!(by_id.email, "alice@example.com");
    }

    #[tokio::test]
    async fn test_email_lookup_is_case_sensitive() {
        let store = InMemoryCredentialStore::new();
        store.insert(identity("alice@example.com")).await.unwrap();

        assert!(store.find_by_email("Alice@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = InMemoryCredentialStore::new();
        store.insert(identity("alice@example.com")).await.unwrap();

        let result = store.insert(identity("alice@example.com")).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_compare_and_set_used_succeeds_once() {
        let store = InMemoryTokenRecordStore::new();
        let record = record(Uuid::new_v4(), "token");
        let id = record.id;
        store.insert(record).await.unwrap();

        assert!(store.compare_and_set_used(id, Utc::now()).await.unwrap());
        assert!(!store.compare_and_set_used(id, Utc::now()).await.unwrap());

        let stored = store
            .find_by_token(&fingerprint("token"), RecordFilter::Any)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.is_used);
        assert!(stored.used_at.is_some());
    }

    #[tokio::test]
    async fn test_compare_and_set_used_refuses_revoked() {
        let store = InMemoryTokenRecordStore::new();
        let record = record(Uuid::new_v4(), "token");
        let id = record.id;
        store.insert(record).await.unwrap();

        store.set_revoked(id, Utc::now()).await.unwrap();
        assert!(!store.compare_and_set_used(id, Utc::now()).await.unwrap());
    }

    #[tokio::test]
    async fn test_compare_and_set_used_unknown_id() {
        let store = InMemoryTokenRecordStore::new();
        assert!(!store.compare_and_set_used(Uuid::new_v4(), Utc::now()).await.unwrap());
    }

    #[tokio::test]
    async fn test_find_by_token_filter() {
        let store = InMemoryTokenRecordStore::new();
        let record = record(Uuid::new_v4(), "token");
        let id = record.id;
        store.insert(record).await.unwrap();
        store.set_revoked(id, Utc::now()).await.unwrap();

        let hash = fingerprint("token");
        assert!(store.find_by_token(&hash, RecordFilter::NotRevoked).await.unwrap().is_none());
        assert!(store.find_by_token(&hash, RecordFilter::Any).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_duplicate_token_rejected() {
        let store = InMemoryTokenRecordStore::new();
        let user_id = Uuid::new_v4();
        store.insert(record(user_id, "token")).await.unwrap();

        assert!(store.insert(record(user_id, "token")).await.is_err());
    }

    #[tokio::test]
    async fn test_bulk_revoke_only_touches_owner() {
        let store = InMemoryTokenRecordStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        store.insert(record(alice, "a1")).await.unwrap();
        store.insert(record(alice, "a2")).await.unwrap();
        store.insert(record(bob, "b1")).await.unwrap();

        assert_eq!(store.bulk_set_revoked_for_identity(alice, Utc::now()).await.unwrap(), 2);
        assert_eq!(store.bulk_set_revoked_for_identity(alice, Utc::now()).await.unwrap(), 0);

        assert!(store.records_for(alice).iter().all(|r| r.is_revoked));
        assert!(store.records_for(bob).iter().all(|r| !r.is_revoked));
    }
}
