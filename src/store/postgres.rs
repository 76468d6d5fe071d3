use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Identity, RecordFilter, RefreshTokenRecord};
use crate::error::{AppError, DatabaseError};
use crate::store::{CredentialStore, TokenRecordStore};

pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, AppError> {
        let identity = sqlx::query_as::<_, Identity>(
            r#"
            SELECT id, email, first_name, last_name, password_hash, is_active, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(identity)
    }

    async fn insert(&self, identity: Identity) -> Result<Identity, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (id, email, first_name, last_name, password_hash, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(identity.id)
        .bind(&identity.email)
        .bind(&identity.first_name)
        .bind(&identity.last_name)
        .bind(&identity.password_hash)
        .bind(identity.is_active)
        .bind(identity.created_at)
        .bind(identity.updated_at)
        .execute(&self.pool)
        .await;

        match result.map_err(AppError::from) {
            Ok(_) => Ok(identity),
            Err(AppError::Database(DatabaseError::UniqueConstraintViolation(_))) => Err(
                AppError::Conflict("User with this email already exists".to_string()),
            ),
            Err(e) => Err(e),
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>, AppError> {
        let identity = sqlx::query_as::<_, Identity>(
            r#"
            SELECT id, email, first_name, last_name, password_hash, is_active, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(identity)
    }
}

pub struct PgTokenRecordStore {
    pool: PgPool,
}

impl PgTokenRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenRecordStore for PgTokenRecordStore {
    async fn insert(&self, record: RefreshTokenRecord) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens
                (id, token_hash, user_id, is_used, is_revoked, ip_address, user_agent, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(record.id)
        .bind(&record.token_hash)
        .bind(record.user_id)
        .bind(record.is_used)
        .bind(record.is_revoked)
        .bind(&record.ip_address)
        .bind(&record.user_agent)
        .bind(record.created_at)
        .bind(record.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_token(
        &self,
        token_hash: &str,
        filter: RecordFilter,
    ) -> Result<Option<RefreshTokenRecord>, AppError> {
        let only_active = filter == RecordFilter::NotRevoked;

        let record = sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            SELECT id, token_hash, user_id, is_used, is_revoked, ip_address, user_agent,
                   created_at, expires_at, used_at, revoked_at
            FROM refresh_tokens
            WHERE token_hash = $1 AND (NOT $2 OR is_revoked = false)
            "#,
        )
        .bind(token_hash)
        .bind(only_active)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn compare_and_set_used(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET is_used = true, used_at = $2
            WHERE id = $1 AND is_used = false AND is_revoked = false
            "#,
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn set_revoked(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET is_revoked = true, revoked_at = COALESCE(revoked_at, $2)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn bulk_set_revoked_for_identity(
        &self,
        identity_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET is_revoked = true, revoked_at = $2
            WHERE user_id = $1 AND is_revoked = false
            "#,
        )
        .bind(identity_id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
