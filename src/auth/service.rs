use std::sync::Arc;

use uuid::Uuid;

use crate::auth::credentials::CredentialVerifier;
use crate::auth::issuer::TokenIssuer;
use crate::auth::jwt::TokenCodec;
use crate::auth::password::hash_password;
use crate::auth::revocation::RevocationService;
use crate::auth::rotation::RotationProtocol;
use crate::configuration::AuthSettings;
use crate::domain::{ClientMetadata, Identity, NewAccount, TokenPair};
use crate::error::{AppError, AuthError, ErrorContext};
use crate::store::{CredentialStore, TokenRecordStore};
use crate::validators::{is_valid_email, is_valid_name};

/// Entry point for the transport layer: register, login, refresh, logout.
pub struct AuthService {
    codec: Arc<TokenCodec>,
    credentials: Arc<dyn CredentialStore>,
    verifier: CredentialVerifier,
    issuer: Arc<TokenIssuer>,
    rotation: RotationProtocol,
    revocation: RevocationService,
    password_hash_cost: u32,
}

impl AuthService {
    /// Wire the token lifecycle components over the given stores.
    ///
    /// # Errors
    /// Returns `AppError::Config` if `settings` fail validation
    pub fn new(
        settings: &AuthSettings,
        credentials: Arc<dyn CredentialStore>,
        records: Arc<dyn TokenRecordStore>,
    ) -> Result<Self, AppError> {
        let codec = Arc::new(TokenCodec::new(settings)?);
        let issuer = Arc::new(TokenIssuer::new(codec.clone(), records.clone()));

        Ok(Self {
            verifier: CredentialVerifier::new(credentials.clone()),
            rotation: RotationProtocol::new(codec.clone(), records.clone(), credentials.clone(), issuer.clone()),
            revocation: RevocationService::new(records),
            codec,
            credentials,
            issuer,
            password_hash_cost: settings.password_hash_cost,
        })
    }

    /// Verifies access tokens for protected routes.
    pub fn codec(&self) -> Arc<TokenCodec> {
        self.codec.clone()
    }

    /// # Errors
    /// - `Validation` for malformed email, names or password
    /// - `Conflict` if the email is already registered
    pub async fn register(&self, account: NewAccount, client: ClientMetadata) -> Result<TokenPair, AppError> {
        let context = ErrorContext::new("user_registration");

        let email = is_valid_email(&account.email)?;
        let first_name = is_valid_name("first_name", &account.first_name)?;
        let last_name = is_valid_name("last_name", &account.last_name)?;

        if self.credentials.find_by_email(&email).await?.is_some() {
            let err = AppError::Conflict("User with this email already exists".to_string());
            context.log_error(&err);
            return Err(err);
        }

        let password_hash = hash_password(&account.password, self.password_hash_cost)?;
        let identity = self
            .credentials
            .insert(Identity::new(email, first_name, last_name, password_hash))
            .await?;

        let context = context.with_user_id(identity.id.to_string());
        tracing::info!(
            request_id = %context.request_id,
            user_id = %identity.id,
            "User registered successfully"
        );

        self.issuer.issue(&identity, client).await.map_err(|e| {
            context.log_error(&e);
            e
        })
    }

    /// # Errors
    /// `Unauthorized` for unknown email, wrong password or inactive account
    pub async fn login(&self, email: &str, password: &str, client: ClientMetadata) -> Result<TokenPair, AppError> {
        let context = ErrorContext::new("user_login");

        let identity = match self.verifier.verify(email.trim(), password).await? {
            Some(identity) => identity,
            None => {
                let err = AppError::Auth(AuthError::InvalidCredentials);
                context.log_error(&err);
                return Err(err);
            }
        };

        let context = context.with_user_id(identity.id.to_string());
        tracing::info!(
            request_id = %context.request_id,
            user_id = %identity.id,
            "User logged in successfully"
        );

        self.issuer.issue(&identity, client).await.map_err(|e| {
            context.log_error(&e);
            e
        })
    }

    /// Exchange a refresh token for a new pair. The presented token is
    /// consumed and can never be used again.
    pub async fn refresh(&self, refresh_token: &str, client: ClientMetadata) -> Result<TokenPair, AppError> {
        self.rotation
            .rotate(refresh_token, client)
            .await
            .map_err(AppError::from)
    }

    /// Revoke a refresh token. Unknown or already revoked tokens succeed too.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AppError> {
        self.revocation.revoke_one(refresh_token).await
    }

    /// Revoke every refresh token of `identity_id`.
    pub async fn logout_all(&self, identity_id: Uuid) -> Result<u64, AppError> {
        let context = ErrorContext::new("logout_all").with_user_id(identity_id.to_string());
        self.revocation.revoke_all(identity_id).await.map_err(|e| {
            context.log_error(&e);
            e
        })
    }

    pub async fn profile(&self, identity_id: Uuid) -> Result<Identity, AppError> {
        self.credentials
            .find_by_id(identity_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }
}
