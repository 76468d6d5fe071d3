use std::sync::Arc;

use crate::auth::password::verify_password;
use crate::domain::Identity;
use crate::error::AppError;
use crate::store::CredentialStore;

/// Checks an email/password pair against the credential store.
///
/// Unknown email, wrong password and inactive account all come back as
/// `None`; callers cannot tell them apart.
pub struct CredentialVerifier {
    credentials: Arc<dyn CredentialStore>,
}

impl CredentialVerifier {
    pub fn new(credentials: Arc<dyn CredentialStore>) -> Self {
        Self { credentials }
    }

    pub async fn verify(&self, email: &str, password: &str) -> Result<Option<Identity>, AppError> {
        let identity = match self.credentials.find_by_email(email).await? {
            Some(identity) => identity,
            None => return Ok(None),
        };

        if !verify_password(password, &identity.password_hash)? {
            tracing::debug!(user_id = %identity.id, "Password mismatch");
            return Ok(None);
        }

        if !identity.is_active {
            tracing::info!(user_id = %identity.id, "Login attempt for inactive account");
            return Ok(None);
        }

        Ok(Some(identity))
    }
}
