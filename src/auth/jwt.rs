/// JWT signing and verification
///
/// `TokenCodec` owns one key pair per token kind. Access and refresh tokens
/// share a claim layout but are signed with different secrets, so a refresh
/// token never verifies as an access token and vice versa.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::claims::Claims;
use crate::configuration::AuthSettings;
use crate::domain::Identity;
use crate::error::{AppError, AuthError};

#[derive(Clone)]
struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

#[derive(Clone)]
pub struct TokenCodec {
    access: KeyPair,
    refresh: KeyPair,
    issuer: String,
    access_ttl: i64,
    refresh_ttl: i64,
}

impl TokenCodec {
    /// Build a codec from validated settings.
    ///
    /// # Errors
    /// Returns `AppError::Config` if the settings are unusable (for example
    /// identical access and refresh secrets).
    pub fn new(config: &AuthSettings) -> Result<Self, AppError> {
        config.validate()?;
        Ok(Self {
            access: KeyPair::from_secret(&config.access_secret),
            refresh: KeyPair::from_secret(&config.refresh_secret),
            issuer: config.issuer.clone(),
            access_ttl: config.access_token_expiry,
            refresh_ttl: config.refresh_token_expiry,
        })
    }

    pub fn access_ttl(&self) -> i64 {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> i64 {
        self.refresh_ttl
    }

    pub fn encode_access(&self, identity: &Identity) -> Result<String, AppError> {
        self.sign(identity, self.access_ttl, &self.access)
    }

    pub fn encode_refresh(&self, identity: &Identity) -> Result<String, AppError> {
        self.sign(identity, self.refresh_ttl, &self.refresh)
    }

    /// Validate an access token and return its claims
    ///
    /// # Errors
    /// `TokenInvalid` if the token is malformed, tampered with, expired,
    /// from another issuer, or signed with the refresh secret
    pub fn decode_access(&self, token: &str) -> Result<Claims, AppError> {
        self.verify(token, &self.access)
    }

    /// Validate a refresh token's signature, issuer and expiry.
    pub fn decode_refresh(&self, token: &str) -> Result<Claims, AppError> {
        self.verify(token, &self.refresh)
    }

    fn sign(&self, identity: &Identity, ttl: i64, keys: &KeyPair) -> Result<String, AppError> {
        let claims = Claims::new(identity.id, identity.email.clone(), ttl, self.issuer.clone());
        Ok(encode(&Header::default(), &claims, &keys.encoding)?)
    }

    fn verify(&self, token: &str, keys: &KeyPair) -> Result<Claims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);
        validation.leeway = 0;

        decode::<Claims>(token, &keys.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("JWT validation error: {}", e);
                AppError::Auth(AuthError::TokenInvalid)
            })
    }
}
