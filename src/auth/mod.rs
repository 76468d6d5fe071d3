/// Authentication module
///
/// Token lifecycle core: credential verification, token issuance,
/// one-time refresh rotation and revocation, composed by `AuthService`.

mod claims;
mod credentials;
mod issuer;
mod jwt;
mod password;
mod revocation;
mod rotation;
mod service;

pub use claims::Claims;
pub use credentials::CredentialVerifier;
pub use issuer::TokenIssuer;
pub use jwt::TokenCodec;
pub use password::hash_password;
pub use password::verify_password;
pub use revocation::RevocationService;
pub use rotation::{RotationError, RotationProtocol};
pub use service::AuthService;
