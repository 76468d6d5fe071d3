mod identity;
mod refresh_token;
mod token_pair;

pub use identity::{Identity, NewAccount};
pub use refresh_token::{fingerprint, ClientMetadata, RecordFilter, RefreshTokenRecord};
pub use token_pair::TokenPair;
