use crate::error::ConfigError;

// bcrypt accepts work factors in this range
const MIN_HASH_COST: u32 = 4;
const MAX_HASH_COST: u32 = 31;

// Ten years; keeps `now + expiry` well inside chrono's range
const MAX_TOKEN_EXPIRY: i64 = 10 * 365 * 24 * 60 * 60;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub auth: AuthSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }

    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }
}

/// Token signing and password hashing settings
///
/// Access and refresh tokens are signed with different secrets so that
/// holding one kind of token never lets a caller forge the other.
#[derive(serde::Deserialize, Clone)]
pub struct AuthSettings {
    pub access_secret: String,
    pub refresh_secret: String,
    pub issuer: String,
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry: i64,   // seconds
    #[serde(default = "default_refresh_token_expiry")]
    pub refresh_token_expiry: i64,  // seconds
    #[serde(default = "default_password_hash_cost")]
    pub password_hash_cost: u32,
}

impl AuthSettings {
    /// Reject settings that would weaken token separation or produce
    /// tokens that are already expired when minted.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.access_secret.is_empty() {
            return Err(ConfigError::MissingRequired("auth.access_secret".to_string()));
        }
        if self.refresh_secret.is_empty() {
            return Err(ConfigError::MissingRequired("auth.refresh_secret".to_string()));
        }
        if self.access_secret == self.refresh_secret {
            return Err(ConfigError::InvalidValue(
                "auth.access_secret and auth.refresh_secret must differ".to_string(),
            ));
        }
        for (name, expiry) in [
            ("auth.access_token_expiry", self.access_token_expiry),
            ("auth.refresh_token_expiry", self.refresh_token_expiry),
        ] {
            if !(1..=MAX_TOKEN_EXPIRY).contains(&expiry) {
                return Err(ConfigError::InvalidValue(format!(
                    "{} must be between 1 and {} seconds",
                    name, MAX_TOKEN_EXPIRY
                )));
            }
        }
        if !(MIN_HASH_COST..=MAX_HASH_COST).contains(&self.password_hash_cost) {
            return Err(ConfigError::InvalidValue(format!(
                "auth.password_hash_cost must be between {} and {}",
                MIN_HASH_COST, MAX_HASH_COST
            )));
        }
        Ok(())
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_access_token_expiry() -> i64 {
    300
}

fn default_refresh_token_expiry() -> i64 {
    30 * 24 * 60 * 60
}

fn default_password_hash_cost() -> u32 {
    10
}

/// Load settings from an optional `configuration` file, overridden by
/// `APP_`-prefixed environment variables (e.g. `APP_AUTH__ACCESS_SECRET`).
pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;
    settings.try_deserialize::<Settings>()
}
