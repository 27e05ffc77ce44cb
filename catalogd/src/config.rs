//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `CATALOGD_CONFIG`
//! environment variable. A missing file is not an error: every field has a default except
//! `secret_key`, which must come from somewhere.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `CATALOGD_` override YAML values
//! 3. **Conventional variables** - `DATABASE_URL`, `PORT` and `JWT_SECRET` (mapped to
//!    `secret_key`)
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `CATALOGD_AUTH__SECURITY__JWT_EXPIRY=1h` sets the `auth.security.jwt_expiry` field.
//!
//! ## Configuration Structure
//!
//! - **Server**: `host`, `port`, `log_format`
//! - **Database**: `database.url`, `database.pool` - SQLite connection settings
//! - **Admin User**: `admin_username`, `admin_password` - Admin account ensured on startup
//! - **Authentication**: `auth.registration`, `auth.password` - Registration and hashing policy
//! - **Security**: `secret_key`, `auth.security.jwt_*`, `auth.security.cors` - Token and CORS settings
//! - **Access**: `access.products` - Roles allowed to mutate products
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! # Signing secret (required)
//! JWT_SECRET="change-me"
//!
//! # Override server port
//! PORT=8080
//!
//! # Set database connection
//! DATABASE_URL="sqlite:///var/lib/catalogd/catalog.db"
//!
//! # Let moderators create products
//! CATALOGD_ACCESS__PRODUCTS__CREATE='[admin, moderator]'
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use url::Url;

use crate::api::models::users::Role;
use crate::auth::password::Argon2Params;
use crate::errors::Error;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "CATALOGD_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// This is the root configuration structure loaded from YAML and environment variables.
/// All fields have sensible defaults defined in the `Default` implementation.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Log output format
    pub log_format: LogFormat,
    /// Optional: overrides `database.url`, usually set through DATABASE_URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Secret key for token signing. Required, there is no built-in fallback.
    #[serde(skip_serializing)]
    pub secret_key: Option<String>,
    /// Username of the admin account ensured on startup (skipped when unset)
    pub admin_username: Option<String>,
    /// Password for the admin account
    #[serde(skip_serializing)]
    pub admin_password: Option<String>,
    /// Authentication configuration
    pub auth: AuthConfig,
    /// Role allow-lists for configurable routes
    pub access: AccessConfig,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = |value: &Option<String>| value.as_ref().map(|_| "<redacted>");
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("log_format", &self.log_format)
            .field("database_url", &self.database_url)
            .field("database", &self.database)
            .field("secret_key", &redacted(&self.secret_key))
            .field("admin_username", &self.admin_username)
            .field("admin_password", &redacted(&self.admin_password))
            .field("auth", &self.auth)
            .field("access", &self.access)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// SQLite connection string; the file is created if it does not exist
    pub url: String,
    /// Connection pool settings
    pub pool: PoolSettings,
}

/// Connection pool settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolSettings {
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of idle connections to maintain
    pub min_connections: u32,
    /// Maximum time to wait for a connection (seconds)
    pub acquire_timeout_secs: u64,
    /// Time before idle connections are closed (seconds, 0 = never)
    pub idle_timeout_secs: u64,
    /// Maximum lifetime of a connection (seconds, 0 = never)
    pub max_lifetime_secs: u64,
}

/// Authentication configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// Self-service registration
    pub registration: RegistrationConfig,
    /// Password length policy and hashing work factor
    pub password: PasswordConfig,
    /// Token and CORS settings
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistrationConfig {
    /// Accept `POST /auth/register`
    pub enabled: bool,
    /// Honour the optional `role` field of a registration request. When false every
    /// self-registered account gets the `user` role.
    pub allow_role_selection: bool,
}

/// Password policy and Argon2 parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PasswordConfig {
    /// Minimum password length in characters
    pub min_length: usize,
    /// Maximum password length in characters
    pub max_length: usize,
    /// Argon2 memory cost in KiB
    pub argon2_memory_kib: u32,
    /// Argon2 time cost (iterations)
    pub argon2_iterations: u32,
    /// Argon2 parallelism
    pub argon2_parallelism: u32,
}

/// Token signing and CORS settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SecurityConfig {
    /// HMAC algorithm used to sign tokens (HS256, HS384 or HS512)
    pub jwt_algorithm: Algorithm,
    /// Token lifetime; `null` issues tokens without an expiry claim
    #[serde(with = "humantime_serde")]
    pub jwt_expiry: Option<Duration>,
    /// CORS settings
    pub cors: CorsConfig,
}

/// CORS (Cross-Origin Resource Sharing) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins for CORS requests
    pub allowed_origins: Vec<CorsOrigin>,
    /// Allow credentials in CORS requests
    pub allow_credentials: bool,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

/// CORS origin specification.
///
/// Can be either a wildcard (`*`) to allow all origins, or a specific URL.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CorsOrigin {
    /// Allow all origins (`*`)
    #[serde(deserialize_with = "parse_wildcard")]
    Wildcard,
    /// Specific origin URL (e.g., `https://shop.example.com`)
    #[serde(deserialize_with = "parse_url")]
    Url(Url),
}

fn parse_wildcard<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    if s == "*" {
        Ok(())
    } else {
        Err(serde::de::Error::custom("Expected '*'"))
    }
}

fn parse_url<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Url::parse(&s).map_err(serde::de::Error::custom)
}

/// Role allow-lists resolved when the router is built.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AccessConfig {
    pub products: ProductAccess,
}

/// Roles allowed to mutate products. Reading is open to every authenticated role.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProductAccess {
    pub create: Vec<Role>,
    pub update: Vec<Role>,
    pub delete: Vec<Role>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_format: LogFormat::default(),
            database_url: None,
            database: DatabaseConfig::default(),
            secret_key: None,
            admin_username: None,
            admin_password: None,
            auth: AuthConfig::default(),
            access: AccessConfig::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://catalog.db".to_string(),
            pool: PoolSettings::default(),
        }
    }
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 5,
            min_connections: 0,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,  // 10 minutes
            max_lifetime_secs: 1800, // 30 minutes
        }
    }
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allow_role_selection: true,
        }
    }
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            min_length: 1,
            max_length: 128,
            // Secure defaults for production (Argon2id RFC recommendations)
            argon2_memory_kib: 19456, // 19 MB
            argon2_iterations: 2,
            argon2_parallelism: 1,
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            jwt_algorithm: Algorithm::HS256,
            jwt_expiry: Some(Duration::from_secs(24 * 60 * 60)), // 24 hours
            cors: CorsConfig::default(),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![CorsOrigin::Wildcard],
            allow_credentials: false,
            max_age: Some(3600), // Cache preflight for 1 hour
        }
    }
}

impl Default for ProductAccess {
    fn default() -> Self {
        Self {
            create: vec![Role::Admin],
            update: vec![Role::Admin],
            delete: vec![Role::Admin],
        }
    }
}

impl Config {
    /// Load configuration from the file named in `args` and the environment, then validate it.
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let mut config: Self = Self::figment(args).extract()?;

        // DATABASE_URL wins over the file, keeping the configured pool settings
        if let Some(url) = config.database_url.take() {
            config.database.url = url;
        }

        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can still override specific values
            .merge(Env::prefixed("CATALOGD_").ignore(&["config"]).split("__"))
            // Conventional variables used by container platforms
            .merge(Env::raw().only(&["DATABASE_URL", "PORT"]))
            .merge(Env::raw().only(&["JWT_SECRET"]).map(|_| "secret_key".into()))
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        match self.secret_key.as_deref() {
            Some(secret) if !secret.trim().is_empty() => {}
            _ => {
                return Err(Error::Internal {
                    operation: "Config validation: secret_key is required to sign tokens. Set it in the config file, \
                                CATALOGD_SECRET_KEY or JWT_SECRET."
                        .to_string(),
                });
            }
        }

        let password = &self.auth.password;
        if password.min_length < 1 {
            return Err(Error::Internal {
                operation: "Config validation: Invalid password configuration: min_length must be at least 1".to_string(),
            });
        }
        if password.min_length > password.max_length {
            return Err(Error::Internal {
                operation: format!(
                    "Config validation: Invalid password configuration: min_length ({}) cannot be greater than max_length ({})",
                    password.min_length, password.max_length
                ),
            });
        }
        Argon2Params::from(password).validate().map_err(|e| Error::Internal {
            operation: format!("Config validation: Invalid password configuration: {e}"),
        })?;

        if !matches!(
            self.auth.security.jwt_algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(Error::Internal {
                operation: format!(
                    "Config validation: jwt_algorithm {:?} is not supported, use HS256, HS384 or HS512",
                    self.auth.security.jwt_algorithm
                ),
            });
        }

        // Validate JWT expiry duration is reasonable
        if let Some(expiry) = self.auth.security.jwt_expiry {
            if expiry.as_secs() < 300 {
                return Err(Error::Internal {
                    operation: "Config validation: JWT expiry duration is too short (minimum 5 minutes)".to_string(),
                });
            }
            if expiry.as_secs() > 86400 * 30 {
                return Err(Error::Internal {
                    operation: "Config validation: JWT expiry duration is too long (maximum 30 days)".to_string(),
                });
            }
        }

        // Validate CORS configuration
        let cors = &self.auth.security.cors;
        if cors.allowed_origins.is_empty() {
            return Err(Error::Internal {
                operation: "Config validation: CORS allowed_origins cannot be empty. Add at least one allowed origin.".to_string(),
            });
        }
        let has_wildcard = cors.allowed_origins.iter().any(|origin| matches!(origin, CorsOrigin::Wildcard));
        if has_wildcard && cors.allow_credentials {
            return Err(Error::Internal {
                operation: "Config validation: CORS cannot use wildcard origin '*' with allow_credentials=true. Specify explicit origins."
                    .to_string(),
            });
        }

        let products = &self.access.products;
        for (operation, roles) in [("create", &products.create), ("update", &products.update), ("delete", &products.delete)] {
            if roles.is_empty() {
                return Err(Error::Internal {
                    operation: format!("Config validation: access.products.{operation} must allow at least one role"),
                });
            }
        }

        if self.admin_password.is_some() && self.admin_username.is_none() {
            return Err(Error::Internal {
                operation: "Config validation: admin_password is set but admin_username is not".to_string(),
            });
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
