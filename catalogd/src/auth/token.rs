//! Identity token issuance and verification.
//!
//! Tokens are HMAC-signed JWTs carrying `{username, role, iat, exp?}`. Nothing is stored
//! server-side: verification depends only on the token bytes and the configured secret, and a
//! token stays valid until it expires (logging out just discards it on the client).

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    api::models::users::{CurrentUser, Role},
    config::Config,
    errors::Error,
};

/// Identity attributes encoded into a token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityClaims {
    pub username: String,
    pub role: Role,
}

/// Wire format of the token payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub username: String,
    pub role: Role,
    pub iat: i64, // Issued at
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>, // Expiration time
}

impl From<TokenClaims> for CurrentUser {
    fn from(claims: TokenClaims) -> Self {
        Self {
            username: claims.username,
            role: claims.role,
        }
    }
}

impl From<&TokenClaims> for IdentityClaims {
    fn from(claims: &TokenClaims) -> Self {
        Self {
            username: claims.username.clone(),
            role: claims.role,
        }
    }
}

/// Why a token was rejected. Callers answer every variant the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("token signature does not match")]
    BadSignature,
    #[error("token is malformed")]
    Malformed,
}

/// Signs and verifies identity tokens with the process-wide secret.
#[derive(Clone)]
pub struct TokenService {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry: Option<Duration>,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Keys stay out of logs
        f.debug_struct("TokenService")
            .field("algorithm", &self.algorithm)
            .field("expiry", &self.expiry)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: &[u8], algorithm: Algorithm, expiry: Option<Duration>) -> Self {
        Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            expiry,
        }
    }

    /// Build the service from validated configuration. Fails if no secret is configured.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let secret_key = config
            .secret_key
            .as_deref()
            .filter(|secret| !secret.trim().is_empty())
            .ok_or_else(|| Error::Internal {
                operation: "create token service: secret_key is required".to_string(),
            })?;

        Ok(Self::new(
            secret_key.as_bytes(),
            config.auth.security.jwt_algorithm,
            config.auth.security.jwt_expiry,
        ))
    }

    /// Lifetime of issued tokens, if they expire
    pub fn expiry(&self) -> Option<Duration> {
        self.expiry
    }

    /// Issue a signed token for the given identity, stamped with the current time
    pub fn issue(&self, claims: &IdentityClaims) -> Result<String, Error> {
        let now = Utc::now().timestamp();
        let exp = self.expiry.map(|expiry| now.saturating_add(i64::try_from(expiry.as_secs()).unwrap_or(i64::MAX)));

        let claims = TokenClaims {
            username: claims.username.clone(),
            role: claims.role,
            iat: now,
            exp,
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key).map_err(|e| Error::Internal {
            operation: format!("create JWT: {e}"),
        })
    }

    /// Verify a token's signature and, when present, its expiry
    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        // `exp` is optional; when present it is still enforced
        validation.required_spec_claims.clear();
        validation.validate_exp = true;
        validation.leeway = 0;

        decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                _ => TokenError::Malformed,
            })
    }
}
