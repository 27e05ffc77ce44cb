//! Database models for accounts.

use crate::api::models::users::Role;
use crate::types::AccountId;
use chrono::{DateTime, Utc};

/// Database request for creating a new account
#[derive(Debug, Clone)]
pub struct AccountCreateDBRequest {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
}

/// Database request for updating an account. `None` leaves the column unchanged.
#[derive(Debug, Clone, Default)]
pub struct AccountUpdateDBRequest {
    pub role: Option<Role>,
    pub password_hash: Option<String>,
}

impl AccountUpdateDBRequest {
    pub fn role(role: Role) -> Self {
        Self {
            role: Some(role),
            password_hash: None,
        }
    }
}

/// Database response for an account
#[derive(Debug, Clone)]
pub struct AccountDBResponse {
    pub id: AccountId,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
