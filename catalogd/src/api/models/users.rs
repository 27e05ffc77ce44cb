use crate::db::models::accounts::AccountDBResponse;
use crate::types::AccountId;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Role attached to every account and carried inside identity tokens.
///
/// Stored and serialized lowercase (`user`, `admin`, `moderator`). Anything else fails to
/// deserialize, so an unknown role never reaches a handler or a route allow-list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
    Moderator,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::User, Role::Admin, Role::Moderator];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::Moderator => "moderator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity decoded from a verified bearer token, attached to the request by the auth middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub username: String,
    pub role: Role,
}

/// Public view of an account. Never includes the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: AccountId,
    pub username: String,
    pub role: Role,
}

impl From<AccountDBResponse> for UserResponse {
    fn from(db: AccountDBResponse) -> Self {
        Self {
            id: db.id,
            username: db.username,
            role: db.role,
        }
    }
}

/// Body of `PUT /users/{id}/role`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct RoleUpdate {
    pub role: Role,
}
