use crate::api::models::users::{Role, UserResponse};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    /// Requested role, defaults to `user`
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Issued bearer token
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    /// Seconds until the token expires, `null` when tokens do not expire
    pub expires_in: Option<u64>,
}

/// Outcome of a login attempt that did not fail with an error
#[derive(Debug)]
pub enum LoginResponse {
    Authenticated(TokenResponse),
    /// Known account, wrong password. Reported with 200 and a plain-text body.
    IncorrectPassword,
}

pub const INCORRECT_PASSWORD: &str = "Incorrect password";

impl IntoResponse for LoginResponse {
    fn into_response(self) -> Response {
        match self {
            LoginResponse::Authenticated(token) => (StatusCode::OK, Json(token)).into_response(),
            LoginResponse::IncorrectPassword => (StatusCode::OK, INCORRECT_PASSWORD).into_response(),
        }
    }
}

pub struct RegisterResponse(pub UserResponse);

impl IntoResponse for RegisterResponse {
    fn into_response(self) -> Response {
        (StatusCode::CREATED, Json(self.0)).into_response()
    }
}
