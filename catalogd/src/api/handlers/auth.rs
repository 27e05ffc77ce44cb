//! Registration and login. Login is the only place tokens are issued.

use axum::extract::State;
use tracing::{info, warn};

use crate::{
    AppState,
    api::{
        extract::JsonBody,
        models::{
            auth::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, TokenResponse},
            users::{Role, UserResponse},
        },
    },
    auth::{
        password::{self, Argon2Params},
        token::IdentityClaims,
    },
    db::{
        handlers::{Accounts, Repository},
        models::accounts::AccountCreateDBRequest,
    },
    errors::{Error, Result},
};

/// Register a new account
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    tag = "authentication",
    responses(
        (status = 201, description = "Account registered", body = UserResponse),
        (status = 400, description = "Invalid input, duplicate username or registration disabled"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn register(State(state): State<AppState>, JsonBody(request): JsonBody<RegisterRequest>) -> Result<RegisterResponse> {
    let registration = &state.config.auth.registration;
    if !registration.enabled {
        return Err(Error::BadRequest {
            message: "User registration is disabled".to_string(),
        });
    }

    let username = request.username.trim().to_string();
    if username.is_empty() {
        return Err(Error::BadRequest {
            message: "Username must not be empty".to_string(),
        });
    }

    // Validate password length
    let password_config = &state.config.auth.password;
    let password_length = request.password.chars().count();
    if password_length < password_config.min_length {
        return Err(Error::BadRequest {
            message: format!("Password must be at least {} characters", password_config.min_length),
        });
    }
    if password_length > password_config.max_length {
        return Err(Error::BadRequest {
            message: format!("Password must be no more than {} characters", password_config.max_length),
        });
    }

    let role = match request.role {
        Some(role) if role != Role::User && !registration.allow_role_selection => {
            return Err(Error::BadRequest {
                message: "Choosing a role at registration is disabled".to_string(),
            });
        }
        Some(role) => role,
        None => Role::User,
    };

    {
        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        if Accounts::new(&mut conn).get_by_username(&username).await?.is_some() {
            return Err(Error::Conflict {
                message: format!("Username '{username}' is already taken"),
            });
        }
    }

    // Hash the password on a blocking thread, holding no connection
    let params = Argon2Params::from(password_config);
    let password = request.password;
    let password_hash = tokio::task::spawn_blocking(move || password::hash_string_with_params(&password, Some(params)))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password hashing task: {e}"),
        })??;

    // A concurrent registration of the same name surfaces here as a unique violation
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let created = Accounts::new(&mut conn)
        .create(&AccountCreateDBRequest {
            username,
            password_hash,
            role,
        })
        .await?;

    info!(username = %created.username, role = %created.role, "Registered account");
    Ok(RegisterResponse(UserResponse::from(created)))
}

/// Log in and receive a bearer token
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Token issued, or the plain-text body `Incorrect password`", body = TokenResponse),
        (status = 400, description = "User not found or invalid input"),
        (status = 500, description = "Internal server error"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, JsonBody(request): JsonBody<LoginRequest>) -> Result<LoginResponse> {
    let account = {
        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        Accounts::new(&mut conn).get_by_username(request.username.trim()).await?
    }
    .ok_or_else(|| Error::BadRequest {
        message: "User not found".to_string(),
    })?;

    let password = request.password;
    let password_hash = account.password_hash.clone();
    let verified = tokio::task::spawn_blocking(move || password::verify_string(&password, &password_hash))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password verification task: {e}"),
        })?;

    let matches = verified.unwrap_or_else(|e| {
        // An unusable stored hash never matches
        warn!(username = %account.username, error = %e, "Stored password hash could not be verified");
        false
    });

    if !matches {
        info!(username = %account.username, "Login failed: incorrect password");
        return Ok(LoginResponse::IncorrectPassword);
    }

    let access_token = state.tokens.issue(&IdentityClaims {
        username: account.username.clone(),
        role: account.role,
    })?;

    info!(username = %account.username, role = %account.role, "Issued token");
    Ok(LoginResponse::Authenticated(TokenResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: state.tokens.expiry().map(|expiry| expiry.as_secs()),
    }))
}
