//! Test utilities shared by unit and integration tests.

use crate::api::models::users::Role;
use crate::auth::{password, token::IdentityClaims};
use crate::config::{Config, PasswordConfig};
use crate::db::handlers::{Accounts, Repository};
use crate::db::models::accounts::{AccountCreateDBRequest, AccountDBResponse};
use crate::{AppState, auth::token::TokenService};
use axum_test::TestServer;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

pub const TEST_SECRET: &str = "test-secret-key-for-jwt";

pub fn create_test_config() -> Config {
    let mut config = Config {
        secret_key: Some(TEST_SECRET.to_string()),
        ..Default::default()
    };
    // Cheap hashing keeps the suite fast
    config.auth.password = PasswordConfig {
        argon2_memory_kib: 1024,
        argon2_iterations: 1,
        argon2_parallelism: 1,
        ..Default::default()
    };
    config
}

/// Fresh in-memory database with migrations applied.
///
/// An in-memory SQLite database lives as long as its connection, so the pool holds exactly one
/// connection that is never recycled.
pub async fn create_test_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("valid in-memory url")
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("Failed to open in-memory database");
    crate::migrator().run(&pool).await.expect("Failed to run migrations");
    pool
}

pub fn create_test_app_state(pool: SqlitePool) -> AppState {
    create_test_app_state_with_config(pool, create_test_config())
}

pub fn create_test_app_state_with_config(pool: SqlitePool, config: Config) -> AppState {
    let tokens = TokenService::from_config(&config).expect("test config has a secret");
    AppState::builder().db(pool).config(config).tokens(tokens).build()
}

/// Full application router (all routes and middleware) over the given pool
pub async fn create_test_app(pool: SqlitePool) -> TestServer {
    create_test_app_with_config(pool, create_test_config()).await
}

pub async fn create_test_app_with_config(pool: SqlitePool, config: Config) -> TestServer {
    crate::Application::new_with_pool(config, pool)
        .await
        .expect("Failed to create application")
        .into_test_server()
}

/// Insert an account directly, bypassing registration
pub async fn create_test_account(pool: &SqlitePool, username: &str, password: &str, role: Role) -> AccountDBResponse {
    let params = password::Argon2Params::from(&create_test_config().auth.password);
    let password_hash = password::hash_string_with_params(password, Some(params)).expect("Failed to hash password");

    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    Accounts::new(&mut conn)
        .create(&AccountCreateDBRequest {
            username: username.to_string(),
            password_hash,
            role,
        })
        .await
        .expect("Failed to create test account")
}

/// Token signed with the test secret for an arbitrary identity
pub fn token_for(username: &str, role: Role) -> String {
    TokenService::from_config(&create_test_config())
        .expect("test config has a secret")
        .issue(&IdentityClaims {
            username: username.to_string(),
            role,
        })
        .expect("Failed to issue token")
}
