//! # catalogd: Catalog Manager
//!
//! `catalogd` is a REST backend for a product catalog shared by several kinds of account. Anyone
//! may register and log in; every other endpoint requires a signed bearer token, and the role
//! carried inside that token decides which mutations an account may perform.
//!
//! ## Overview
//!
//! The service keeps two collections in SQLite: accounts (username, Argon2 password hash, role)
//! and products (name, price, optional description). Accounts have exactly one of three roles:
//! `user`, `moderator` and `admin`. Every authenticated role can read the catalog. Product
//! mutations are gated by per-route allow-lists taken from configuration (admin only unless an
//! operator opts other roles in), and account administration is always admin only.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for the HTTP layer and
//! uses SQLite through [sqlx](https://github.com/launchbadge/sqlx) for persistence. Migrations are
//! embedded in the binary and run on startup.
//!
//! ### Request Flow
//!
//! ```text
//! ┌──────────┐   ┌───────────────────────┐   ┌──────────────┐   ┌─────────┐   ┌────────┐
//! │  Client  │──►│ require_authentication│──►│ require_role │──►│ Handler │──►│ SQLite │
//! └──────────┘   └───────────────────────┘   └──────────────┘   └─────────┘   └────────┘
//!                  401 no bearer token         403 role not
//!                  403 token rejected          in allow-list
//! ```
//!
//! Public routes (`/auth/register`, `/auth/login`, `/healthz`, `/api-docs/openapi.json`) skip
//! both stages. The authentication middleware never touches the database: identity comes from the
//! verified token alone, so a role change made by an admin applies from the account's next login.
//!
//! ### Core Components
//!
//! - **[`api`]**: HTTP handlers and request/response models
//! - **[`auth`]**: Token service, authentication middleware, role guard and password hashing
//! - **[`db`]**: Repositories over the SQLite pool
//! - **[`config`]**: YAML and environment configuration via figment
//! - **[`errors`]**: The error type every handler returns, with its HTTP mapping
//! - **[`openapi`]**: The OpenAPI document
//! - **[`telemetry`]**: Tracing subscriber setup
//!
//! ## Getting Started
//!
//! ```bash
//! export JWT_SECRET="change-me"
//! catalogd -f config.yaml
//! ```
//!
//! ```ignore
//! use catalogd::{Application, Config, config::Args};
//! use clap::Parser;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(&Args::parse())?;
//!     let app = Application::new(config).await?;
//!     app.serve(async { tokio::signal::ctrl_c().await.unwrap() }).await
//! }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod openapi;
pub mod telemetry;
#[cfg(test)]
pub mod test_utils;
pub mod types;

use std::str::FromStr;
use std::time::Duration;

use api::handlers::{
    auth::{login, register},
    products::{create_product, delete_product, get_product, list_products, update_product},
    users::{list_users, update_user_role},
};
use api::models::users::Role;
use auth::{
    middleware::require_authentication,
    password::{self, Argon2Params},
    permissions::{ADMIN_ONLY, with_roles},
    token::TokenService,
};
use axum::{
    Json, Router,
    http::{self, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
};
use bon::Builder;
use config::CorsOrigin;
pub use config::Config;
use db::handlers::{Accounts, Repository};
use db::models::accounts::{AccountCreateDBRequest, AccountUpdateDBRequest};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument, warn};
use types::AccountId;
use utoipa::OpenApi;

/// Application state shared across all request handlers.
///
/// Immutable after startup. The pool is the only shared resource with mutable state behind it.
///
/// ```ignore
/// let state = AppState::builder()
///     .db(pool)
///     .config(config)
///     .tokens(tokens)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Config,
    pub tokens: TokenService,
}

/// Get the catalogd database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Ensure the configured admin account exists and has the admin role.
///
/// Idempotent. An existing account is promoted to admin, and its password is replaced when one
/// is given. A missing account is created only when a password is given; otherwise there is
/// nothing to log in with and the bootstrap is skipped.
///
/// Returns the id of the admin account, if there is one.
#[instrument(skip_all, fields(username = %username))]
pub async fn create_initial_admin_user(
    username: &str,
    password: Option<&str>,
    params: Argon2Params,
    db: &SqlitePool,
) -> anyhow::Result<Option<AccountId>> {
    // Hash password if provided
    let password_hash = match password {
        Some(pwd) => Some(password::hash_string_with_params(pwd, Some(params)).map_err(|e| anyhow::anyhow!("Failed to hash admin password: {e}"))?),
        None => None,
    };

    // Use a transaction to ensure atomicity
    let mut tx = db.begin().await?;
    let mut accounts = Accounts::new(&mut tx);

    if let Some(existing) = accounts.get_by_username(username).await? {
        let updated = accounts
            .update(
                existing.id,
                &AccountUpdateDBRequest {
                    role: Some(Role::Admin),
                    password_hash,
                },
            )
            .await?;
        tx.commit().await?;
        info!(previous_role = %existing.role, "Ensured admin account");
        return Ok(Some(updated.id));
    }

    let Some(password_hash) = password_hash else {
        tx.rollback().await?;
        warn!("admin_username is set but the account does not exist and no admin_password is configured, skipping");
        return Ok(None);
    };

    let created = accounts
        .create(&AccountCreateDBRequest {
            username: username.to_string(),
            password_hash,
            role: Role::Admin,
        })
        .await?;

    tx.commit().await?;
    info!("Created admin account");
    Ok(Some(created.id))
}

/// Open the connection pool, creating the database file if needed
async fn setup_database(config: &Config) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.database.url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let settings = &config.database.pool;
    let pool = SqlitePoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
        .idle_timeout((settings.idle_timeout_secs > 0).then(|| Duration::from_secs(settings.idle_timeout_secs)))
        .max_lifetime((settings.max_lifetime_secs > 0).then(|| Duration::from_secs(settings.max_lifetime_secs)))
        .connect_with(options)
        .await?;

    info!(url = %config.database.url, "Connected to database");
    Ok(pool)
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let cors_config = &config.auth.security.cors;

    let allow_origin = if cors_config.allowed_origins.iter().any(|origin| matches!(origin, CorsOrigin::Wildcard)) {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in &cors_config.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                // Origins never carry a trailing slash
                origins.push(url.as_str().trim_end_matches('/').parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(origins)
    };

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([http::header::AUTHORIZATION, http::header::CONTENT_TYPE])
        .allow_credentials(cors_config.allow_credentials);

    if let Some(max_age) = cors_config.max_age {
        cors = cors.max_age(Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/healthz",
    tag = "health",
    responses((status = 200, description = "Service is up", body = String))
)]
pub async fn healthz() -> &'static str {
    "OK"
}

/// Build the application router with all endpoints and middleware.
///
/// Role allow-lists for product mutations are read from `config.access` here, once. Account
/// administration is fixed to [`ADMIN_ONLY`].
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let access = &state.config.access.products;

    let public_routes = Router::new()
        .route("/healthz", get(healthz))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/api-docs/openapi.json", get(|| async { Json(openapi::ApiDoc::openapi()) }));

    let protected_routes = Router::new()
        .route("/products", get(list_products).merge(with_roles(post(create_product), &access.create)))
        .route(
            "/products/{id}",
            get(get_product)
                .merge(with_roles(put(update_product), &access.update))
                .merge(with_roles(delete(delete_product), &access.delete)),
        )
        .route("/users", with_roles(get(list_users), ADMIN_ONLY))
        .route("/users/{id}/role", with_roles(put(update_user_role), ADMIN_ONLY))
        .route_layer(from_fn_with_state(state.clone(), require_authentication));

    let router = public_routes
        .merge(protected_routes)
        .with_state(state.clone())
        .layer(create_cors_layer(&state.config)?)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    debug!(
        create = ?access.create,
        update = ?access.update,
        delete = ?access.delete,
        "Product routes guarded"
    );
    Ok(router)
}

/// A configured, ready-to-serve instance of the service.
///
/// 1. **Create**: [`Application::new`] opens the database, runs migrations, ensures the admin
///    account and builds the router
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and handles requests until the
///    shutdown future resolves, then closes the pool
pub struct Application {
    router: Router,
    config: Config,
    pool: SqlitePool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting catalog manager with configuration: {:#?}", config);

        let pool = setup_database(&config).await?;
        Self::new_with_pool(config, pool).await
    }

    /// Create an application over an existing pool. Migrations and the admin bootstrap still run.
    pub async fn new_with_pool(config: Config, pool: SqlitePool) -> anyhow::Result<Self> {
        migrator().run(&pool).await?;

        if let Some(admin_username) = config.admin_username.as_deref() {
            create_initial_admin_user(
                admin_username,
                config.admin_password.as_deref(),
                Argon2Params::from(&config.auth.password),
                &pool,
            )
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create initial admin user: {e}"))?;
        }

        let tokens = TokenService::from_config(&config)?;
        let app_state = AppState::builder().db(pool.clone()).config(config.clone()).tokens(tokens).build();
        let router = build_router(&app_state)?;

        Ok(Self { router, config, pool })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Catalog manager listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        // Run the server with graceful shutdown
        axum::serve(listener, self.router).with_graceful_shutdown(shutdown).await?;

        // Close database connections
        info!("Closing database connections...");
        self.pool.close().await;

        Ok(())
    }
}
