//! Database layer for data persistence and access.
//!
//! This module implements the data access layer using SQLx with SQLite.
//! It follows the Repository pattern to provide clean abstractions over database operations.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  (API request handlers)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │ Repositories│  (db::handlers - queries)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │   Models    │  (db::models - database records)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │   SQLite    │
//! └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`handlers`]: Repository implementations for CRUD operations
//! - [`models`]: Database record structures matching table schemas
//! - [`errors`]: Database-specific error types
//!
//! ## Example Usage
//!
//! ```ignore
//! use catalogd::db::handlers::{Accounts, Repository};
//!
//! async fn example(pool: &sqlx::SqlitePool) -> Result<(), Box<dyn std::error::Error>> {
//!     let mut conn = pool.acquire().await?;
//!     let mut accounts = Accounts::new(&mut conn);
//!
//!     if let Some(account) = accounts.get_by_username("alice").await? {
//!         println!("alice has role {}", account.role);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Every write in this crate is a single statement, so repositories are usually created from a
//! pooled connection. Wrap them in a transaction when several writes must land together, as the
//! admin bootstrap does.
//!
//! # Error Handling
//!
//! [`errors::DbError`] classifies SQLite failures (not found, unique and check constraint
//! violations) so the API layer can map them to status codes.

pub mod errors;
pub mod handlers;
pub mod models;
