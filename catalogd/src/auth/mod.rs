//! Authentication and authorization.
//!
//! Requests to protected routes pass through two stages before reaching a handler:
//!
//! ```text
//! request ──► require_authentication ──► require_role (guarded routes) ──► handler
//!               │ no bearer credential: 401        │ role not allowed: 403
//!               │ token fails verification: 403    │
//! ```
//!
//! # Modules
//!
//! - [`token`]: Issues and verifies signed identity tokens
//! - [`middleware`]: Bearer extraction and verification, attaches [`CurrentUser`](crate::api::models::users::CurrentUser)
//! - [`permissions`]: Per-route role allow-lists
//! - [`password`]: Argon2 password hashing
//! - [`current_user`]: Extractor for the verified identity
//!
//! Tokens are the only source of identity: the middleware never reads the account store, so a
//! role change takes effect on the next login.

pub mod current_user;
pub mod middleware;
pub mod password;
pub mod permissions;
pub mod token;
