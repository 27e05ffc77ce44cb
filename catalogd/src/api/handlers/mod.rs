//! HTTP request handlers for all API endpoints.
//!
//! # Handler Modules
//!
//! - [`auth`]: Registration and login (public)
//! - [`products`]: Product CRUD, mutations gated by the configured role allow-lists
//! - [`users`]: Account listing and role changes (admin only)
//!
//! # Authentication
//!
//! Every route outside [`auth`] sits behind
//! [`require_authentication`](crate::auth::middleware::require_authentication); handlers read the
//! verified identity through the [`CurrentUser`](crate::api::models::users::CurrentUser)
//! extractor. Role checks happen in the router, before the handler runs.
//!
//! # Error Handling
//!
//! Handlers return [`crate::errors::Error`], which converts to a status code and body.

pub mod auth;
pub mod products;
pub mod users;
