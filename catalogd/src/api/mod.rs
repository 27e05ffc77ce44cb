//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//! - **[`extract`]**: Extractors that report rejections through [`crate::errors::Error`]
//!
//! # API Structure
//!
//! - **Authentication** (`/auth/*`): Registration and login, no token required
//! - **Products** (`/products`, `/products/{id}`): Catalog CRUD
//! - **Users** (`/users`, `/users/{id}/role`): Account administration
//!
//! # OpenAPI Documentation
//!
//! All endpoints are documented with `utoipa`; the document is served at
//! `/api-docs/openapi.json`.

pub mod extract;
pub mod handlers;
pub mod models;
