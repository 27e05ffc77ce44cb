//! API request and response models.

pub mod auth;
pub mod pagination;
pub mod products;
pub mod users;
