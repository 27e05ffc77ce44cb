//! Repository implementations, one per table.

pub mod accounts;
pub mod products;
pub mod repository;

pub use accounts::Accounts;
pub use products::Products;
pub use repository::{Page, Repository};
