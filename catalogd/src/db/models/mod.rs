//! Database request and response records, one module per table.

pub mod accounts;
pub mod products;
