//! Base repository trait for database operations.
//!
//! A repository is a data access layer for one table. It provides methods for creating, reading,
//! updating and deleting entities, as well as listing them with simple filters.

use crate::db::errors::Result;

/// Base repository trait providing common database operations
///
/// This trait has separate associated types for create requests, update requests, and responses.
#[async_trait::async_trait]
pub trait Repository {
    /// The request type for creating entities
    type CreateRequest;

    /// The request type for updating entities
    type UpdateRequest;

    /// The response/DTO type returned by operations
    type Response;

    /// The identifier type for lookups
    type Id: Send + Sync;

    /// The filter type for list operations
    type Filter: Send + Sync;

    /// Create a new entity
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response>;

    /// Get an entity by ID
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>>;

    /// List entities with filtering and pagination
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>>;

    /// Delete an entity by ID, returning whether a row was removed
    async fn delete(&mut self, id: Self::Id) -> Result<bool>;

    /// Update an entity by ID. Fails with `DbError::NotFound` if it does not exist.
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response>;
}

/// Offset pagination shared by the list operations. `limit: None` returns every remaining row.
#[derive(Debug, Clone, Copy, Default)]
pub struct Page {
    pub skip: i64,
    pub limit: Option<i64>,
}

impl Page {
    pub fn new(skip: i64, limit: Option<i64>) -> Self {
        Self { skip, limit }
    }

    /// SQLite treats a negative LIMIT as "no limit"
    pub(crate) fn sql_limit(&self) -> i64 {
        self.limit.unwrap_or(-1)
    }
}
