//! Database models for products.

use crate::api::models::products::{ProductCreate, ProductUpdate};
use crate::types::ProductId;
use chrono::{DateTime, Utc};

/// Database request for creating a new product
#[derive(Debug, Clone)]
pub struct ProductCreateDBRequest {
    pub name: String,
    pub price: f64,
    pub description: Option<String>,
}

impl From<ProductCreate> for ProductCreateDBRequest {
    fn from(api: ProductCreate) -> Self {
        Self {
            name: api.name,
            price: api.price,
            description: api.description,
        }
    }
}

/// Database request for updating a product
#[derive(Debug, Clone, Default)]
pub struct ProductUpdateDBRequest {
    pub name: Option<String>,
    pub price: Option<f64>,
    /// None = keep, Some(None) = clear, Some(Some(text)) = set
    pub description: Option<Option<String>>,
}

impl From<ProductUpdate> for ProductUpdateDBRequest {
    fn from(api: ProductUpdate) -> Self {
        Self {
            name: api.name,
            price: api.price,
            description: api.description,
        }
    }
}

/// Database response for a product
#[derive(Debug, Clone)]
pub struct ProductDBResponse {
    pub id: ProductId,
    pub name: String,
    pub price: f64,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
