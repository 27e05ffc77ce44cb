use crate::db::models::products::ProductDBResponse;
use crate::errors::Error;
use crate::types::ProductId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::rust::double_option;
use utoipa::ToSchema;

// Product request models
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ProductCreate {
    pub name: String,
    pub price: f64,
    pub description: Option<String>,
}

/// Partial update: absent fields keep their stored value
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub price: Option<f64>,
    /// Description (None = no change, Some(None) = clear, Some(text) = set)
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub description: Option<Option<String>>,
}

// Product response models
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ProductId,
    pub name: String,
    pub price: f64,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductDBResponse> for ProductResponse {
    fn from(db: ProductDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            price: db.price,
            description: db.description,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

pub(crate) fn validate_name(name: &str) -> Result<String, Error> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::BadRequest {
            message: "Product name must not be empty".to_string(),
        });
    }
    Ok(name.to_string())
}

pub(crate) fn validate_price(price: f64) -> Result<f64, Error> {
    if !price.is_finite() || price < 0.0 {
        return Err(Error::BadRequest {
            message: "Product price must be a non-negative number".to_string(),
        });
    }
    Ok(price)
}

impl ProductCreate {
    /// Normalize and validate the request, returning the cleaned-up copy
    pub fn validated(self) -> Result<Self, Error> {
        Ok(Self {
            name: validate_name(&self.name)?,
            price: validate_price(self.price)?,
            description: self.description,
        })
    }
}

impl ProductUpdate {
    pub fn validated(self) -> Result<Self, Error> {
        Ok(Self {
            name: self.name.as_deref().map(validate_name).transpose()?,
            price: self.price.map(validate_price).transpose()?,
            description: self.description,
        })
    }
}
