//! Database repository for products.

use crate::types::{ProductId, abbrev_uuid};
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::{Page, Repository},
    models::products::{ProductCreateDBRequest, ProductDBResponse, ProductUpdateDBRequest},
};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection};
use tracing::instrument;
use uuid::Uuid;

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: f64,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Product> for ProductDBResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            name: product.name,
            price: product.price,
            description: product.description,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

pub struct Products<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> Products<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Products<'c> {
    type CreateRequest = ProductCreateDBRequest;
    type UpdateRequest = ProductUpdateDBRequest;
    type Response = ProductDBResponse;
    type Id = ProductId;
    type Filter = Page;

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let now = Utc::now();
        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (id, name, price, description, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&request.name)
        .bind(request.price)
        .bind(request.description.as_deref())
        .bind(now)
        .bind(now)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(ProductDBResponse::from(product))
    }

    #[instrument(skip(self), fields(product_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(product.map(ProductDBResponse::from))
    }

    #[instrument(skip(self, filter), fields(skip = filter.skip, limit = ?filter.limit), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let products = sqlx::query_as::<_, Product>("SELECT * FROM products ORDER BY created_at, name LIMIT ? OFFSET ?")
            .bind(filter.sql_limit())
            .bind(filter.skip)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(products.into_iter().map(ProductDBResponse::from).collect())
    }

    #[instrument(skip(self), fields(product_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?").bind(id).execute(&mut *self.db).await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(product_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products SET
                name = COALESCE(?, name),
                price = COALESCE(?, price),
                description = CASE WHEN ? THEN ? ELSE description END,
                updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(request.name.as_deref())
        .bind(request.price)
        .bind(request.description.is_some())
        .bind(request.description.clone().flatten())
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(ProductDBResponse::from(product))
    }
}
