use crate::api::extract::JsonBody;
use crate::api::models::pagination::ListQuery;
use crate::api::models::products::{ProductCreate, ProductResponse, ProductUpdate};
use crate::api::models::users::CurrentUser;
use crate::db::errors::DbError;
use crate::db::handlers::{Products, Repository};
use crate::db::models::products::{ProductCreateDBRequest, ProductUpdateDBRequest};
use crate::errors::{Error, Result};
use crate::{AppState, types::ProductId};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::info;

fn product_not_found(id: ProductId) -> Error {
    Error::NotFound {
        resource: "Product".to_string(),
        id: id.to_string(),
    }
}

#[utoipa::path(
    get,
    path = "/products",
    tag = "products",
    summary = "List products",
    params(ListQuery),
    responses(
        (status = 200, description = "List of products", body = Vec<ProductResponse>),
        (status = 400, description = "Invalid pagination parameters"),
        (status = 401, description = "Missing bearer token"),
        (status = 403, description = "Invalid or expired token"),
        (status = 500, description = "Internal server error")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    _current_user: CurrentUser,
) -> Result<Json<Vec<ProductResponse>>> {
    let page = query.page()?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let products = Products::new(&mut conn).list(&page).await?;

    Ok(Json(products.into_iter().map(ProductResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/products/{id}",
    tag = "products",
    summary = "Get product",
    params(("id" = uuid::Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product", body = ProductResponse),
        (status = 401, description = "Missing bearer token"),
        (status = 403, description = "Invalid or expired token"),
        (status = 404, description = "Product not found"),
        (status = 500, description = "Internal server error")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(product_id = %id))]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    _current_user: CurrentUser,
) -> Result<Json<ProductResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let product = Products::new(&mut conn).get_by_id(id).await?.ok_or_else(|| product_not_found(id))?;

    Ok(Json(ProductResponse::from(product)))
}

#[utoipa::path(
    post,
    path = "/products",
    tag = "products",
    summary = "Create product",
    request_body = ProductCreate,
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 400, description = "Invalid product data"),
        (status = 401, description = "Missing bearer token"),
        (status = 403, description = "Invalid token or role not allowed"),
        (status = 500, description = "Internal server error")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    JsonBody(create): JsonBody<ProductCreate>,
) -> Result<(StatusCode, Json<ProductResponse>)> {
    let create = create.validated()?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let product = Products::new(&mut conn).create(&ProductCreateDBRequest::from(create)).await?;

    info!(product_id = %product.id, username = %current_user.username, "Created product");
    Ok((StatusCode::CREATED, Json(ProductResponse::from(product))))
}

#[utoipa::path(
    put,
    path = "/products/{id}",
    tag = "products",
    summary = "Update product",
    params(("id" = uuid::Uuid, Path, description = "Product ID")),
    request_body = ProductUpdate,
    responses(
        (status = 200, description = "Product updated", body = ProductResponse),
        (status = 400, description = "Invalid product data"),
        (status = 401, description = "Missing bearer token"),
        (status = 403, description = "Invalid token or role not allowed"),
        (status = 404, description = "Product not found"),
        (status = 500, description = "Internal server error")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(product_id = %id))]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    current_user: CurrentUser,
    JsonBody(update): JsonBody<ProductUpdate>,
) -> Result<Json<ProductResponse>> {
    let update = update.validated()?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let product = match Products::new(&mut conn).update(id, &ProductUpdateDBRequest::from(update)).await {
        Ok(product) => product,
        Err(DbError::NotFound) => return Err(product_not_found(id)),
        Err(e) => return Err(e.into()),
    };

    info!(product_id = %product.id, username = %current_user.username, "Updated product");
    Ok(Json(ProductResponse::from(product)))
}

#[utoipa::path(
    delete,
    path = "/products/{id}",
    tag = "products",
    summary = "Delete product",
    params(("id" = uuid::Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product deleted"),
        (status = 401, description = "Missing bearer token"),
        (status = 403, description = "Invalid token or role not allowed"),
        (status = 404, description = "Product not found"),
        (status = 500, description = "Internal server error")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(product_id = %id))]
pub async fn delete_product(State(state): State<AppState>, Path(id): Path<ProductId>, current_user: CurrentUser) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    if Products::new(&mut conn).delete(id).await? {
        info!(product_id = %id, username = %current_user.username, "Deleted product");
        Ok(StatusCode::OK)
    } else {
        Err(product_not_found(id))
    }
}

#[cfg(test)]
mod tests {
    use crate::api::models::products::ProductResponse;
    use crate::api::models::users::Role;
    use crate::config::Config;
    use crate::test_utils::*;
    use axum::http::StatusCode;
    use serde_json::json;
    use uuid::Uuid;

    fn widget() -> serde_json::Value {
        json!({"name": "Widget", "price": 9.99, "description": "A useful widget"})
    }

    #[test_log::test(tokio::test)]
    async fn test_product_lifecycle_as_admin() {
        let app = create_test_app(create_test_pool().await).await;
        let admin = token_for("root", Role::Admin);

        let response = app.post("/products").authorization_bearer(&admin).json(&widget()).await;
        response.assert_status(StatusCode::CREATED);
        let created: ProductResponse = response.json();
        assert_eq!(created.name, "Widget");

        let fetched: ProductResponse = app
            .get(&format!("/products/{}", created.id))
            .authorization_bearer(&admin)
            .await
            .json();
        assert_eq!(fetched.id, created.id);

        let response = app
            .put(&format!("/products/{}", created.id))
            .authorization_bearer(&admin)
            .json(&json!({"price": 12.5}))
            .await;
        response.assert_status_ok();
        let updated: ProductResponse = response.json();
        assert_eq!(updated.price, 12.5);
        assert_eq!(updated.name, "Widget");

        app.delete(&format!("/products/{}", created.id))
            .authorization_bearer(&admin)
            .await
            .assert_status_ok();

        app.get(&format!("/products/{}", created.id))
            .authorization_bearer(&admin)
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn test_null_description_clears_it() {
        let app = create_test_app(create_test_pool().await).await;
        let admin = token_for("root", Role::Admin);
        let created: ProductResponse = app.post("/products").authorization_bearer(&admin).json(&widget()).await.json();
        let path = format!("/products/{}", created.id);

        // Absent field leaves the description alone
        let renamed: ProductResponse = app
            .put(&path)
            .authorization_bearer(&admin)
            .json(&json!({"name": "Gadget"}))
            .await
            .json();
        assert_eq!(renamed.description.as_deref(), Some("A useful widget"));

        let response = app
            .put(&path)
            .authorization_bearer(&admin)
            .json(&json!({"description": null}))
            .await;
        response.assert_status_ok();
        let cleared: ProductResponse = response.json();
        assert_eq!(cleared.description, None);
        assert_eq!(cleared.name, "Gadget");

        let fetched: ProductResponse = app.get(&path).authorization_bearer(&admin).await.json();
        assert_eq!(fetched.description, None);
    }

    #[tokio::test]
    async fn test_every_role_can_list_and_read() {
        let app = create_test_app(create_test_pool().await).await;
        let created: ProductResponse = app
            .post("/products")
            .authorization_bearer(token_for("root", Role::Admin))
            .json(&widget())
            .await
            .json();

        for role in Role::ALL {
            let token = token_for("reader", role);
            let listed: Vec<ProductResponse> = app.get("/products").authorization_bearer(&token).await.json();
            assert_eq!(listed.len(), 1);

            app.get(&format!("/products/{}", created.id))
                .authorization_bearer(&token)
                .await
                .assert_status_ok();
        }
    }

    #[tokio::test]
    async fn test_mutations_are_admin_only_by_default() {
        let app = create_test_app(create_test_pool().await).await;
        let created: ProductResponse = app
            .post("/products")
            .authorization_bearer(token_for("root", Role::Admin))
            .json(&widget())
            .await
            .json();

        for role in [Role::User, Role::Moderator] {
            let token = token_for("someone", role);
            app.post("/products")
                .authorization_bearer(&token)
                .json(&widget())
                .await
                .assert_status(StatusCode::FORBIDDEN);
            app.put(&format!("/products/{}", created.id))
                .authorization_bearer(&token)
                .json(&json!({"price": 1.0}))
                .await
                .assert_status(StatusCode::FORBIDDEN);
            app.delete(&format!("/products/{}", created.id))
                .authorization_bearer(&token)
                .await
                .assert_status(StatusCode::FORBIDDEN);
        }
    }

    #[tokio::test]
    async fn test_configured_allow_list_admits_moderators() {
        let mut config: Config = create_test_config();
        config.access.products.create = vec![Role::Admin, Role::Moderator];
        let app = create_test_app_with_config(create_test_pool().await, config).await;

        app.post("/products")
            .authorization_bearer(token_for("mod", Role::Moderator))
            .json(&widget())
            .await
            .assert_status(StatusCode::CREATED);

        app.post("/products")
            .authorization_bearer(token_for("pleb", Role::User))
            .json(&widget())
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_deleting_missing_product_is_always_not_found() {
        let app = create_test_app(create_test_pool().await).await;
        let admin = token_for("root", Role::Admin);
        let id = Uuid::new_v4();

        for _ in 0..3 {
            app.delete(&format!("/products/{id}"))
                .authorization_bearer(&admin)
                .await
                .assert_status_not_found();
        }
    }

    #[tokio::test]
    async fn test_update_missing_product_is_not_found() {
        let app = create_test_app(create_test_pool().await).await;

        app.put(&format!("/products/{}", Uuid::new_v4()))
            .authorization_bearer(token_for("root", Role::Admin))
            .json(&json!({"name": "Gadget"}))
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn test_invalid_products_are_rejected() {
        let app = create_test_app(create_test_pool().await).await;
        let admin = token_for("root", Role::Admin);

        let invalid = [
            json!({"name": "  ", "price": 1.0}),
            json!({"name": "Widget", "price": -1.0}),
            json!({"name": "Widget"}),
            json!({"name": "Widget", "price": "cheap"}),
            json!({"name": "Widget", "price": 1.0, "colour": "red"}),
        ];
        for body in invalid {
            app.post("/products")
                .authorization_bearer(&admin)
                .json(&body)
                .await
                .assert_status(StatusCode::BAD_REQUEST);
        }

        app.get("/products/not-a-uuid")
            .authorization_bearer(&admin)
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_pagination() {
        let app = create_test_app(create_test_pool().await).await;
        let admin = token_for("root", Role::Admin);

        for i in 0..5 {
            app.post("/products")
                .authorization_bearer(&admin)
                .json(&json!({"name": format!("Product {i}"), "price": i}))
                .await
                .assert_status(StatusCode::CREATED);
        }

        let all: Vec<ProductResponse> = app.get("/products").authorization_bearer(&admin).await.json();
        assert_eq!(all.len(), 5);

        let page: Vec<ProductResponse> = app.get("/products?skip=1&limit=2").authorization_bearer(&admin).await.json();
        assert_eq!(page.len(), 2);

        app.get("/products?limit=0")
            .authorization_bearer(&admin)
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_requests_without_valid_token() {
        let app = create_test_app(create_test_pool().await).await;

        app.get("/products").await.assert_status(StatusCode::UNAUTHORIZED);
        app.get("/products")
            .authorization_bearer("not-a-token")
            .await
            .assert_status(StatusCode::FORBIDDEN);
        app.post("/products").json(&widget()).await.assert_status(StatusCode::UNAUTHORIZED);
    }
}
