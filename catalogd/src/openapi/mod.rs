//! OpenAPI documentation for the catalog API, served at `/api-docs/openapi.json`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::api;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "BearerAuth".to_string(),
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "Token returned by `POST /auth/login`. Include it in the `Authorization` header:\n\n\
                            ```\nAuthorization: Bearer YOUR_TOKEN\n```",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Catalog Manager API",
        description = "Product catalog with role-gated mutations and bearer token authentication."
    ),
    modifiers(&SecurityAddon),
    paths(
        crate::healthz,
        api::handlers::auth::register,
        api::handlers::auth::login,
        api::handlers::products::list_products,
        api::handlers::products::get_product,
        api::handlers::products::create_product,
        api::handlers::products::update_product,
        api::handlers::products::delete_product,
        api::handlers::users::list_users,
        api::handlers::users::update_user_role,
    ),
    components(
        schemas(
            api::models::auth::RegisterRequest,
            api::models::auth::LoginRequest,
            api::models::auth::TokenResponse,
            api::models::products::ProductCreate,
            api::models::products::ProductUpdate,
            api::models::products::ProductResponse,
            api::models::users::Role,
            api::models::users::UserResponse,
            api::models::users::RoleUpdate,
        )
    ),
    tags(
        (name = "health", description = "Liveness probe"),
        (name = "authentication", description = "Registration and login"),
        (name = "products", description = "Product catalog"),
        (name = "users", description = "Account administration"),
    )
)]
pub struct ApiDoc;
