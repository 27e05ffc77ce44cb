//! Role-based route gating.
//!
//! Every guarded route gets its allow-list when the router is built:
//!
//! ```ignore
//! Router::new().route("/products", get(list_products).merge(with_roles(post(create_product), &[Role::Admin])))
//! ```
//!
//! The guard reads the identity attached by
//! [`require_authentication`](crate::auth::middleware::require_authentication), so it must sit
//! inside that middleware. A request that reaches the guard without an identity is rejected.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::{Next, from_fn_with_state},
    response::Response,
    routing::MethodRouter,
};
use tracing::debug;

use crate::{
    api::models::users::{CurrentUser, Role},
    errors::Error,
};

/// Routes administering accounts are never configurable
pub const ADMIN_ONLY: &[Role] = &[Role::Admin];

/// Fixed set of roles allowed on a route
#[derive(Debug, Clone)]
pub struct AllowedRoles(Arc<[Role]>);

impl AllowedRoles {
    pub fn new(roles: &[Role]) -> Self {
        Self(roles.into())
    }

    pub fn roles(&self) -> &[Role] {
        &self.0
    }

    pub fn permits(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    /// Check an identity against the allow-list
    pub fn check(&self, user: &CurrentUser) -> Result<(), Error> {
        if self.permits(user.role) {
            Ok(())
        } else {
            Err(Error::InsufficientRole {
                role: user.role,
                allowed: self.0.to_vec(),
            })
        }
    }
}

/// Middleware rejecting requests whose identity role is not allowed
pub async fn require_role(State(allowed): State<AllowedRoles>, request: Request, next: Next) -> Result<Response, Error> {
    let user = request
        .extensions()
        .get::<CurrentUser>()
        .ok_or(Error::Unauthenticated { message: None })?;

    allowed.check(user)?;
    debug!(username = %user.username, role = %user.role, "Role permitted");

    Ok(next.run(request).await)
}

/// Guard a method router with an allow-list of roles
pub fn with_roles<S>(route: MethodRouter<S>, roles: &[Role]) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    route.route_layer(from_fn_with_state(AllowedRoles::new(roles), require_role))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AppState;
    use crate::auth::{middleware::require_authentication, token::IdentityClaims};
    use crate::test_utils::{create_test_app_state, create_test_pool};
    use axum::{Router, http::StatusCode, middleware::from_fn_with_state, routing::get};
    use axum_test::TestServer;

    fn user(role: Role) -> CurrentUser {
        CurrentUser {
            username: "alice".to_string(),
            role,
        }
    }

    #[test]
    fn test_check_against_allow_list() {
        let allowed = AllowedRoles::new(&[Role::Admin, Role::Moderator]);
        assert!(allowed.check(&user(Role::Admin)).is_ok());
        assert!(allowed.check(&user(Role::Moderator)).is_ok());
        assert!(matches!(allowed.check(&user(Role::User)), Err(Error::InsufficientRole { role: Role::User, .. })));
    }

    #[test]
    fn test_empty_allow_list_denies_everyone() {
        let allowed = AllowedRoles::new(&[]);
        for role in Role::ALL {
            assert!(allowed.check(&user(role)).is_err());
        }
    }

    async fn guarded_server(roles: &[Role]) -> (TestServer, AppState) {
        let state = create_test_app_state(create_test_pool().await);
        let router = Router::new()
            .route("/open", get(|| async { "open" }))
            .route("/guarded", with_roles(get(|| async { "guarded" }), roles))
            .route_layer(from_fn_with_state(state.clone(), require_authentication))
            .with_state(state.clone());
        (TestServer::new(router).unwrap(), state)
    }

    fn token_for(state: &AppState, role: Role) -> String {
        state
            .tokens
            .issue(&IdentityClaims {
                username: format!("{role}-account"),
                role,
            })
            .unwrap()
    }

    #[tokio::test]
    async fn test_every_role_against_every_allow_list() {
        let allow_lists: [&[Role]; 4] = [
            &[Role::Admin],
            &[Role::Admin, Role::Moderator],
            &[Role::User],
            &[Role::User, Role::Admin, Role::Moderator],
        ];

        for allowed in allow_lists {
            let (server, state) = guarded_server(allowed).await;
            for role in Role::ALL {
                let response = server.get("/guarded").authorization_bearer(token_for(&state, role)).await;
                if allowed.contains(&role) {
                    response.assert_status_ok();
                    response.assert_text("guarded");
                } else {
                    response.assert_status(StatusCode::FORBIDDEN);
                }
            }
        }
    }

    #[tokio::test]
    async fn test_unguarded_route_accepts_any_role() {
        let (server, state) = guarded_server(ADMIN_ONLY).await;
        for role in Role::ALL {
            server
                .get("/open")
                .authorization_bearer(token_for(&state, role))
                .await
                .assert_status_ok();
        }
    }

    #[tokio::test]
    async fn test_authentication_runs_before_the_guard() {
        let (server, _) = guarded_server(ADMIN_ONLY).await;
        server.get("/guarded").await.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_guard_without_authentication_fails_closed() {
        let router: Router = Router::new().route("/guarded", with_roles(get(|| async { "guarded" }), &Role::ALL));
        let server = TestServer::new(router).unwrap();
        server.get("/guarded").await.assert_status(StatusCode::UNAUTHORIZED);
    }
}
