//! Bearer token authentication middleware.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use tracing::{debug, instrument};

use crate::{AppState, api::models::users::CurrentUser, errors::Error};

/// Extract the token from an `Authorization: Bearer <token>` header.
///
/// Returns `Unauthenticated` only when no credential was presented: the header is absent,
/// unreadable, or has nothing after the scheme. The scheme is matched case-insensitively. A
/// credential presented under any other scheme is `InvalidToken`, the same answer a bad bearer
/// token gets.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Result<&str, Error> {
    let header = headers.get(AUTHORIZATION).ok_or(Error::Unauthenticated { message: None })?;

    let value = header.to_str().map_err(|e| Error::Unauthenticated {
        message: Some(format!("Invalid authorization header: {e}")),
    })?;

    let mut parts = value.split_whitespace();
    let scheme = parts.next();
    let token = parts.next().ok_or_else(|| Error::Unauthenticated {
        message: Some("Authorization header must carry a credential".to_string()),
    })?;

    let is_bearer = scheme.is_some_and(|scheme| scheme.eq_ignore_ascii_case("Bearer"));
    if !is_bearer || parts.next().is_some() {
        debug!(?scheme, "Rejected non-bearer credential");
        return Err(Error::InvalidToken);
    }

    Ok(token)
}

/// Verify the bearer token and attach the decoded identity to the request.
///
/// A missing credential is answered with 401, a credential that fails verification with 403.
/// The store is never consulted: the token signature is the only source of identity.
#[instrument(skip_all, fields(method = %request.method(), uri = %request.uri()))]
pub async fn require_authentication(State(state): State<AppState>, mut request: Request, next: Next) -> Result<Response, Error> {
    let token = bearer_token(request.headers())?;

    let claims = state.tokens.verify(token).map_err(|reason| {
        // Expired, forged and garbled tokens look the same to the client
        debug!(%reason, "Rejected bearer token");
        Error::InvalidToken
    })?;

    let current_user = CurrentUser::from(claims);
    debug!(username = %current_user.username, role = %current_user.role, "Authenticated request");
    request.extensions_mut().insert(current_user);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::users::Role;
    use crate::auth::token::IdentityClaims;
    use crate::test_utils::{create_test_app_state, create_test_pool};
    use axum::{
        Extension, Router,
        http::{HeaderValue, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
    };
    use axum_test::TestServer;

    async fn whoami(Extension(user): Extension<CurrentUser>) -> String {
        format!("{}:{}", user.username, user.role)
    }

    async fn server() -> (TestServer, AppState) {
        let state = create_test_app_state(create_test_pool().await);
        let router = Router::new()
            .route("/whoami", get(whoami))
            .route_layer(from_fn_with_state(state.clone(), require_authentication))
            .with_state(state.clone());
        (TestServer::new(router).unwrap(), state)
    }

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert!(matches!(bearer_token(&headers), Err(Error::Unauthenticated { .. })));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def.ghi");

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert!(matches!(bearer_token(&headers), Err(Error::InvalidToken)));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def.ghi");

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc def"));
        assert!(matches!(bearer_token(&headers), Err(Error::InvalidToken)));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert!(matches!(bearer_token(&headers), Err(Error::Unauthenticated { .. })));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer"));
        assert!(matches!(bearer_token(&headers), Err(Error::Unauthenticated { .. })));

        headers.insert(AUTHORIZATION, HeaderValue::from_static(""));
        assert!(matches!(bearer_token(&headers), Err(Error::Unauthenticated { .. })));
    }

    #[tokio::test]
    async fn test_missing_header_is_unauthenticated() {
        let (server, _) = server().await;
        let response = server.get("/whoami").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_garbage_token_is_forbidden() {
        let (server, _) = server().await;
        let response = server
            .get("/whoami")
            .add_header(AUTHORIZATION, HeaderValue::from_static("Bearer garbage"))
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_credential_under_other_scheme_is_forbidden() {
        let (server, state) = server().await;
        let valid = state
            .tokens
            .issue(&IdentityClaims {
                username: "alice".to_string(),
                role: Role::User,
            })
            .unwrap();

        let headers = [
            "Basic dXNlcjpwYXNz".to_string(),
            "Token garbage".to_string(),
            "bearer garbage".to_string(),
            format!("Basic {valid}"),
        ];
        for header in headers {
            let response = server
                .get("/whoami")
                .add_header(AUTHORIZATION, HeaderValue::from_str(&header).unwrap())
                .await;
            response.assert_status(StatusCode::FORBIDDEN);
        }
    }

    #[tokio::test]
    async fn test_scheme_without_credential_is_unauthenticated() {
        let (server, _) = server().await;
        for header in ["Bearer", "Bearer   ", "Basic"] {
            let response = server
                .get("/whoami")
                .add_header(AUTHORIZATION, HeaderValue::from_static(header))
                .await;
            response.assert_status(StatusCode::UNAUTHORIZED);
        }
    }

    #[tokio::test]
    async fn test_token_signed_with_other_secret_is_forbidden() {
        let (server, _) = server().await;
        let foreign = crate::auth::token::TokenService::new(b"another-secret", jsonwebtoken::Algorithm::HS256, None)
            .issue(&IdentityClaims {
                username: "mallory".to_string(),
                role: Role::Admin,
            })
            .unwrap();

        let response = server.get("/whoami").authorization_bearer(foreign).await;
        response.assert_status(StatusCode::FORBIDDEN);
        // No hint about why the token was rejected
        response.assert_text("Invalid or expired token");
    }

    #[tokio::test]
    async fn test_scheme_name_is_case_insensitive() {
        let (server, state) = server().await;
        let token = state
            .tokens
            .issue(&IdentityClaims {
                username: "alice".to_string(),
                role: Role::User,
            })
            .unwrap();

        let response = server
            .get("/whoami")
            .add_header(AUTHORIZATION, HeaderValue::from_str(&format!("bearer {token}")).unwrap())
            .await;
        response.assert_status_ok();
        response.assert_text("alice:user");
    }

    #[tokio::test]
    async fn test_valid_token_attaches_identity() {
        let (server, state) = server().await;
        let token = state
            .tokens
            .issue(&IdentityClaims {
                username: "alice".to_string(),
                role: Role::Moderator,
            })
            .unwrap();

        let response = server.get("/whoami").authorization_bearer(token).await;
        response.assert_status_ok();
        response.assert_text("alice:moderator");
    }
}
