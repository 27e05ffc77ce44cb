use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{api::models::users::CurrentUser, errors::Error};

/// Handlers behind the auth middleware take `CurrentUser` as an argument to read the verified
/// identity. A route that forgot the middleware fails closed with 401.
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(Error::Unauthenticated { message: None })
    }
}
