//! Request extractors shared by the handlers.

use crate::errors::Error;
use axum::{
    Json,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;

/// JSON request body whose rejections (missing content type, syntax errors, missing or
/// malformed fields) are reported as `400 Bad Request` through [`Error`].
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|rejection| Error::BadRequest {
            message: rejection.body_text(),
        })?;
        Ok(JsonBody(value))
    }
}
