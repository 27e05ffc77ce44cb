use crate::db::handlers::Page;
use crate::errors::Error;
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

/// Maximum page size accepted from clients
pub const MAX_LIMIT: i64 = 1000;

/// Optional offset pagination for list endpoints. Without parameters every row is returned.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Number of items to skip
    pub skip: Option<i64>,
    /// Maximum number of items to return (1 to 1000)
    pub limit: Option<i64>,
}

impl ListQuery {
    pub fn page(&self) -> Result<Page, Error> {
        let skip = self.skip.unwrap_or(0);
        if skip < 0 {
            return Err(Error::BadRequest {
                message: "skip must not be negative".to_string(),
            });
        }
        if let Some(limit) = self.limit {
            if !(1..=MAX_LIMIT).contains(&limit) {
                return Err(Error::BadRequest {
                    message: format!("limit must be between 1 and {MAX_LIMIT}"),
                });
            }
        }
        Ok(Page::new(skip, self.limit))
    }
}
