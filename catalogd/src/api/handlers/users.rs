use crate::api::extract::JsonBody;
use crate::api::models::pagination::ListQuery;
use crate::api::models::users::{CurrentUser, RoleUpdate, UserResponse};
use crate::db::errors::DbError;
use crate::db::handlers::{Accounts, Repository};
use crate::db::models::accounts::AccountUpdateDBRequest;
use crate::errors::{Error, Result};
use crate::{AppState, types::AccountId};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::info;

#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    summary = "List accounts",
    params(ListQuery),
    responses(
        (status = 200, description = "List of accounts", body = Vec<UserResponse>),
        (status = 401, description = "Missing bearer token"),
        (status = 403, description = "Invalid token or not an admin"),
        (status = 500, description = "Internal server error")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    _current_user: CurrentUser,
) -> Result<Json<Vec<UserResponse>>> {
    let page = query.page()?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let accounts = Accounts::new(&mut conn).list(&page).await?;

    Ok(Json(accounts.into_iter().map(UserResponse::from).collect()))
}

/// Change an account's role. Tokens already issued keep the old role until they expire.
#[utoipa::path(
    put,
    path = "/users/{id}/role",
    tag = "users",
    summary = "Change account role",
    params(("id" = uuid::Uuid, Path, description = "Account ID")),
    request_body = RoleUpdate,
    responses(
        (status = 200, description = "Role updated", body = UserResponse),
        (status = 400, description = "Invalid role"),
        (status = 401, description = "Missing bearer token"),
        (status = 403, description = "Invalid token or not an admin"),
        (status = 404, description = "Account not found"),
        (status = 500, description = "Internal server error")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all, fields(account_id = %id))]
pub async fn update_user_role(
    State(state): State<AppState>,
    Path(id): Path<AccountId>,
    current_user: CurrentUser,
    JsonBody(update): JsonBody<RoleUpdate>,
) -> Result<Json<UserResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let account = match Accounts::new(&mut conn).update(id, &AccountUpdateDBRequest::role(update.role)).await {
        Ok(account) => account,
        Err(DbError::NotFound) => {
            return Err(Error::NotFound {
                resource: "User".to_string(),
                id: id.to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    info!(
        username = %account.username,
        role = %account.role,
        changed_by = %current_user.username,
        "Changed account role"
    );
    Ok(Json(UserResponse::from(account)))
}
