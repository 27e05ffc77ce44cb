//! Database repository for accounts.

use crate::types::{AccountId, abbrev_uuid};
use crate::{
    api::models::users::Role,
    db::{
        errors::{DbError, Result},
        handlers::repository::{Page, Repository},
        models::accounts::{AccountCreateDBRequest, AccountDBResponse, AccountUpdateDBRequest},
    },
};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection};
use tracing::instrument;
use uuid::Uuid;

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct Account {
    pub id: AccountId,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for AccountDBResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            username: account.username,
            password_hash: account.password_hash,
            role: account.role,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

pub struct Accounts<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> Accounts<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    /// Look up an account by its unique username
    #[instrument(skip(self), err)]
    pub async fn get_by_username(&mut self, username: &str) -> Result<Option<AccountDBResponse>> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE username = ?")
            .bind(username)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(account.map(AccountDBResponse::from))
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Accounts<'c> {
    type CreateRequest = AccountCreateDBRequest;
    type UpdateRequest = AccountUpdateDBRequest;
    type Response = AccountDBResponse;
    type Id = AccountId;
    type Filter = Page;

    #[instrument(skip(self, request), fields(username = %request.username, role = %request.role), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let now = Utc::now();
        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (id, username, password_hash, role, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&request.username)
        .bind(&request.password_hash)
        .bind(request.role)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(AccountDBResponse::from(account))
    }

    #[instrument(skip(self), fields(account_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(account.map(AccountDBResponse::from))
    }

    #[instrument(skip(self, filter), fields(skip = filter.skip, limit = ?filter.limit), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let accounts = sqlx::query_as::<_, Account>("SELECT * FROM accounts ORDER BY created_at, username LIMIT ? OFFSET ?")
            .bind(filter.sql_limit())
            .bind(filter.skip)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(accounts.into_iter().map(AccountDBResponse::from).collect())
    }

    #[instrument(skip(self), fields(account_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = ?").bind(id).execute(&mut *self.db).await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(account_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        // Atomic update with conditional field updates
        let account = sqlx::query_as::<_, Account>(
            r#"
            UPDATE accounts SET
                role = COALESCE(?, role),
                password_hash = COALESCE(?, password_hash),
                updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(request.role)
        .bind(request.password_hash.as_deref())
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(AccountDBResponse::from(account))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_pool;

    fn create_request(username: &str, role: Role) -> AccountCreateDBRequest {
        AccountCreateDBRequest {
            username: username.to_string(),
            password_hash: "$argon2id$v=19$m=1024,t=1,p=1$c2FsdHNhbHQ$aGFzaA".to_string(),
            role,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_account() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Accounts::new(&mut conn);

        let created = repo.create(&create_request("alice", Role::User)).await.unwrap();
        assert_eq!(created.username, "alice");
        assert_eq!(created.role, Role::User);

        let by_id = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_id.username, "alice");

        let by_name = repo.get_by_username("alice").await.unwrap().unwrap();
        assert_eq!(by_name.id, created.id);

        assert!(repo.get_by_username("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_is_unique_violation() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Accounts::new(&mut conn);

        repo.create(&create_request("alice", Role::User)).await.unwrap();
        let err = repo.create(&create_request("alice", Role::Admin)).await.unwrap_err();

        match err {
            DbError::UniqueViolation { table, column, message } => {
                assert_eq!(table.as_deref(), Some("accounts"));
                assert_eq!(column.as_deref(), Some("username"));
                assert!(message.contains("UNIQUE"));
            }
            other => panic!("expected unique violation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_update_role() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Accounts::new(&mut conn);

        let created = repo.create(&create_request("alice", Role::User)).await.unwrap();
        let updated = repo.update(created.id, &AccountUpdateDBRequest::role(Role::Admin)).await.unwrap();

        assert_eq!(updated.role, Role::Admin);
        assert_eq!(updated.password_hash, created.password_hash);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn test_update_missing_account_is_not_found() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Accounts::new(&mut conn);

        let err = repo
            .update(Uuid::new_v4(), &AccountUpdateDBRequest::role(Role::Admin))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound));
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Accounts::new(&mut conn);

        let alice = repo.create(&create_request("alice", Role::User)).await.unwrap();
        repo.create(&create_request("bob", Role::Moderator)).await.unwrap();

        let all = repo.list(&Page::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let page = repo.list(&Page::new(1, Some(1))).await.unwrap();
        assert_eq!(page.len(), 1);

        assert!(repo.delete(alice.id).await.unwrap());
        assert!(!repo.delete(alice.id).await.unwrap());
        assert_eq!(repo.list(&Page::default()).await.unwrap().len(), 1);
    }
}
