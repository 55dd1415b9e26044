use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User};

/// `create` lost a race on one of the unique user fields.
#[derive(Debug, thiserror::Error)]
#[error("user with this username, email or phone number already exists")]
pub struct DuplicateUser;

/// Credential store: user records, the refresh-token slot and wishlists.
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>>;
    /// Matches on whichever identifiers are given.
    async fn find_by_login(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> anyhow::Result<Option<User>>;
    /// Any user already holding one of these unique fields.
    async fn find_conflicting(
        &self,
        username: &str,
        email: &str,
        phone_number: &str,
    ) -> anyhow::Result<Option<User>>;
    async fn find_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<User>>;
    /// Fails with [`DuplicateUser`] when a unique field is already taken.
    async fn create(&self, user: NewUser) -> anyhow::Result<User>;

    /// Overwrites the refresh-token slot. Returns false when the user is gone.
    async fn set_refresh_token(&self, id: Uuid, token: Option<&str>) -> anyhow::Result<bool>;
    /// Replaces the slot only if it still holds `current`.
    async fn swap_refresh_token(&self, id: Uuid, current: &str, next: &str)
        -> anyhow::Result<bool>;

    async fn wishlist(&self, user_id: Uuid) -> anyhow::Result<Vec<Uuid>>;
    async fn add_to_wishlist(&self, user_id: Uuid, listing_id: Uuid) -> anyhow::Result<()>;
    async fn remove_from_wishlist(&self, user_id: Uuid, listing_id: Uuid) -> anyhow::Result<()>;
}

const USER_COLUMNS: &str = "id, username, email, full_name, phone_number, hostel_name, \
    hostel_room_no, password_hash, refresh_token, created_at, updated_at";

#[derive(Clone)]
pub struct PgUserRepo {
    db: PgPool,
}

impl PgUserRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE username = $1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.db)
        .await
        .context("find user by username")?;
        Ok(user)
    }

    async fn find_by_login(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {}
              FROM users
             WHERE ($1::text IS NOT NULL AND username = $1)
                OR ($2::text IS NOT NULL AND email = $2)
             LIMIT 1
            "#,
            USER_COLUMNS
        ))
        .bind(username)
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find user by login")?;
        Ok(user)
    }

    async fn find_conflicting(
        &self,
        username: &str,
        email: &str,
        phone_number: &str,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {}
              FROM users
             WHERE username = $1 OR email = $2 OR phone_number = $3
             LIMIT 1
            "#,
            USER_COLUMNS
        ))
        .bind(username)
        .bind(email)
        .bind(phone_number)
        .fetch_optional(&self.db)
        .await
        .context("find conflicting user")?;
        Ok(user)
    }

    async fn find_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = ANY($1)",
            USER_COLUMNS
        ))
        .bind(ids)
        .fetch_all(&self.db)
        .await
        .context("find users by ids")?;
        Ok(users)
    }

    async fn create(&self, user: NewUser) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, email, full_name, phone_number,
                               hostel_name, hostel_room_no, password_hash)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.phone_number)
        .bind(&user.hostel_name)
        .bind(&user.hostel_room_no)
        .bind(&user.password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            if e.as_database_error().is_some_and(|d| d.is_unique_violation()) {
                anyhow::Error::new(DuplicateUser)
            } else {
                anyhow::Error::new(e).context("insert user")
            }
        })?;
        Ok(user)
    }

    async fn set_refresh_token(&self, id: Uuid, token: Option<&str>) -> anyhow::Result<bool> {
        let res = sqlx::query(
            "UPDATE users SET refresh_token = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(token)
        .execute(&self.db)
        .await
        .context("set refresh token")?;
        Ok(res.rows_affected() == 1)
    }

    async fn swap_refresh_token(
        &self,
        id: Uuid,
        current: &str,
        next: &str,
    ) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET refresh_token = $3, updated_at = now()
             WHERE id = $1 AND refresh_token = $2
            "#,
        )
        .bind(id)
        .bind(current)
        .bind(next)
        .execute(&self.db)
        .await
        .context("swap refresh token")?;
        Ok(res.rows_affected() == 1)
    }

    async fn wishlist(&self, user_id: Uuid) -> anyhow::Result<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT listing_id
              FROM wishlist_items
             WHERE user_id = $1
             ORDER BY added_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list wishlist")?;
        Ok(ids)
    }

    async fn add_to_wishlist(&self, user_id: Uuid, listing_id: Uuid) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO wishlist_items (user_id, listing_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(listing_id)
        .execute(&self.db)
        .await
        .context("add wishlist item")?;
        Ok(())
    }

    async fn remove_from_wishlist(&self, user_id: Uuid, listing_id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM wishlist_items WHERE user_id = $1 AND listing_id = $2")
            .bind(user_id)
            .bind(listing_id)
            .execute(&self.db)
            .await
            .context("remove wishlist item")?;
        Ok(())
    }
}
