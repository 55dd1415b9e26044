use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::listings::repo_types::{Listing, ListingFilter, ListingPatch, NewListing};

#[async_trait]
pub trait ListingRepo: Send + Sync {
    async fn create(&self, listing: NewListing) -> anyhow::Result<Listing>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Listing>>;
    async fn find_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Listing>>;
    /// Newest first.
    async fn list_by_owner(&self, owner_id: Uuid) -> anyhow::Result<Vec<Listing>>;
    /// One page of matches plus the total match count.
    async fn search(&self, filter: &ListingFilter) -> anyhow::Result<(Vec<Listing>, i64)>;
    async fn update(&self, id: Uuid, patch: ListingPatch) -> anyhow::Result<Option<Listing>>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
}

const LISTING_COLUMNS: &str = "id, item_name, description, price, category, image_key, \
    image_url, owner_id, created_at, updated_at";

#[derive(Clone)]
pub struct PgListingRepo {
    db: PgPool,
}

impl PgListingRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &ListingFilter) {
    qb.push(" WHERE TRUE");
    if let Some(text) = &filter.text {
        qb.push(
            " AND to_tsvector('english', item_name || ' ' || description) \
             @@ plainto_tsquery('english', ",
        )
        .push_bind(text.clone())
        .push(")");
    }
    if let Some(category) = filter.category {
        qb.push(" AND category = ").push_bind(category);
    }
}

#[async_trait]
impl ListingRepo for PgListingRepo {
    async fn create(&self, l: NewListing) -> anyhow::Result<Listing> {
        let listing = sqlx::query_as::<_, Listing>(&format!(
            r#"
            INSERT INTO listings (item_name, description, price, category,
                                  image_key, image_url, owner_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            LISTING_COLUMNS
        ))
        .bind(&l.item_name)
        .bind(&l.description)
        .bind(l.price)
        .bind(l.category)
        .bind(&l.image_key)
        .bind(&l.image_url)
        .bind(l.owner_id)
        .fetch_one(&self.db)
        .await
        .context("insert listing")?;
        Ok(listing)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Listing>> {
        let listing = sqlx::query_as::<_, Listing>(&format!(
            "SELECT {} FROM listings WHERE id = $1",
            LISTING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find listing by id")?;
        Ok(listing)
    }

    async fn find_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Listing>> {
        let rows = sqlx::query_as::<_, Listing>(&format!(
            "SELECT {} FROM listings WHERE id = ANY($1) ORDER BY created_at DESC",
            LISTING_COLUMNS
        ))
        .bind(ids)
        .fetch_all(&self.db)
        .await
        .context("find listings by ids")?;
        Ok(rows)
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> anyhow::Result<Vec<Listing>> {
        let rows = sqlx::query_as::<_, Listing>(&format!(
            "SELECT {} FROM listings WHERE owner_id = $1 ORDER BY created_at DESC",
            LISTING_COLUMNS
        ))
        .bind(owner_id)
        .fetch_all(&self.db)
        .await
        .context("list listings by owner")?;
        Ok(rows)
    }

    async fn search(&self, filter: &ListingFilter) -> anyhow::Result<(Vec<Listing>, i64)> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM listings");
        push_filter(&mut count, filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.db)
            .await
            .context("count listings")?;

        let mut qb =
            QueryBuilder::<Postgres>::new(format!("SELECT {} FROM listings", LISTING_COLUMNS));
        push_filter(&mut qb, filter);
        // Column names come from a closed enum, never from the request.
        qb.push(" ORDER BY ")
            .push(filter.sort.column())
            .push(if filter.descending { " DESC" } else { " ASC" })
            .push(", id ASC LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.offset());
        let rows = qb
            .build_query_as::<Listing>()
            .fetch_all(&self.db)
            .await
            .context("search listings")?;

        Ok((rows, total))
    }

    async fn update(&self, id: Uuid, patch: ListingPatch) -> anyhow::Result<Option<Listing>> {
        let listing = sqlx::query_as::<_, Listing>(&format!(
            r#"
            UPDATE listings
               SET item_name   = COALESCE($2, item_name),
                   description = COALESCE($3, description),
                   price       = COALESCE($4, price),
                   category    = COALESCE($5, category),
                   updated_at  = now()
             WHERE id = $1
            RETURNING {}
            "#,
            LISTING_COLUMNS
        ))
        .bind(id)
        .bind(patch.item_name)
        .bind(patch.description)
        .bind(patch.price)
        .bind(patch.category)
        .fetch_optional(&self.db)
        .await
        .context("update listing")?;
        Ok(listing)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM listings WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete listing")?;
        Ok(res.rows_affected() == 1)
    }
}
