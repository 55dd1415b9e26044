use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Closed set of listing categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "listing_category")]
pub enum Category {
    Books,
    Electronics,
    Stationery,
    Services,
    Other,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Books,
        Category::Electronics,
        Category::Stationery,
        Category::Services,
        Category::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Books => "Books",
            Category::Electronics => "Electronics",
            Category::Stationery => "Stationery",
            Category::Services => "Services",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s.trim())
            .ok_or_else(|| format!("Unknown category: {}", s))
    }
}

/// Listing row. `owner_id` is written once at insert and never updated.
#[derive(Debug, Clone, FromRow)]
pub struct Listing {
    pub id: Uuid,
    pub item_name: String,
    pub description: String,
    pub price: f64,
    pub category: Category,
    pub image_key: String,
    pub image_url: String,
    pub owner_id: Uuid,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewListing {
    pub item_name: String,
    pub description: String,
    pub price: f64,
    pub category: Category,
    pub image_key: String,
    pub image_url: String,
    pub owner_id: Uuid,
}

/// Partial overwrite; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct ListingPatch {
    pub item_name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub category: Option<Category>,
}

impl ListingPatch {
    pub fn is_empty(&self) -> bool {
        self.item_name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.category.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    UpdatedAt,
    Price,
    ItemName,
}

impl SortField {
    pub fn column(self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::Price => "price",
            SortField::ItemName => "item_name",
        }
    }
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "createdAt" => Ok(SortField::CreatedAt),
            "updatedAt" => Ok(SortField::UpdatedAt),
            "price" => Ok(SortField::Price),
            "itemName" => Ok(SortField::ItemName),
            other => Err(format!("Cannot sort by {}", other)),
        }
    }
}

/// Search criteria for the public listing index.
#[derive(Debug, Clone)]
pub struct ListingFilter {
    pub text: Option<String>,
    pub category: Option<Category>,
    pub sort: SortField,
    pub descending: bool,
    pub page: i64,
    pub limit: i64,
}

impl ListingFilter {
    /// Saturates, so a page far past the end just yields no rows.
    pub fn offset(&self) -> i64 {
        (self.page.max(1) - 1).saturating_mul(self.limit)
    }
}

impl Default for ListingFilter {
    fn default() -> Self {
        Self {
            text: None,
            category: None,
            sort: SortField::CreatedAt,
            descending: true,
            page: 1,
            limit: 10,
        }
    }
}
