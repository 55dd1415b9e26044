use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    auth::dto::PublicUser,
    error::ApiError,
    listings::repo_types::{Category, Listing, ListingFilter, ListingPatch, SortField},
};

pub const MAX_PAGE_SIZE: i64 = 100;

/// `owner` is either the bare id or the owner's public profile.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum OwnerField {
    Id(Uuid),
    Populated(PublicUser),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingResponse {
    pub id: Uuid,
    pub item_name: String,
    pub description: String,
    pub price: f64,
    pub category: Category,
    pub image_url: String,
    pub owner: OwnerField,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl ListingResponse {
    pub fn bare(l: Listing) -> Self {
        let owner = OwnerField::Id(l.owner_id);
        Self::with_owner(l, owner)
    }

    pub fn with_owner(l: Listing, owner: OwnerField) -> Self {
        Self {
            id: l.id,
            item_name: l.item_name,
            description: l.description,
            price: l.price,
            category: l.category,
            image_url: l.image_url,
            owner,
            created_at: l.created_at,
            updated_at: l.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub docs: Vec<T>,
    pub total_docs: i64,
    pub limit: i64,
    pub page: i64,
    pub total_pages: i64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl<T> Page<T> {
    pub fn new(docs: Vec<T>, total_docs: i64, page: i64, limit: i64) -> Self {
        let total_pages = if total_docs == 0 {
            0
        } else {
            (total_docs + limit - 1) / limit
        };
        Self {
            docs,
            total_docs,
            limit,
            page,
            total_pages,
            has_next_page: page < total_pages,
            has_prev_page: page > 1,
        }
    }
}

/// Raw query string for the listing index.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListingQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub query: Option<String>,
    pub category: Option<String>,
    pub sort_by: Option<String>,
    pub sort_type: Option<String>,
}

impl ListingQuery {
    pub fn into_filter(self) -> Result<ListingFilter, ApiError> {
        let defaults = ListingFilter::default();
        let category = non_blank(self.category)
            .map(|c| c.parse::<Category>())
            .transpose()
            .map_err(ApiError::Validation)?;
        let (sort, descending) = match non_blank(self.sort_by) {
            Some(field) => (
                field.parse::<SortField>().map_err(ApiError::Validation)?,
                self.sort_type.as_deref() == Some("desc"),
            ),
            None => (defaults.sort, defaults.descending),
        };
        Ok(ListingFilter {
            text: non_blank(self.query),
            category,
            sort,
            descending,
            page: self.page.unwrap_or(defaults.page).max(1),
            limit: self.limit.unwrap_or(defaults.limit).clamp(1, MAX_PAGE_SIZE),
        })
    }
}

/// Body of a listing update. Absent fields are left untouched.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateListingRequest {
    pub item_name: Option<String>,
    pub description: Option<String>,
    pub price: Option<serde_json::Value>,
    pub category: Option<String>,
}

impl UpdateListingRequest {
    pub fn into_patch(self) -> Result<ListingPatch, ApiError> {
        let patch = ListingPatch {
            item_name: self.item_name.map(|v| required_text("itemName", v)).transpose()?,
            description: self
                .description
                .map(|v| required_text("description", v))
                .transpose()?,
            price: self.price.map(|v| price_from_json(&v)).transpose()?,
            category: self
                .category
                .map(|c| c.parse::<Category>().map_err(ApiError::Validation))
                .transpose()?,
        };
        if patch.is_empty() {
            return Err(ApiError::validation("At least one field is required"));
        }
        Ok(patch)
    }
}

/// Text fields collected from the multipart create form.
#[derive(Debug, Default)]
pub struct CreateListingForm {
    pub item_name: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub category: Option<String>,
}

/// Validated create input, before the image is stored.
#[derive(Debug, Clone)]
pub struct ListingDraft {
    pub item_name: String,
    pub description: String,
    pub price: f64,
    pub category: Category,
}

impl CreateListingForm {
    pub fn set(&mut self, field: &str, value: String) {
        match field {
            "itemName" | "name" => self.item_name = Some(value),
            "description" => self.description = Some(value),
            "price" => self.price = Some(value),
            "category" => self.category = Some(value),
            _ => {}
        }
    }

    pub fn validate(self) -> Result<ListingDraft, ApiError> {
        let fields = [
            &self.item_name,
            &self.description,
            &self.price,
            &self.category,
        ];
        if fields.iter().any(|f| f.as_deref().map_or(true, |v| v.trim().is_empty())) {
            return Err(ApiError::validation("All fields are required"));
        }
        let item_name = required_text("itemName", self.item_name.unwrap_or_default())?;
        let description = required_text("description", self.description.unwrap_or_default())?;
        let price = parse_price(self.price.as_deref().unwrap_or_default())?;
        let category = self
            .category
            .unwrap_or_default()
            .parse::<Category>()
            .map_err(ApiError::Validation)?;
        Ok(ListingDraft {
            item_name,
            description,
            price,
            category,
        })
    }
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn required_text(field: &str, v: String) -> Result<String, ApiError> {
    let trimmed = v.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation(format!("{} must not be blank", field)));
    }
    Ok(trimmed.to_string())
}

fn parse_price(raw: &str) -> Result<f64, ApiError> {
    let price = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| ApiError::validation("price must be a number"))?;
    check_price(price)
}

fn price_from_json(v: &serde_json::Value) -> Result<f64, ApiError> {
    match v {
        serde_json::Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| ApiError::validation("price must be a number"))
            .and_then(check_price),
        serde_json::Value::String(s) => parse_price(s),
        _ => Err(ApiError::validation("price must be a number")),
    }
}

fn check_price(price: f64) -> Result<f64, ApiError> {
    if !price.is_finite() || price < 0.0 {
        return Err(ApiError::validation("price must be a non-negative number"));
    }
    Ok(price)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(name: &str, desc: &str, price: &str, category: &str) -> CreateListingForm {
        let mut f = CreateListingForm::default();
        f.set("itemName", name.into());
        f.set("description", desc.into());
        f.set("price", price.into());
        f.set("category", category.into());
        f
    }

    #[test]
    fn create_form_requires_every_field() {
        assert!(form("Calculus", "2nd ed", "12.5", "Books").validate().is_ok());
        for f in [
            form(" ", "2nd ed", "12.5", "Books"),
            form("Calculus", "", "12.5", "Books"),
            form("Calculus", "2nd ed", "", "Books"),
            form("Calculus", "2nd ed", "12.5", "  "),
        ] {
            let err = f.validate().unwrap_err();
            assert!(matches!(err, ApiError::Validation(_)));
        }
        let mut missing = CreateListingForm::default();
        missing.set("itemName", "Lamp".into());
        assert!(missing.validate().is_err());
    }

    #[test]
    fn create_form_rejects_bad_price_and_category() {
        assert!(form("Lamp", "desk", "-1", "Other").validate().is_err());
        assert!(form("Lamp", "desk", "cheap", "Other").validate().is_err());
        assert!(form("Lamp", "desk", "3", "Furniture").validate().is_err());
    }

    #[test]
    fn query_defaults_to_newest_first() {
        let filter = ListingQuery::default().into_filter().unwrap();
        assert_eq!(filter.sort, SortField::CreatedAt);
        assert!(filter.descending);
        assert_eq!((filter.page, filter.limit), (1, 10));
    }

    #[test]
    fn query_parses_sort_and_clamps_paging() {
        let q = ListingQuery {
            page: Some(0),
            limit: Some(1000),
            sort_by: Some("price".into()),
            sort_type: Some("asc".into()),
            category: Some("Electronics".into()),
            query: Some("  ".into()),
        };
        let filter = q.into_filter().unwrap();
        assert_eq!(filter.sort, SortField::Price);
        assert!(!filter.descending);
        assert_eq!(filter.page, 1);
        assert_eq!(filter.limit, MAX_PAGE_SIZE);
        assert_eq!(filter.category, Some(Category::Electronics));
        assert!(filter.text.is_none());

        let bad = ListingQuery {
            sort_by: Some("password".into()),
            ..Default::default()
        };
        assert!(bad.into_filter().is_err());
    }

    #[test]
    fn update_request_must_change_something() {
        assert!(UpdateListingRequest::default().into_patch().is_err());
        let req = UpdateListingRequest {
            price: Some(serde_json::json!(40)),
            ..Default::default()
        };
        assert_eq!(req.into_patch().unwrap().price, Some(40.0));
        let blank = UpdateListingRequest {
            item_name: Some("   ".into()),
            ..Default::default()
        };
        assert!(blank.into_patch().is_err());
    }

    #[test]
    fn page_math() {
        let page: Page<u8> = Page::new(vec![1, 2], 12, 2, 5);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next_page);
        assert!(page.has_prev_page);
        let empty: Page<u8> = Page::new(vec![], 0, 1, 10);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next_page);
    }
}
