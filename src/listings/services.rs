use std::collections::HashMap;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    auth::dto::PublicUser,
    error::ApiError,
    images::services::{discard_listing_image, upload_listing_image, UploadItem},
    listings::{
        dto::{ListingDraft, ListingResponse, OwnerField, Page},
        repo_types::{Listing, ListingFilter, ListingPatch, NewListing},
    },
    state::AppState,
};

pub fn parse_listing_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::validation("Invalid listing ID"))
}

/// Loads the listing and checks that `actor` owns it. Existence is checked
/// first, so a missing listing is a 404 for everyone.
pub async fn authorize_owner(
    st: &AppState,
    listing_id: Uuid,
    actor: Uuid,
    action: &str,
) -> Result<Listing, ApiError> {
    let listing = st
        .listings
        .find_by_id(listing_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Listing not found"))?;
    if listing.owner_id != actor {
        warn!(%listing_id, %actor, owner = %listing.owner_id, action, "ownership check failed");
        return Err(ApiError::forbidden(format!(
            "You are not authorized to {} this listing",
            action
        )));
    }
    Ok(listing)
}

/// Attaches each listing's owner profile.
pub async fn with_owners(
    st: &AppState,
    listings: Vec<Listing>,
) -> Result<Vec<ListingResponse>, ApiError> {
    let mut owner_ids: Vec<Uuid> = listings.iter().map(|l| l.owner_id).collect();
    owner_ids.sort();
    owner_ids.dedup();
    let owners: HashMap<Uuid, PublicUser> = st
        .users
        .find_many(&owner_ids)
        .await?
        .iter()
        .map(|u| (u.id, PublicUser::from(u)))
        .collect();

    Ok(listings
        .into_iter()
        .map(|l| {
            let owner = match owners.get(&l.owner_id) {
                Some(u) => OwnerField::Populated(u.clone()),
                None => OwnerField::Id(l.owner_id),
            };
            ListingResponse::with_owner(l, owner)
        })
        .collect())
}

/// Stores the image, then the record. If the insert fails the image is
/// removed again.
pub async fn create_listing(
    st: &AppState,
    owner_id: Uuid,
    draft: ListingDraft,
    image: UploadItem,
) -> Result<Listing, ApiError> {
    let stored = upload_listing_image(st.storage.as_ref(), owner_id, image)
        .await
        .map_err(|e| {
            error!(error = ?e, %owner_id, "image upload failed");
            ApiError::internal("Error while uploading image")
        })?;

    let created = st
        .listings
        .create(NewListing {
            item_name: draft.item_name,
            description: draft.description,
            price: draft.price,
            category: draft.category,
            image_key: stored.key.clone(),
            image_url: stored.url,
            owner_id,
        })
        .await;

    match created {
        Ok(listing) => {
            info!(listing_id = %listing.id, %owner_id, "listing created");
            Ok(listing)
        }
        Err(e) => {
            discard_listing_image(st.storage.as_ref(), &stored.key).await;
            Err(e.into())
        }
    }
}

pub async fn get_listing(st: &AppState, id: Uuid) -> Result<ListingResponse, ApiError> {
    let listing = st
        .listings
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Listing not found"))?;
    let mut populated = with_owners(st, vec![listing]).await?;
    populated
        .pop()
        .ok_or_else(|| ApiError::internal("Could not retrieve listing"))
}

pub async fn search_listings(
    st: &AppState,
    filter: ListingFilter,
) -> Result<Page<ListingResponse>, ApiError> {
    let (rows, total) = st.listings.search(&filter).await?;
    let docs = with_owners(st, rows).await?;
    Ok(Page::new(docs, total, filter.page, filter.limit))
}

pub async fn list_mine(st: &AppState, owner_id: Uuid) -> Result<Vec<ListingResponse>, ApiError> {
    Ok(st
        .listings
        .list_by_owner(owner_id)
        .await?
        .into_iter()
        .map(ListingResponse::bare)
        .collect())
}

pub async fn update_listing(
    st: &AppState,
    id: Uuid,
    actor: Uuid,
    patch: ListingPatch,
) -> Result<Listing, ApiError> {
    authorize_owner(st, id, actor, "update").await?;
    let updated = st
        .listings
        .update(id, patch)
        .await?
        .ok_or_else(|| ApiError::not_found("Listing not found"))?;
    info!(listing_id = %id, "listing updated");
    Ok(updated)
}

/// Deletes the record even if the media host refuses to drop the image.
pub async fn delete_listing(st: &AppState, id: Uuid, actor: Uuid) -> Result<(), ApiError> {
    let listing = authorize_owner(st, id, actor, "delete").await?;
    discard_listing_image(st.storage.as_ref(), &listing.image_key).await;
    st.listings.delete(id).await?;
    info!(listing_id = %id, "listing deleted");
    Ok(())
}
