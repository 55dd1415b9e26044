use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, Path, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tracing::instrument;

use crate::{
    auth::extractors::AuthUser,
    error::ApiError,
    extract::{ApiJson, ApiQuery},
    images::services::{is_image, UploadItem},
    listings::{
        dto::{CreateListingForm, ListingQuery, ListingResponse, UpdateListingRequest},
        services::{self, parse_listing_id},
    },
    response::ApiResponse,
    state::AppState,
};

const IMAGE_FIELD: &str = "listingImage";
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn listing_routes() -> Router<AppState> {
    Router::new()
        .route("/listings", get(search_listings))
        .route(
            "/listings/create",
            post(create_listing).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/listings/my-listings", get(my_listings))
        .route(
            "/listings/:listing_id",
            get(get_listing).patch(update_listing).delete(delete_listing),
        )
}

#[instrument(skip(state))]
pub async fn search_listings(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListingQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = query.into_filter()?;
    let page = services::search_listings(&state, filter).await?;
    Ok(ApiResponse::ok(page, "Listings retrieved successfully"))
}

/// POST /listings/create (multipart)
/// Text fields itemName, description, price, category plus one `listingImage` file.
/// Fields are validated before anything is uploaded.
#[instrument(skip_all)]
pub async fn create_listing(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let mut mp = multipart?;
    let mut form = CreateListingForm::default();
    let mut image: Option<UploadItem> = None;

    while let Some(field) = mp.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name == IMAGE_FIELD {
            let content_type = field
                .content_type()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "application/octet-stream".into());
            let body = field.bytes().await?;
            if !body.is_empty() {
                image = Some(UploadItem { body, content_type });
            }
        } else {
            let value = field.text().await?;
            form.set(&name, value);
        }
    }

    let draft = form.validate()?;
    let image = image.ok_or_else(|| ApiError::validation("Image file is required"))?;
    if !is_image(&image.content_type) {
        return Err(ApiError::validation("Listing image must be an image file"));
    }

    let listing = services::create_listing(&state, user.id, draft, image).await?;
    Ok(ApiResponse::created(
        ListingResponse::bare(listing),
        "Listing created successfully",
    ))
}

#[instrument(skip(state))]
pub async fn get_listing(
    State(state): State<AppState>,
    Path(listing_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_listing_id(&listing_id)?;
    let listing = services::get_listing(&state, id).await?;
    Ok(ApiResponse::ok(listing, "Listing retrieved successfully"))
}

#[instrument(skip(state, user, body))]
pub async fn update_listing(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(listing_id): Path<String>,
    ApiJson(body): ApiJson<UpdateListingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_listing_id(&listing_id)?;
    let patch = body.into_patch()?;
    let listing = services::update_listing(&state, id, user.id, patch).await?;
    Ok(ApiResponse::ok(
        ListingResponse::bare(listing),
        "Listing updated successfully",
    ))
}

#[instrument(skip(state, user))]
pub async fn delete_listing(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(listing_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_listing_id(&listing_id)?;
    services::delete_listing(&state, id, user.id).await?;
    Ok(ApiResponse::ok(
        serde_json::json!({}),
        "Listing deleted successfully",
    ))
}

#[instrument(skip_all)]
pub async fn my_listings(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let listings = services::list_mine(&state, user.id).await?;
    Ok(ApiResponse::ok(
        listings,
        "User listings retrieved successfully",
    ))
}
