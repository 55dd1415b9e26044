use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, patch, post},
    Router,
};
use axum_extra::extract::CookieJar;
use tracing::instrument;

use crate::{
    auth::{
        cookies::{self, REFRESH_COOKIE},
        dto::{
            LoginRequest, PublicUser, RefreshResponse, RegisterRequest, SessionResponse,
            WishlistResponse,
        },
        extractors::AuthUser,
        services,
    },
    error::ApiError,
    extract::ApiJson,
    listings::services::parse_listing_id,
    response::ApiResponse,
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/register", post(register))
        .route("/users/login", post(login))
        .route("/users/refresh-token", post(refresh))
        .route("/users/logout", post(logout))
        .route("/users/profile/:username", get(profile))
        .route("/users/wishlist", get(get_wishlist))
        .route("/users/wishlist/:listing_id", patch(toggle_wishlist))
}

#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, pair) = services::register(&state, payload).await?;
    let jar = cookies::with_refresh(jar, &state.config, pair.refresh_token);
    let (status, body) = ApiResponse::created(
        SessionResponse {
            user: PublicUser::from(&user),
            access_token: pair.access_token,
        },
        "User registered successfully",
    );
    Ok((status, jar, body))
}

#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, pair) = services::login(&state, payload).await?;
    let jar = cookies::with_session(
        jar,
        &state.config,
        pair.access_token.clone(),
        pair.refresh_token,
    );
    let (status, body) = ApiResponse::ok(
        SessionResponse {
            user: PublicUser::from(&user),
            access_token: pair.access_token,
        },
        "User logged in successfully",
    );
    Ok((status, jar, body))
}

#[instrument(skip_all)]
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    let presented = jar.get(REFRESH_COOKIE).map(|c| c.value().to_string());
    let (user, pair) = services::rotate(&state, presented.as_deref()).await?;
    let jar = cookies::with_session(
        jar,
        &state.config,
        pair.access_token.clone(),
        pair.refresh_token.clone(),
    );
    let (status, body) = ApiResponse::ok(
        RefreshResponse {
            user: PublicUser::from(&user),
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        },
        "Access token refreshed",
    );
    Ok((status, jar, body))
}

#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    services::logout(&state, user.id).await?;
    let (status, body) = ApiResponse::ok(serde_json::json!({}), "User logged out successfully");
    Ok((status, cookies::cleared(jar), body))
}

#[instrument(skip(state))]
pub async fn profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = services::profile(&state, &username).await?;
    Ok(ApiResponse::ok(profile, "User profile retrieved successfully"))
}

#[instrument(skip_all)]
pub async fn get_wishlist(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let listings = services::wishlisted_listings(&state, user.id).await?;
    Ok(ApiResponse::ok(listings, "Wishlist retrieved successfully"))
}

#[instrument(skip(state, user))]
pub async fn toggle_wishlist(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(listing_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let listing_id = parse_listing_id(&listing_id)?;
    let (action, wishlist) = services::toggle_wishlist(&state, user.id, listing_id).await?;
    Ok(ApiResponse::ok(WishlistResponse { wishlist }, action.message()))
}
