use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{LoginRequest, ProfileResponse, PublicUser, RegisterRequest, WishlistAction},
        jwt::{JwtKeys, TokenPair},
        password::{hash_password, verify_password},
        repo::DuplicateUser,
        repo_types::{NewUser, User},
    },
    error::ApiError,
    listings::dto::ListingResponse,
    state::AppState,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn normalized(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty())
}

/// Mints a pair and makes its refresh token the user's only live one.
/// Nothing is returned unless the store accepted the new token.
pub async fn issue_token_pair(st: &AppState, user_id: Uuid) -> Result<TokenPair, ApiError> {
    const MSG: &str = "Something went wrong while generating refresh and access tokens";
    let keys = JwtKeys::from_ref(st);
    let pair = keys.sign_pair(user_id).map_err(|e| {
        error!(error = %e, %user_id, "jwt signing failed");
        ApiError::internal(MSG)
    })?;
    match st.users.set_refresh_token(user_id, Some(&pair.refresh_token)).await {
        Ok(true) => Ok(pair),
        Ok(false) => {
            error!(%user_id, "refresh token not stored: user missing");
            Err(ApiError::internal(MSG))
        }
        Err(e) => {
            error!(error = ?e, %user_id, "refresh token not stored");
            Err(ApiError::internal(MSG))
        }
    }
}

const DUPLICATE_USER: &str = "User with email, username, or phone number already exists";

pub async fn register(st: &AppState, req: RegisterRequest) -> Result<(User, TokenPair), ApiError> {
    let fields = [
        &req.full_name,
        &req.email,
        &req.username,
        &req.password,
        &req.phone_number,
        &req.hostel_name,
        &req.hostel_room_no,
    ];
    if fields.iter().any(|f| f.trim().is_empty()) {
        return Err(ApiError::validation("All fields are required"));
    }

    let username = req.username.trim().to_lowercase();
    let email = req.email.trim().to_lowercase();
    let phone_number = req.phone_number.trim().to_string();
    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(ApiError::validation("Invalid email"));
    }

    if st
        .users
        .find_conflicting(&username, &email, &phone_number)
        .await?
        .is_some()
    {
        warn!(%username, %email, "registration conflicts with existing user");
        return Err(ApiError::conflict(DUPLICATE_USER));
    }

    let password_hash = hash_password(&req.password)?;
    let user = st
        .users
        .create(NewUser {
            username,
            email,
            full_name: req.full_name.trim().to_string(),
            phone_number,
            hostel_name: req.hostel_name.trim().to_string(),
            hostel_room_no: req.hostel_room_no.trim().to_string(),
            password_hash,
        })
        .await
        .map_err(|e| {
            if e.is::<DuplicateUser>() {
                warn!("registration lost a race on a unique field");
                ApiError::conflict(DUPLICATE_USER)
            } else {
                ApiError::from(e)
            }
        })?;

    let pair = issue_token_pair(st, user.id).await?;
    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok((user, pair))
}

pub async fn login(st: &AppState, req: LoginRequest) -> Result<(User, TokenPair), ApiError> {
    let username = normalized(req.username);
    let email = normalized(req.email);
    if username.is_none() && email.is_none() {
        return Err(ApiError::validation("Username or email is required"));
    }

    let user = st
        .users
        .find_by_login(username.as_deref(), email.as_deref())
        .await?
        .ok_or_else(|| ApiError::not_found("User does not exist"))?;

    if !verify_password(&req.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::unauthorized("Invalid user credentials"));
    }

    let pair = issue_token_pair(st, user.id).await?;
    info!(user_id = %user.id, "user logged in");
    Ok((user, pair))
}

/// Exchanges the presented refresh token for a new pair. The presented
/// token must equal the stored one; the swap is conditional on it, so a
/// token can be redeemed at most once.
pub async fn rotate(st: &AppState, presented: Option<&str>) -> Result<(User, TokenPair), ApiError> {
    let presented = presented
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::unauthorized("Unauthorized request: No refresh token"))?;

    let keys = JwtKeys::from_ref(st);
    let claims = keys.verify_refresh(presented).map_err(|e| {
        warn!(error = %e, "refresh token failed verification");
        ApiError::unauthorized("Invalid refresh token")
    })?;

    let user = match st.users.find_by_id(claims.sub).await {
        Ok(Some(u)) => u,
        Ok(None) => return Err(ApiError::unauthorized("Invalid refresh token")),
        Err(e) => {
            error!(error = ?e, "refresh lookup failed");
            return Err(ApiError::unauthorized("Invalid refresh token"));
        }
    };

    const REUSED: &str = "Refresh token is expired or used";
    if user.refresh_token.as_deref() != Some(presented) {
        warn!(user_id = %user.id, "stale refresh token presented");
        return Err(ApiError::unauthorized(REUSED));
    }

    let pair = keys.sign_pair(user.id).map_err(|e| {
        error!(error = %e, user_id = %user.id, "jwt signing failed");
        ApiError::unauthorized("Invalid refresh token")
    })?;
    let swapped = st
        .users
        .swap_refresh_token(user.id, presented, &pair.refresh_token)
        .await
        .unwrap_or_else(|e| {
            error!(error = ?e, user_id = %user.id, "refresh token swap failed");
            false
        });
    if !swapped {
        warn!(user_id = %user.id, "refresh token redeemed concurrently");
        return Err(ApiError::unauthorized(REUSED));
    }

    info!(user_id = %user.id, "session rotated");
    Ok((user, pair))
}

pub async fn logout(st: &AppState, user_id: Uuid) -> Result<(), ApiError> {
    st.users.set_refresh_token(user_id, None).await?;
    info!(%user_id, "user logged out");
    Ok(())
}

/// Flips membership of `listing_id` in the caller's wishlist.
pub async fn toggle_wishlist(
    st: &AppState,
    user_id: Uuid,
    listing_id: Uuid,
) -> Result<(WishlistAction, Vec<Uuid>), ApiError> {
    let current = st.users.wishlist(user_id).await?;
    let action = if current.contains(&listing_id) {
        st.users.remove_from_wishlist(user_id, listing_id).await?;
        WishlistAction::Removed
    } else {
        if st.listings.find_by_id(listing_id).await?.is_none() {
            return Err(ApiError::not_found("Listing not found"));
        }
        st.users.add_to_wishlist(user_id, listing_id).await?;
        WishlistAction::Added
    };
    let wishlist = st.users.wishlist(user_id).await?;
    Ok((action, wishlist))
}

pub async fn wishlisted_listings(
    st: &AppState,
    user_id: Uuid,
) -> Result<Vec<ListingResponse>, ApiError> {
    let ids = st.users.wishlist(user_id).await?;
    let listings = st.listings.find_many(&ids).await?;
    crate::listings::services::with_owners(st, listings).await
}

pub async fn profile(st: &AppState, username: &str) -> Result<ProfileResponse, ApiError> {
    let username = username.trim().to_lowercase();
    if username.is_empty() {
        return Err(ApiError::validation("Username is missing"));
    }
    let user = st
        .users
        .find_by_username(&username)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    let listings = st
        .listings
        .list_by_owner(user.id)
        .await?
        .into_iter()
        .map(ListingResponse::bare)
        .collect();
    Ok(ProfileResponse {
        user: PublicUser::from(&user),
        listings,
    })
}
