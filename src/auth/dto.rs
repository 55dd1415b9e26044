use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{auth::repo_types::User, listings::dto::ListingResponse};

/// Request body for user registration.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterRequest {
    pub full_name: String,
    pub email: String,
    pub username: String,
    pub password: String,
    pub phone_number: String,
    pub hostel_name: String,
    pub hostel_room_no: String,
}

/// Request body for login. Either identifier may be used.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

/// Public part of the user returned to clients. Never carries the password
/// hash, the refresh token or the wishlist.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub phone_number: String,
    pub hostel_name: String,
    pub hostel_room_no: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<&User> for PublicUser {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            username: u.username.clone(),
            email: u.email.clone(),
            full_name: u.full_name.clone(),
            phone_number: u.phone_number.clone(),
            hostel_name: u.hostel_name.clone(),
            hostel_room_no: u.hostel_room_no.clone(),
            created_at: u.created_at,
        }
    }
}

/// Response data for register and login.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user: PublicUser,
    pub access_token: String,
}

/// Response data for token rotation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub user: PublicUser,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub user: PublicUser,
    pub listings: Vec<ListingResponse>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WishlistAction {
    Added,
    Removed,
}

impl WishlistAction {
    pub fn message(self) -> &'static str {
        match self {
            Self::Added => "Added to wishlist",
            Self::Removed => "Removed from wishlist",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WishlistResponse {
    pub wishlist: Vec<Uuid>,
}
