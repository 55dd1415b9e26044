use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String, // stored lower-cased
    pub email: String,    // stored lower-cased
    pub full_name: String,
    pub phone_number: String,
    pub hostel_name: String,
    pub hostel_room_no: String,
    pub password_hash: String, // Argon2 hash
    pub refresh_token: Option<String>, // the single live refresh token, if any
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Fields needed to insert a user; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub phone_number: String,
    pub hostel_name: String,
    pub hostel_room_no: String,
    pub password_hash: String,
}
