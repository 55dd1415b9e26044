use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::CookieJar;
use tracing::warn;

use crate::{
    auth::{cookies::ACCESS_COOKIE, jwt::JwtKeys, repo_types::User},
    error::ApiError,
    state::AppState,
};

/// The authenticated caller, resolved from the `accessToken` cookie.
/// Handlers that take this extractor are protected routes.
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(ACCESS_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ApiError::unauthorized("Unauthorized request"))?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify_access(&token).map_err(|e| {
            warn!(error = %e, "invalid or expired access token");
            ApiError::unauthorized("Invalid access token")
        })?;

        let user = state
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or_else(|| {
                warn!(user_id = %claims.sub, "access token for unknown user");
                ApiError::unauthorized("Invalid access token")
            })?;

        Ok(AuthUser(user))
    }
}
