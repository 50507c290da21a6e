use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::info;

use skillswap_db::models::UserUpdate;
use skillswap_types::api::{Claims, UpdateProfileRequest};
use skillswap_types::models::User;

use crate::auth::validate_username;
use crate::error::ApiError;
use crate::state::{AppState, blocking};

const MAX_BIO_LEN: usize = 2000;
const MAX_AVATAR_URL_LEN: usize = 2048;

/// GET /user
pub async fn get_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = claims.sub.to_string();
    let row = blocking(&state, move |db| Ok(db.get_user_by_id(&uid)?))
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    Ok(Json(User::from(row)))
}

/// PATCH /user: partial update of the caller's profile.
pub async fn update_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(username) = &req.username {
        validate_username(username)?;
    }
    if req.bio.as_ref().is_some_and(|bio| bio.chars().count() > MAX_BIO_LEN) {
        return Err(ApiError::Validation(format!(
            "bio must be at most {} characters",
            MAX_BIO_LEN
        )));
    }
    if let Some(url) = req.avatar_url.as_deref().filter(|url| !url.is_empty()) {
        validate_avatar_url(url)?;
    }

    let uid = claims.sub.to_string();
    let row = blocking(&state, move |db| {
        let update = UserUpdate {
            username: req.username.as_deref(),
            email: req.email.as_deref(),
            bio: req.bio.as_deref(),
            avatar_url: req.avatar_url.as_deref(),
        };
        Ok(db.update_user(&uid, &update)?)
    })
    .await?;

    Ok(Json(User::from(row)))
}

/// DELETE /user: removes the account and, by cascade, everything it owns.
pub async fn delete_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = claims.sub.to_string();
    blocking(&state, move |db| Ok(db.delete_user(&uid)?)).await?;

    info!("Deleted account {}", claims.username);
    Ok(StatusCode::NO_CONTENT)
}

/// Avatars are links to images hosted elsewhere; only http(s) URLs are kept.
fn validate_avatar_url(url: &str) -> Result<(), ApiError> {
    if url.chars().count() > MAX_AVATAR_URL_LEN {
        return Err(ApiError::Validation(format!(
            "avatar_url must be at most {} characters",
            MAX_AVATAR_URL_LEN
        )));
    }
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        return Err(ApiError::Validation("avatar_url must be an http(s) URL".into()));
    }
    Ok(())
}
