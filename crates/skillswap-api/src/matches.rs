use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use skillswap_types::api::Claims;
use skillswap_types::models::Match;

use crate::error::ApiError;
use crate::state::{AppState, blocking};

/// GET /matches: every match where the caller is teacher or learner.
pub async fn list_matches(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = claims.sub.to_string();
    let rows = blocking(&state, move |db| Ok(db.list_matches_for_user(&uid)?)).await?;
    let matches: Vec<Match> = rows.into_iter().map(Match::from).collect();
    Ok(Json(matches))
}

/// DELETE /matches/{id}: either participant may delete; anyone else gets 403.
pub async fn delete_match(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let mid = match_id.to_string();
    let uid = claims.sub.to_string();
    blocking(&state, move |db| Ok(db.delete_match(&mid, &uid)?)).await?;

    info!("Match {} deleted by {}", match_id, claims.username);
    Ok(StatusCode::NO_CONTENT)
}
