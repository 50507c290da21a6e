use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use skillswap_db::{Database, format_timestamp};
use skillswap_types::api::{Claims, MessageQuery, PostMessageRequest};
use skillswap_types::models::Message;

use crate::error::ApiError;
use crate::state::{AppState, blocking};

const MAX_PAGE: u32 = 200;
const MAX_CONTENT_LEN: usize = 4000;

/// GET /matches/{id}/messages: oldest first. Clients poll with `after` set
/// to the timestamp of the newest message they hold.
pub async fn list_messages(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
    Query(query): Query<MessageQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let mid = match_id.to_string();
    let uid = claims.sub.to_string();
    let after = query.after.map(format_timestamp);
    let limit = query.limit.map(|l| l.min(MAX_PAGE));

    let rows = blocking(&state, move |db| {
        ensure_participant(db, &mid, &uid)?;
        Ok(db.list_messages(&mid, after.as_deref(), limit)?)
    })
    .await?;

    let messages: Vec<Message> = rows.into_iter().map(Message::from).collect();
    Ok(Json(messages))
}

/// POST /matches/{id}/messages: the sender is always the caller.
pub async fn post_message(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<PostMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.content.trim().is_empty() {
        return Err(ApiError::Validation("message content must not be empty".into()));
    }
    if req.content.chars().count() > MAX_CONTENT_LEN {
        return Err(ApiError::Validation(format!(
            "message content must be at most {} characters",
            MAX_CONTENT_LEN
        )));
    }

    let mid = match_id.to_string();
    let uid = claims.sub.to_string();
    let row = blocking(&state, move |db| {
        ensure_participant(db, &mid, &uid)?;
        Ok(db.insert_message(&Uuid::new_v4().to_string(), &mid, &uid, &req.content)?)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(Message::from(row))))
}

fn ensure_participant(db: &Database, match_id: &str, user_id: &str) -> Result<(), ApiError> {
    let row = db.get_match(match_id)?.ok_or(ApiError::NotFound("match"))?;
    if !row.involves(user_id) {
        return Err(ApiError::Forbidden);
    }
    Ok(())
}
