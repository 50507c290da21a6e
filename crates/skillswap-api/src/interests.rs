use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use skillswap_types::api::{Claims, DeclareInterestRequest, DeclareInterestResponse};
use skillswap_types::models::InterestDeclaration;

use crate::error::ApiError;
use crate::matching;
use crate::state::{AppState, blocking};

/// GET /interests: the caller's own declarations.
pub async fn list_interests(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = claims.sub.to_string();
    let rows = blocking(&state, move |db| Ok(db.list_interests_for_user(&uid)?)).await?;
    let declarations: Vec<InterestDeclaration> =
        rows.into_iter().map(InterestDeclaration::from).collect();
    Ok(Json(declarations))
}

/// POST /interests: store the declaration, then match it against every
/// complementary declaration before responding.
pub async fn declare_interest(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<DeclareInterestRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = claims.sub.to_string();
    let (row, created) = blocking(&state, move |db| {
        let row = db.insert_interest(
            &Uuid::new_v4().to_string(),
            &uid,
            &req.skill_id.to_string(),
            req.role,
        )?;
        let created = matching::run(db, &row)?;
        Ok((row, created))
    })
    .await?;

    let matches_created: Vec<String> = created
        .iter()
        .map(|m| format!("@{}", m.counterpart_of(&row.user_id)))
        .collect();

    info!(
        "{} declared {} {} ({} new matches)",
        claims.username,
        row.role,
        row.skill_name,
        matches_created.len()
    );

    Ok((
        StatusCode::CREATED,
        Json(DeclareInterestResponse {
            declaration: row.into(),
            matches_created,
        }),
    ))
}

/// GET /interests/{id}
pub async fn get_interest(
    State(state): State<AppState>,
    Path(interest_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let iid = interest_id.to_string();
    let row = blocking(&state, move |db| Ok(db.get_interest(&iid)?))
        .await?
        .ok_or(ApiError::NotFound("interest"))?;

    if row.user_id != claims.sub.to_string() {
        return Err(ApiError::Forbidden);
    }
    Ok(Json(InterestDeclaration::from(row)))
}

/// PUT /interests/{id}: change skill and/or role. Does not re-run matching.
pub async fn update_interest(
    State(state): State<AppState>,
    Path(interest_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<DeclareInterestRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let iid = interest_id.to_string();
    let uid = claims.sub.to_string();
    let row = blocking(&state, move |db| {
        Ok(db.update_interest(&iid, &uid, &req.skill_id.to_string(), req.role)?)
    })
    .await?;

    Ok(Json(InterestDeclaration::from(row)))
}

/// DELETE /interests/{id}: existing matches are kept.
pub async fn delete_interest(
    State(state): State<AppState>,
    Path(interest_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let iid = interest_id.to_string();
    let uid = claims.sub.to_string();
    blocking(&state, move |db| Ok(db.delete_interest(&iid, &uid)?)).await?;
    Ok(StatusCode::NO_CONTENT)
}
