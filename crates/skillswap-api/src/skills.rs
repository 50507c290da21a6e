use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::info;
use uuid::Uuid;

use skillswap_types::api::{Claims, CreateSkillRequest};
use skillswap_types::models::Skill;

use crate::error::ApiError;
use crate::state::{AppState, blocking};

const MAX_SKILL_NAME_LEN: usize = 100;

/// GET /skills: the whole catalog, ordered by name.
pub async fn list_skills(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let rows = blocking(&state, |db| Ok(db.list_skills()?)).await?;
    let skills: Vec<Skill> = rows.into_iter().map(Skill::from).collect();
    Ok(Json(skills))
}

/// POST /skills: names are matched exactly (case-sensitive) after trimming.
pub async fn create_skill(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateSkillRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = req.name.trim().to_string();
    if name.is_empty() || name.chars().count() > MAX_SKILL_NAME_LEN {
        return Err(ApiError::Validation(format!(
            "skill name must be 1 to {} characters",
            MAX_SKILL_NAME_LEN
        )));
    }

    let id = Uuid::new_v4().to_string();
    let row = blocking(&state, move |db| Ok(db.create_skill(&id, &name)?)).await?;

    info!("Skill '{}' added by {}", row.name, claims.username);
    Ok((StatusCode::CREATED, Json(Skill::from(row))))
}
