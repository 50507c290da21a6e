use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{InterestDeclaration, Role};

// -- JWT Claims --

/// JWT claims issued at login/registration and checked by the auth middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub token: String,
}

// -- Profile --

/// Partial profile update; absent fields are left unchanged. An empty
/// `email` or `avatar_url` clears it.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

// -- Skills --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateSkillRequest {
    pub name: String,
}

// -- Interests --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeclareInterestRequest {
    pub skill_id: Uuid,
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeclareInterestResponse {
    pub declaration: InterestDeclaration,
    /// Counterparts of every match this declaration produced, as `@username`.
    pub matches_created: Vec<String>,
}

// -- Messages --

/// Body of a new message. Unknown fields (such as a `sender_id`) are ignored:
/// the author is always the authenticated caller.
#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub content: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    /// Polling cursor: only messages strictly newer than this are returned.
    pub after: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}
