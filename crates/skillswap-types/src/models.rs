use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Which side of a skill exchange a declaration sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Teach,
    Learn,
}

impl Role {
    /// The role a counterpart must hold to pair with this one.
    pub fn opposite(self) -> Self {
        match self {
            Self::Teach => Self::Learn,
            Self::Learn => Self::Teach,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Teach => "teach",
            Self::Learn => "learn",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown role '{0}', expected 'teach' or 'learn'")]
pub struct ParseRoleError(pub String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "teach" => Ok(Self::Teach),
            "learn" => Ok(Self::Learn),
            other => Err(ParseRoleError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub bio: String,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub id: Uuid,
    pub name: String,
}

/// A user's stated role for one skill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterestDeclaration {
    pub id: Uuid,
    pub user_id: Uuid,
    pub skill_id: Uuid,
    pub skill_name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// A realized pairing. Direction matters: `(teacher, learner, skill)` is the
/// uniqueness key, so `(A, B, S)` and `(B, A, S)` are different matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub id: Uuid,
    pub teacher_id: Uuid,
    pub teacher_username: String,
    pub learner_id: Uuid,
    pub learner_username: String,
    pub skill_id: Uuid,
    pub skill_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub match_id: Uuid,
    pub sender_id: Uuid,
    pub sender_username: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}
