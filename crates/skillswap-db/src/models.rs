//! Database row types. These map directly to SQLite rows, joined with the
//! usernames and skill names a response needs. Distinct from skillswap-types
//! API models to keep the DB layer independent.

use chrono::{DateTime, Utc};
use skillswap_types::models::{InterestDeclaration, Match, Message, Role, Skill, User};
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub bio: String,
    pub avatar_url: Option<String>,
    pub password: String,
    pub created_at: String,
}

/// Partial profile change. `None` leaves a column untouched.
#[derive(Debug, Default)]
pub struct UserUpdate<'a> {
    pub username: Option<&'a str>,
    pub email: Option<&'a str>,
    pub bio: Option<&'a str>,
    pub avatar_url: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillRow {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct InterestRow {
    pub id: String,
    pub user_id: String,
    pub username: String,
    pub skill_id: String,
    pub skill_name: String,
    pub role: Role,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct MatchRow {
    pub id: String,
    pub teacher_id: String,
    pub teacher_username: String,
    pub learner_id: String,
    pub learner_username: String,
    pub skill_id: String,
    pub skill_name: String,
    pub created_at: String,
}

impl MatchRow {
    pub fn involves(&self, user_id: &str) -> bool {
        self.teacher_id == user_id || self.learner_id == user_id
    }

    /// Username of the participant who is not `user_id`.
    pub fn counterpart_of(&self, user_id: &str) -> &str {
        if self.teacher_id == user_id {
            &self.learner_username
        } else {
            &self.teacher_username
        }
    }
}

#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: String,
    pub match_id: String,
    pub sender_id: String,
    pub sender_username: String,
    pub content: String,
    pub created_at: String,
}

// -- Row -> API model conversions --

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: parse_id(&row.id, "user id"),
            created_at: parse_timestamp(&row.created_at),
            username: row.username,
            email: row.email,
            bio: row.bio,
            avatar_url: row.avatar_url,
        }
    }
}

impl From<SkillRow> for Skill {
    fn from(row: SkillRow) -> Self {
        Self {
            id: parse_id(&row.id, "skill id"),
            name: row.name,
        }
    }
}

impl From<InterestRow> for InterestDeclaration {
    fn from(row: InterestRow) -> Self {
        Self {
            id: parse_id(&row.id, "interest id"),
            user_id: parse_id(&row.user_id, "interest user_id"),
            skill_id: parse_id(&row.skill_id, "interest skill_id"),
            created_at: parse_timestamp(&row.created_at),
            skill_name: row.skill_name,
            role: row.role,
        }
    }
}

impl From<MatchRow> for Match {
    fn from(row: MatchRow) -> Self {
        Self {
            id: parse_id(&row.id, "match id"),
            teacher_id: parse_id(&row.teacher_id, "match teacher_id"),
            learner_id: parse_id(&row.learner_id, "match learner_id"),
            skill_id: parse_id(&row.skill_id, "match skill_id"),
            created_at: parse_timestamp(&row.created_at),
            teacher_username: row.teacher_username,
            learner_username: row.learner_username,
            skill_name: row.skill_name,
        }
    }
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Self {
            id: parse_id(&row.id, "message id"),
            match_id: parse_id(&row.match_id, "message match_id"),
            sender_id: parse_id(&row.sender_id, "message sender_id"),
            timestamp: parse_timestamp(&row.created_at),
            sender_username: row.sender_username,
            content: row.content,
        }
    }
}

fn parse_id(raw: &str, field: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", field, raw, e);
        Uuid::default()
    })
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_timestamps_parse_to_the_microsecond() {
        let ts = parse_timestamp("2026-03-01T10:15:30.123456Z");
        assert_eq!(ts.timestamp(), 1772360130);
        assert_eq!(ts.timestamp_subsec_micros(), 123456);
    }

    #[test]
    fn unparseable_timestamp_falls_back_to_epoch() {
        assert_eq!(parse_timestamp("2026-03-01 10:15:30"), DateTime::<Utc>::default());
    }

    #[test]
    fn formatted_now_round_trips_and_sorts() {
        let earlier = crate::format_timestamp(chrono::Utc::now() - chrono::Duration::seconds(5));
        let later = crate::timestamp_now();
        assert!(earlier < later);
        assert!((parse_timestamp(&later) - chrono::Utc::now()).num_seconds().abs() < 5);
    }

    #[test]
    fn counterpart_is_the_other_participant() {
        let row = MatchRow {
            id: Uuid::new_v4().to_string(),
            teacher_id: "t".into(),
            teacher_username: "alice".into(),
            learner_id: "l".into(),
            learner_username: "bob".into(),
            skill_id: Uuid::new_v4().to_string(),
            skill_name: "Guitar".into(),
            created_at: crate::timestamp_now(),
        };
        assert_eq!(row.counterpart_of("t"), "bob");
        assert_eq!(row.counterpart_of("l"), "alice");
        assert!(row.involves("t") && row.involves("l") && !row.involves("x"));
    }
}
