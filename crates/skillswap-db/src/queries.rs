use chrono::{DateTime, Duration, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use skillswap_types::models::Role;

use crate::error::{Constraint, constraint_of};
use crate::models::{InterestRow, MatchRow, MessageRow, SkillRow, UserRow, UserUpdate};
use crate::{Database, StoreError, StoreResult, format_timestamp, timestamp_now};

const USER_SELECT: &str =
    "SELECT id, username, email, bio, avatar_url, password, created_at FROM users";

const INTEREST_SELECT: &str = "
    SELECT i.id, i.user_id, u.username, i.skill_id, s.name, i.role, i.created_at
    FROM interests i
    JOIN users u ON u.id = i.user_id
    JOIN skills s ON s.id = i.skill_id";

const MATCH_SELECT: &str = "
    SELECT m.id, m.teacher_id, t.username, m.learner_id, l.username,
           m.skill_id, s.name, m.created_at
    FROM matches m
    JOIN users t ON t.id = m.teacher_id
    JOIN users l ON l.id = m.learner_id
    JOIN skills s ON s.id = m.skill_id";

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        email: Option<&str>,
        password_hash: &str,
    ) -> StoreResult<UserRow> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, email, password, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, username, email, password_hash, timestamp_now()],
            )
            .map_err(|e| match constraint_of(&e) {
                Some(Constraint::Unique) => StoreError::UsernameTaken(username.to_string()),
                _ => e.into(),
            })?;
            query_user_by_id(conn, id)?.ok_or(StoreError::NotFound("user"))
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> StoreResult<Option<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!("{USER_SELECT} WHERE username = ?1");
            Ok(conn.query_row(&sql, [username], map_user).optional()?)
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> StoreResult<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    /// Apply a partial profile update. `None` fields keep their value; an
    /// empty `email` or `avatar_url` clears it.
    pub fn update_user(&self, id: &str, update: &UserUpdate<'_>) -> StoreResult<UserRow> {
        self.with_conn_mut(|conn| {
            let changed = conn
                .execute(
                    "UPDATE users
                     SET username = COALESCE(?2, username),
                         email = CASE WHEN ?3 IS NULL THEN email ELSE NULLIF(?3, '') END,
                         bio = COALESCE(?4, bio),
                         avatar_url = CASE WHEN ?5 IS NULL THEN avatar_url ELSE NULLIF(?5, '') END
                     WHERE id = ?1",
                    params![id, update.username, update.email, update.bio, update.avatar_url],
                )
                .map_err(|e| match constraint_of(&e) {
                    Some(Constraint::Unique) => {
                        StoreError::UsernameTaken(update.username.unwrap_or_default().to_string())
                    }
                    _ => e.into(),
                })?;
            if changed == 0 {
                return Err(StoreError::NotFound("user"));
            }
            query_user_by_id(conn, id)?.ok_or(StoreError::NotFound("user"))
        })
    }

    /// Delete an account. Declarations, matches and messages go with it via
    /// `ON DELETE CASCADE`.
    pub fn delete_user(&self, id: &str) -> StoreResult<()> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
            if deleted == 0 {
                return Err(StoreError::NotFound("user"));
            }
            Ok(())
        })
    }

    // -- Skills --

    pub fn create_skill(&self, id: &str, name: &str) -> StoreResult<SkillRow> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO skills (id, name) VALUES (?1, ?2)",
                params![id, name],
            )
            .map_err(|e| match constraint_of(&e) {
                Some(Constraint::Unique) => StoreError::SkillExists(name.to_string()),
                _ => e.into(),
            })?;
            Ok(SkillRow {
                id: id.to_string(),
                name: name.to_string(),
            })
        })
    }

    pub fn list_skills(&self) -> StoreResult<Vec<SkillRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name FROM skills ORDER BY name")?;
            let rows = stmt
                .query_map([], map_skill)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_skill(&self, id: &str) -> StoreResult<Option<SkillRow>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row("SELECT id, name FROM skills WHERE id = ?1", [id], map_skill)
                .optional()?)
        })
    }

    // -- Interests --

    /// Record a declaration. Uniqueness of `(user, skill, role)` is enforced
    /// by the table, not by a pre-check.
    pub fn insert_interest(
        &self,
        id: &str,
        user_id: &str,
        skill_id: &str,
        role: Role,
    ) -> StoreResult<InterestRow> {
        self.with_conn_mut(|conn| {
            if !skill_exists(conn, skill_id)? {
                return Err(StoreError::NotFound("skill"));
            }

            conn.execute(
                "INSERT INTO interests (id, user_id, skill_id, role, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, user_id, skill_id, role.as_str(), timestamp_now()],
            )
            .map_err(|e| match constraint_of(&e) {
                Some(Constraint::Unique) => StoreError::DuplicateDeclaration,
                Some(Constraint::ForeignKey) => StoreError::MissingReference,
                _ => e.into(),
            })?;

            query_interest_by_id(conn, id)?.ok_or(StoreError::NotFound("interest"))
        })
    }

    pub fn get_interest(&self, id: &str) -> StoreResult<Option<InterestRow>> {
        self.with_conn(|conn| query_interest_by_id(conn, id))
    }

    pub fn list_interests_for_user(&self, user_id: &str) -> StoreResult<Vec<InterestRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{INTEREST_SELECT} WHERE i.user_id = ?1 ORDER BY i.created_at, i.rowid"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], map_interest)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Declarations for `skill_id` holding `role`, excluding the rows of
    /// `exclude_user`. Returned in creation order.
    pub fn list_declarations(
        &self,
        skill_id: &str,
        role: Role,
        exclude_user: &str,
    ) -> StoreResult<Vec<InterestRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{INTEREST_SELECT}
                 WHERE i.skill_id = ?1 AND i.role = ?2 AND i.user_id <> ?3
                 ORDER BY i.created_at, i.rowid"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![skill_id, role.as_str(), exclude_user], map_interest)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Change the skill and/or role of an owned declaration. Matching is not
    /// re-run; existing matches are left as they are.
    pub fn update_interest(
        &self,
        id: &str,
        owner_id: &str,
        skill_id: &str,
        role: Role,
    ) -> StoreResult<InterestRow> {
        self.with_conn_mut(|conn| {
            let owner: Option<String> = conn
                .query_row("SELECT user_id FROM interests WHERE id = ?1", [id], |row| {
                    row.get(0)
                })
                .optional()?;
            match owner {
                None => return Err(StoreError::NotFound("interest")),
                Some(owner) if owner != owner_id => return Err(StoreError::Forbidden),
                Some(_) => {}
            }
            if !skill_exists(conn, skill_id)? {
                return Err(StoreError::NotFound("skill"));
            }

            conn.execute(
                "UPDATE interests SET skill_id = ?2, role = ?3 WHERE id = ?1",
                params![id, skill_id, role.as_str()],
            )
            .map_err(|e| match constraint_of(&e) {
                Some(Constraint::Unique) => StoreError::DuplicateDeclaration,
                _ => e.into(),
            })?;

            query_interest_by_id(conn, id)?.ok_or(StoreError::NotFound("interest"))
        })
    }

    pub fn delete_interest(&self, id: &str, owner_id: &str) -> StoreResult<()> {
        self.with_conn_mut(|conn| {
            let owner: Option<String> = conn
                .query_row("SELECT user_id FROM interests WHERE id = ?1", [id], |row| {
                    row.get(0)
                })
                .optional()?;
            match owner {
                None => Err(StoreError::NotFound("interest")),
                Some(owner) if owner != owner_id => Err(StoreError::Forbidden),
                Some(_) => {
                    conn.execute("DELETE FROM interests WHERE id = ?1", [id])?;
                    Ok(())
                }
            }
        })
    }

    // -- Matches --

    pub fn match_exists(
        &self,
        teacher_id: &str,
        learner_id: &str,
        skill_id: &str,
    ) -> StoreResult<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM matches
                     WHERE teacher_id = ?1 AND learner_id = ?2 AND skill_id = ?3",
                    params![teacher_id, learner_id, skill_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Insert a match for the directed `(teacher, learner, skill)` triple.
    ///
    /// The unique index on that triple is the only arbiter between concurrent
    /// creators: the loser gets `StoreError::MatchExists`.
    pub fn create_match(
        &self,
        id: &str,
        teacher_id: &str,
        learner_id: &str,
        skill_id: &str,
    ) -> StoreResult<MatchRow> {
        if teacher_id == learner_id {
            return Err(StoreError::SelfMatch);
        }

        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO matches (id, teacher_id, learner_id, skill_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, teacher_id, learner_id, skill_id, timestamp_now()],
            )
            .map_err(|e| match constraint_of(&e) {
                Some(Constraint::Unique) => StoreError::MatchExists,
                Some(Constraint::Check) => StoreError::SelfMatch,
                Some(Constraint::ForeignKey) => StoreError::MissingReference,
                None => e.into(),
            })?;

            query_match_by_id(conn, id)?.ok_or(StoreError::NotFound("match"))
        })
    }

    pub fn get_match(&self, id: &str) -> StoreResult<Option<MatchRow>> {
        self.with_conn(|conn| query_match_by_id(conn, id))
    }

    /// Matches where `user_id` is teacher or learner, newest first.
    pub fn list_matches_for_user(&self, user_id: &str) -> StoreResult<Vec<MatchRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{MATCH_SELECT}
                 WHERE m.teacher_id = ?1 OR m.learner_id = ?1
                 ORDER BY m.created_at DESC, m.rowid DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], map_match)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Delete a match on behalf of one of its participants. Its messages are
    /// removed by cascade.
    pub fn delete_match(&self, id: &str, requester_id: &str) -> StoreResult<()> {
        self.with_conn_mut(|conn| {
            let participants: Option<(String, String)> = conn
                .query_row(
                    "SELECT teacher_id, learner_id FROM matches WHERE id = ?1",
                    [id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            let (teacher_id, learner_id) = participants.ok_or(StoreError::NotFound("match"))?;
            if requester_id != teacher_id && requester_id != learner_id {
                return Err(StoreError::Forbidden);
            }

            conn.execute("DELETE FROM matches WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    // -- Messages --

    pub fn insert_message(
        &self,
        id: &str,
        match_id: &str,
        sender_id: &str,
        content: &str,
    ) -> StoreResult<MessageRow> {
        self.with_conn_mut(|conn| {
            let created_at = next_message_timestamp(conn, match_id)?;
            conn.execute(
                "INSERT INTO messages (id, match_id, sender_id, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, match_id, sender_id, content, created_at],
            )
            .map_err(|e| match constraint_of(&e) {
                Some(Constraint::ForeignKey) => StoreError::MissingReference,
                _ => e.into(),
            })?;

            let sender_username: String = conn.query_row(
                "SELECT username FROM users WHERE id = ?1",
                [sender_id],
                |row| row.get(0),
            )?;

            Ok(MessageRow {
                id: id.to_string(),
                match_id: match_id.to_string(),
                sender_id: sender_id.to_string(),
                sender_username,
                content: content.to_string(),
                created_at,
            })
        })
    }

    /// Messages of a match, oldest first. `after` is an exclusive timestamp
    /// cursor; `limit` of `None` returns everything.
    pub fn list_messages(
        &self,
        match_id: &str,
        after: Option<&str>,
        limit: Option<u32>,
    ) -> StoreResult<Vec<MessageRow>> {
        self.with_conn(|conn| query_messages(conn, match_id, after, limit))
    }
}

/// Message timestamps strictly increase within a match, even across a clock
/// step backwards, so the exclusive `after` cursor never skips a message.
/// Runs on the writer connection, which serializes concurrent senders.
fn next_message_timestamp(conn: &Connection, match_id: &str) -> StoreResult<String> {
    let now = Utc::now().trunc_subsecs(6);
    let last: Option<String> = conn.query_row(
        "SELECT MAX(created_at) FROM messages WHERE match_id = ?1",
        [match_id],
        |row| row.get(0),
    )?;

    let last = last
        .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
        .map(|dt| dt.with_timezone(&Utc));
    let next = match last {
        Some(last) if last >= now => last + Duration::microseconds(1),
        _ => now,
    };
    Ok(format_timestamp(next))
}

fn skill_exists(conn: &Connection, skill_id: &str) -> StoreResult<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM skills WHERE id = ?1", [skill_id], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

fn query_user_by_id(conn: &Connection, id: &str) -> StoreResult<Option<UserRow>> {
    let sql = format!("{USER_SELECT} WHERE id = ?1");
    Ok(conn.query_row(&sql, [id], map_user).optional()?)
}

fn query_interest_by_id(conn: &Connection, id: &str) -> StoreResult<Option<InterestRow>> {
    let sql = format!("{INTEREST_SELECT} WHERE i.id = ?1");
    Ok(conn.query_row(&sql, [id], map_interest).optional()?)
}

fn query_match_by_id(conn: &Connection, id: &str) -> StoreResult<Option<MatchRow>> {
    let sql = format!("{MATCH_SELECT} WHERE m.id = ?1");
    Ok(conn.query_row(&sql, [id], map_match).optional()?)
}

fn query_messages(
    conn: &Connection,
    match_id: &str,
    after: Option<&str>,
    limit: Option<u32>,
) -> StoreResult<Vec<MessageRow>> {
    // JOIN users to fetch sender_username in a single query. LIMIT -1 is unbounded.
    let mut stmt = conn.prepare(
        "SELECT g.id, g.match_id, g.sender_id, u.username, g.content, g.created_at
         FROM messages g
         JOIN users u ON u.id = g.sender_id
         WHERE g.match_id = ?1 AND (?2 IS NULL OR g.created_at > ?2)
         ORDER BY g.created_at ASC, g.rowid ASC
         LIMIT ?3",
    )?;

    let limit = limit.map(i64::from).unwrap_or(-1);
    let rows = stmt
        .query_map(params![match_id, after, limit], |row| {
            Ok(MessageRow {
                id: row.get(0)?,
                match_id: row.get(1)?,
                sender_id: row.get(2)?,
                sender_username: row.get(3)?,
                content: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        bio: row.get(3)?,
        avatar_url: row.get(4)?,
        password: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn map_skill(row: &Row<'_>) -> rusqlite::Result<SkillRow> {
    Ok(SkillRow {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

fn map_interest(row: &Row<'_>) -> rusqlite::Result<InterestRow> {
    Ok(InterestRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        username: row.get(2)?,
        skill_id: row.get(3)?,
        skill_name: row.get(4)?,
        role: role_column(row, 5)?,
        created_at: row.get(6)?,
    })
}

fn map_match(row: &Row<'_>) -> rusqlite::Result<MatchRow> {
    Ok(MatchRow {
        id: row.get(0)?,
        teacher_id: row.get(1)?,
        teacher_username: row.get(2)?,
        learner_id: row.get(3)?,
        learner_username: row.get(4)?,
        skill_id: row.get(5)?,
        skill_name: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn role_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Role> {
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn test_db() -> (TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("test.db")).unwrap();
        (dir, db)
    }

    fn new_id() -> String {
        Uuid::new_v4().to_string()
    }

    fn user(db: &Database, name: &str) -> String {
        let id = new_id();
        db.create_user(&id, name, None, "hash").unwrap();
        id
    }

    fn skill(db: &Database, name: &str) -> String {
        let id = new_id();
        db.create_skill(&id, name).unwrap();
        id
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let (_dir, db) = test_db();
        user(&db, "alice");
        let err = db.create_user(&new_id(), "alice", None, "hash").unwrap_err();
        assert!(matches!(err, StoreError::UsernameTaken(name) if name == "alice"));
    }

    #[test]
    fn skill_names_are_unique_and_case_sensitive() {
        let (_dir, db) = test_db();
        skill(&db, "Guitar");
        skill(&db, "guitar");
        let err = db.create_skill(&new_id(), "Guitar").unwrap_err();
        assert!(matches!(err, StoreError::SkillExists(_)));

        let names: Vec<String> = db.list_skills().unwrap().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Guitar", "guitar"]);
    }

    #[test]
    fn same_role_twice_is_a_duplicate_but_both_roles_are_allowed() {
        let (_dir, db) = test_db();
        let alice = user(&db, "alice");
        let guitar = skill(&db, "Guitar");

        db.insert_interest(&new_id(), &alice, &guitar, Role::Teach).unwrap();
        db.insert_interest(&new_id(), &alice, &guitar, Role::Learn).unwrap();

        let err = db
            .insert_interest(&new_id(), &alice, &guitar, Role::Teach)
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateDeclaration));
        assert_eq!(db.list_interests_for_user(&alice).unwrap().len(), 2);
    }

    #[test]
    fn declaring_an_unknown_skill_is_not_found() {
        let (_dir, db) = test_db();
        let alice = user(&db, "alice");
        let err = db
            .insert_interest(&new_id(), &alice, &new_id(), Role::Learn)
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound("skill")));
    }

    #[test]
    fn list_declarations_filters_role_and_excludes_user() {
        let (_dir, db) = test_db();
        let alice = user(&db, "alice");
        let bob = user(&db, "bob");
        let carol = user(&db, "carol");
        let guitar = skill(&db, "Guitar");
        let piano = skill(&db, "Piano");

        db.insert_interest(&new_id(), &alice, &guitar, Role::Teach).unwrap();
        db.insert_interest(&new_id(), &bob, &guitar, Role::Teach).unwrap();
        db.insert_interest(&new_id(), &carol, &guitar, Role::Learn).unwrap();
        db.insert_interest(&new_id(), &carol, &piano, Role::Teach).unwrap();

        let teachers = db.list_declarations(&guitar, Role::Teach, &alice).unwrap();
        assert_eq!(teachers.len(), 1);
        assert_eq!(teachers[0].username, "bob");
        assert_eq!(teachers[0].skill_name, "Guitar");
        assert_eq!(teachers[0].role, Role::Teach);
    }

    #[test]
    fn update_interest_enforces_owner_and_uniqueness() {
        let (_dir, db) = test_db();
        let alice = user(&db, "alice");
        let bob = user(&db, "bob");
        let guitar = skill(&db, "Guitar");

        let teach = db.insert_interest(&new_id(), &alice, &guitar, Role::Teach).unwrap();
        let learn = db.insert_interest(&new_id(), &alice, &guitar, Role::Learn).unwrap();

        let err = db.update_interest(&learn.id, &bob, &guitar, Role::Learn).unwrap_err();
        assert!(matches!(err, StoreError::Forbidden));

        let err = db.update_interest(&learn.id, &alice, &guitar, Role::Teach).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateDeclaration));

        db.delete_interest(&teach.id, &alice).unwrap();
        let updated = db.update_interest(&learn.id, &alice, &guitar, Role::Teach).unwrap();
        assert_eq!(updated.role, Role::Teach);
    }

    #[test]
    fn delete_interest_requires_owner() {
        let (_dir, db) = test_db();
        let alice = user(&db, "alice");
        let bob = user(&db, "bob");
        let guitar = skill(&db, "Guitar");
        let row = db.insert_interest(&new_id(), &alice, &guitar, Role::Teach).unwrap();

        assert!(matches!(db.delete_interest(&row.id, &bob), Err(StoreError::Forbidden)));
        db.delete_interest(&row.id, &alice).unwrap();
        assert!(matches!(
            db.delete_interest(&row.id, &alice),
            Err(StoreError::NotFound("interest"))
        ));
    }

    #[test]
    fn directed_triple_is_unique() {
        let (_dir, db) = test_db();
        let alice = user(&db, "alice");
        let bob = user(&db, "bob");
        let guitar = skill(&db, "Guitar");

        let created = db.create_match(&new_id(), &alice, &bob, &guitar).unwrap();
        assert_eq!(created.teacher_username, "alice");
        assert_eq!(created.learner_username, "bob");
        assert!(db.match_exists(&alice, &bob, &guitar).unwrap());
        assert!(!db.match_exists(&bob, &alice, &guitar).unwrap());

        let err = db.create_match(&new_id(), &alice, &bob, &guitar).unwrap_err();
        assert!(matches!(err, StoreError::MatchExists));

        // The reverse direction is a different match.
        db.create_match(&new_id(), &bob, &alice, &guitar).unwrap();
        assert_eq!(db.list_matches_for_user(&alice).unwrap().len(), 2);
    }

    #[test]
    fn self_match_is_rejected() {
        let (_dir, db) = test_db();
        let alice = user(&db, "alice");
        let guitar = skill(&db, "Guitar");
        let err = db.create_match(&new_id(), &alice, &alice, &guitar).unwrap_err();
        assert!(matches!(err, StoreError::SelfMatch));
    }

    #[test]
    fn list_matches_covers_both_roles_once() {
        let (_dir, db) = test_db();
        let alice = user(&db, "alice");
        let bob = user(&db, "bob");
        let carol = user(&db, "carol");
        let guitar = skill(&db, "Guitar");
        let piano = skill(&db, "Piano");

        db.create_match(&new_id(), &alice, &bob, &guitar).unwrap();
        db.create_match(&new_id(), &carol, &alice, &piano).unwrap();
        db.create_match(&new_id(), &carol, &bob, &piano).unwrap();

        let mine = db.list_matches_for_user(&alice).unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|m| m.involves(&alice)));
        assert_eq!(db.list_matches_for_user(&carol).unwrap().len(), 2);
    }

    #[test]
    fn delete_match_is_participant_only_and_cascades_messages() {
        let (_dir, db) = test_db();
        let alice = user(&db, "alice");
        let bob = user(&db, "bob");
        let mallory = user(&db, "mallory");
        let guitar = skill(&db, "Guitar");
        let m = db.create_match(&new_id(), &alice, &bob, &guitar).unwrap();
        db.insert_message(&new_id(), &m.id, &alice, "hi").unwrap();

        assert!(matches!(db.delete_match(&m.id, &mallory), Err(StoreError::Forbidden)));
        db.delete_match(&m.id, &bob).unwrap();

        assert!(db.get_match(&m.id).unwrap().is_none());
        assert!(db.list_messages(&m.id, None, None).unwrap().is_empty());
        assert!(matches!(
            db.delete_match(&m.id, &bob),
            Err(StoreError::NotFound("match"))
        ));
    }

    #[test]
    fn deleting_a_user_cascades() {
        let (_dir, db) = test_db();
        let alice = user(&db, "alice");
        let bob = user(&db, "bob");
        let guitar = skill(&db, "Guitar");
        db.insert_interest(&new_id(), &alice, &guitar, Role::Teach).unwrap();
        db.insert_interest(&new_id(), &bob, &guitar, Role::Learn).unwrap();
        let m = db.create_match(&new_id(), &alice, &bob, &guitar).unwrap();
        db.insert_message(&new_id(), &m.id, &bob, "hello").unwrap();

        db.delete_user(&alice).unwrap();

        assert!(db.get_user_by_id(&alice).unwrap().is_none());
        assert!(db.list_interests_for_user(&alice).unwrap().is_empty());
        assert!(db.list_matches_for_user(&bob).unwrap().is_empty());
        assert!(db.list_messages(&m.id, None, None).unwrap().is_empty());
        // Bob's own declaration and the skill survive.
        assert_eq!(db.list_interests_for_user(&bob).unwrap().len(), 1);
        assert!(db.get_skill(&guitar).unwrap().is_some());
    }

    #[test]
    fn messages_are_oldest_first_and_support_an_after_cursor() {
        let (_dir, db) = test_db();
        let alice = user(&db, "alice");
        let bob = user(&db, "bob");
        let guitar = skill(&db, "Guitar");
        let m = db.create_match(&new_id(), &alice, &bob, &guitar).unwrap();

        let first = db.insert_message(&new_id(), &m.id, &alice, "one").unwrap();
        db.insert_message(&new_id(), &m.id, &bob, "two").unwrap();
        db.insert_message(&new_id(), &m.id, &alice, "three").unwrap();

        let all: Vec<String> = db
            .list_messages(&m.id, None, None)
            .unwrap()
            .into_iter()
            .map(|r| r.content)
            .collect();
        assert_eq!(all, vec!["one", "two", "three"]);

        let page = db.list_messages(&m.id, None, Some(2)).unwrap();
        assert_eq!(page.len(), 2);

        let newer = db.list_messages(&m.id, Some(&first.created_at), None).unwrap();
        assert!(newer.iter().all(|r| r.created_at > first.created_at));
        assert!(newer.iter().all(|r| r.content != "one"));
    }

    #[test]
    fn message_timestamps_strictly_increase_within_a_match() {
        let (_dir, db) = test_db();
        let alice = user(&db, "alice");
        let bob = user(&db, "bob");
        let guitar = skill(&db, "Guitar");
        let m = db.create_match(&new_id(), &alice, &bob, &guitar).unwrap();

        let stamps: Vec<String> = (0..50)
            .map(|i| {
                db.insert_message(&new_id(), &m.id, &alice, &format!("msg {i}"))
                    .unwrap()
                    .created_at
            })
            .collect();
        assert!(stamps.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn cursor_survives_a_clock_step_backwards() {
        let (_dir, db) = test_db();
        let alice = user(&db, "alice");
        let bob = user(&db, "bob");
        let guitar = skill(&db, "Guitar");
        let m = db.create_match(&new_id(), &alice, &bob, &guitar).unwrap();

        // A row stamped an hour ahead, as if the clock later jumped back.
        let ahead = format_timestamp(Utc::now() + Duration::hours(1));
        db.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO messages (id, match_id, sender_id, content, created_at)
                 VALUES (?1, ?2, ?3, 'early', ?4)",
                params![new_id(), m.id, alice, ahead],
            )?;
            Ok(())
        })
        .unwrap();

        let next = db.insert_message(&new_id(), &m.id, &bob, "late").unwrap();
        assert!(next.created_at > ahead);

        let polled = db.list_messages(&m.id, Some(&ahead), None).unwrap();
        assert_eq!(polled.len(), 1);
        assert_eq!(polled[0].content, "late");
    }

    #[test]
    fn update_user_keeps_absent_fields() {
        let (_dir, db) = test_db();
        let alice = user(&db, "alice");
        user(&db, "bob");

        let updated = db
            .update_user(
                &alice,
                &UserUpdate {
                    email: Some("alice@example.com"),
                    bio: Some("guitarist"),
                    avatar_url: Some("https://img.example.com/alice.png"),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.username, "alice");
        assert_eq!(updated.email.as_deref(), Some("alice@example.com"));
        assert_eq!(updated.bio, "guitarist");
        assert_eq!(updated.avatar_url.as_deref(), Some("https://img.example.com/alice.png"));

        let renamed = UserUpdate {
            username: Some("bob"),
            ..Default::default()
        };
        let err = db.update_user(&alice, &renamed).unwrap_err();
        assert!(matches!(err, StoreError::UsernameTaken(_)));
    }

    #[test]
    fn empty_strings_clear_email_and_avatar() {
        let (_dir, db) = test_db();
        let alice = user(&db, "alice");
        db.update_user(
            &alice,
            &UserUpdate {
                email: Some("alice@example.com"),
                avatar_url: Some("https://img.example.com/alice.png"),
                ..Default::default()
            },
        )
        .unwrap();

        let cleared = db
            .update_user(
                &alice,
                &UserUpdate {
                    email: Some(""),
                    avatar_url: Some(""),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(cleared.email, None);
        assert_eq!(cleared.avatar_url, None);
    }

    #[test]
    fn user_created_at_uses_the_shared_timestamp_format() {
        let (_dir, db) = test_db();
        let id = new_id();
        let row = db.create_user(&id, "alice", None, "hash").unwrap();

        assert_eq!(row.created_at.len(), "2026-03-01T10:15:30.123456Z".len());
        assert!(row.created_at <= crate::timestamp_now());
    }
}
