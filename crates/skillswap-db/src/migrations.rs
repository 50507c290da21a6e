use rusqlite::Connection;
use tracing::info;

use crate::StoreResult;

pub fn run(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL UNIQUE,
                email       TEXT,
                bio         TEXT NOT NULL DEFAULT '',
                avatar_url  TEXT,
                password    TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE skills (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL UNIQUE
            );

            CREATE TABLE interests (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                skill_id    TEXT NOT NULL REFERENCES skills(id) ON DELETE CASCADE,
                role        TEXT NOT NULL CHECK (role IN ('teach', 'learn')),
                created_at  TEXT NOT NULL,
                UNIQUE(user_id, skill_id, role)
            );

            CREATE INDEX idx_interests_skill_role
                ON interests(skill_id, role);

            CREATE TABLE matches (
                id          TEXT PRIMARY KEY,
                teacher_id  TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                learner_id  TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                skill_id    TEXT NOT NULL REFERENCES skills(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL,
                CHECK (teacher_id <> learner_id),
                UNIQUE(teacher_id, learner_id, skill_id)
            );

            CREATE INDEX idx_matches_learner
                ON matches(learner_id);

            CREATE TABLE messages (
                id          TEXT PRIMARY KEY,
                match_id    TEXT NOT NULL REFERENCES matches(id) ON DELETE CASCADE,
                sender_id   TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                content     TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_messages_match
                ON messages(match_id, created_at);

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
