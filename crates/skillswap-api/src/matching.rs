//! Mutual-interest matching.
//!
//! Runs synchronously right after a declaration is stored. Every existing
//! declaration of the opposite role for the same skill (other than the
//! declarer's own) yields one directed match: learners pair with teachers,
//! and the declarer's role decides which side of the triple they take.
//!
//! The `match_exists` pre-check only saves an insert. Concurrent declarers can
//! both pass it, so the unique index on `(teacher, learner, skill)` decides:
//! the losing insert reports `MatchExists`, which is treated as already
//! matched and left out of the result.

use tracing::{debug, info};
use uuid::Uuid;

use skillswap_db::models::{InterestRow, MatchRow};
use skillswap_db::{Database, StoreError, StoreResult};
use skillswap_types::models::Role;

/// Create every missing match for `declaration` and return the new rows.
pub fn run(db: &Database, declaration: &InterestRow) -> StoreResult<Vec<MatchRow>> {
    let candidates = db.list_declarations(
        &declaration.skill_id,
        declaration.role.opposite(),
        &declaration.user_id,
    )?;

    let mut created = Vec::new();
    for candidate in &candidates {
        let (teacher_id, learner_id) = match declaration.role {
            Role::Learn => (&candidate.user_id, &declaration.user_id),
            Role::Teach => (&declaration.user_id, &candidate.user_id),
        };

        if db.match_exists(teacher_id, learner_id, &declaration.skill_id)? {
            debug!(
                "Match {} -> {} ({}) already exists",
                teacher_id, learner_id, declaration.skill_name
            );
            continue;
        }

        match db.create_match(
            &Uuid::new_v4().to_string(),
            teacher_id,
            learner_id,
            &declaration.skill_id,
        ) {
            Ok(row) => {
                info!(
                    "Matched {} (teacher) with {} (learner) for {}",
                    row.teacher_username, row.learner_username, row.skill_name
                );
                created.push(row);
            }
            Err(StoreError::MatchExists) => {
                debug!(
                    "Lost insert race for {} -> {} ({})",
                    teacher_id, learner_id, declaration.skill_name
                );
            }
            Err(e) => return Err(e),
        }
    }

    Ok(created)
}
