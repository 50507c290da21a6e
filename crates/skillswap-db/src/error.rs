use rusqlite::ErrorCode;
use rusqlite::ffi;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failures surfaced by the storage layer. Constraint violations are
/// classified into domain variants at the query that triggered them.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("interest already declared for this skill and role")]
    DuplicateDeclaration,

    #[error("match already exists")]
    MatchExists,

    #[error("a user cannot be matched with themselves")]
    SelfMatch,

    #[error("username '{0}' is already taken")]
    UsernameTaken(String),

    #[error("skill '{0}' already exists")]
    SkillExists(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("not a participant")]
    Forbidden,

    #[error("referenced row does not exist")]
    MissingReference,

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("internal storage error: {0}")]
    Internal(String),
}

/// Which storage constraint an insert or update tripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Constraint {
    Unique,
    ForeignKey,
    Check,
}

pub(crate) fn constraint_of(err: &rusqlite::Error) -> Option<Constraint> {
    match err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            match e.extended_code {
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    Some(Constraint::Unique)
                }
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Some(Constraint::ForeignKey),
                ffi::SQLITE_CONSTRAINT_CHECK => Some(Constraint::Check),
                _ => None,
            }
        }
        _ => None,
    }
}
