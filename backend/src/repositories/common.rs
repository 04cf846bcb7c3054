//! Shared repository utilities.

pub const SESSION_NUMBER_CONSTRAINT: &str = "sessions_course_number_key";
pub const ATTENDANCE_UNIQUE_CONSTRAINT: &str = "attendance_session_student_key";
pub const COURSE_CODE_CONSTRAINT: &str = "courses_course_code_key";

/// Failure of a store call, split into the one case callers coordinate on and everything else.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write. Carries the constraint name.
    #[error("unique constraint violated: {0}")]
    Conflict(String),
    #[error("store unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),
}

impl StoreError {
    pub fn is_conflict_on(&self, constraint: &str) -> bool {
        matches!(self, StoreError::Conflict(name) if name == constraint)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                let constraint = db_err.constraint().unwrap_or("unknown").to_string();
                return StoreError::Conflict(constraint);
            }
        }
        StoreError::Unavailable(err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
