//! Session and attendance persistence.
//!
//! Both tables carry the uniqueness constraints the check-in protocol coordinates on:
//! `(course_id, session_number)` on sessions and `(session_id, student_id)` on attendance.
//! Inserts never swallow those violations; they surface as
//! [`StoreError::Conflict`](crate::repositories::StoreError::Conflict).

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    models::{
        attendance::{AttendanceEntry, AttendanceRecord},
        session::{AttendanceSession, NewSession},
    },
    repositories::common::StoreResult,
    types::{CourseId, SessionId, UserId},
};

const SESSION_COLUMNS: &str =
    "id, course_id, session_number, title, session_date, session_token, created_at";
const ATTENDANCE_COLUMNS: &str = "id, session_id, student_id, status, created_at";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CourseStore: Send + Sync {
    /// Highest session number used in the course, 0 when it has none.
    async fn max_session_number(&self, course_id: CourseId) -> StoreResult<i32>;

    async fn insert_session(&self, session: &NewSession) -> StoreResult<AttendanceSession>;

    async fn get_session(&self, session_id: SessionId) -> StoreResult<Option<AttendanceSession>>;

    /// Sessions of a course, highest number first.
    async fn list_sessions(&self, course_id: CourseId) -> StoreResult<Vec<AttendanceSession>>;

    async fn find_attendance(
        &self,
        session_id: SessionId,
        student_id: UserId,
    ) -> StoreResult<Option<AttendanceRecord>>;

    async fn insert_attendance(&self, record: &AttendanceRecord) -> StoreResult<AttendanceRecord>;

    /// Attendance of a session with student info, most recent check-in first.
    async fn list_attendance(&self, session_id: SessionId) -> StoreResult<Vec<AttendanceEntry>>;

    async fn is_enrolled(&self, course_id: CourseId, student_id: UserId) -> StoreResult<bool>;
}

#[derive(Debug, Clone)]
pub struct PgCourseStore {
    pool: PgPool,
}

impl PgCourseStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CourseStore for PgCourseStore {
    async fn max_session_number(&self, course_id: CourseId) -> StoreResult<i32> {
        let max = sqlx::query_scalar::<_, i32>(
            "SELECT COALESCE(MAX(session_number), 0) FROM sessions WHERE course_id = $1",
        )
        .bind(course_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(max)
    }

    async fn insert_session(&self, session: &NewSession) -> StoreResult<AttendanceSession> {
        let query = format!(
            "INSERT INTO sessions (id, course_id, session_number, title, session_date, session_token, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {}",
            SESSION_COLUMNS
        );
        let row = sqlx::query_as::<_, AttendanceSession>(&query)
            .bind(session.id)
            .bind(session.course_id)
            .bind(session.session_number)
            .bind(&session.title)
            .bind(session.session_date)
            .bind(&session.session_token)
            .bind(session.created_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_session(&self, session_id: SessionId) -> StoreResult<Option<AttendanceSession>> {
        let query = format!("SELECT {} FROM sessions WHERE id = $1", SESSION_COLUMNS);
        let row = sqlx::query_as::<_, AttendanceSession>(&query)
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_sessions(&self, course_id: CourseId) -> StoreResult<Vec<AttendanceSession>> {
        let query = format!(
            "SELECT {} FROM sessions WHERE course_id = $1 ORDER BY session_number DESC",
            SESSION_COLUMNS
        );
        let rows = sqlx::query_as::<_, AttendanceSession>(&query)
            .bind(course_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn find_attendance(
        &self,
        session_id: SessionId,
        student_id: UserId,
    ) -> StoreResult<Option<AttendanceRecord>> {
        let query = format!(
            "SELECT {} FROM attendance WHERE session_id = $1 AND student_id = $2",
            ATTENDANCE_COLUMNS
        );
        let row = sqlx::query_as::<_, AttendanceRecord>(&query)
            .bind(session_id)
            .bind(student_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn insert_attendance(&self, record: &AttendanceRecord) -> StoreResult<AttendanceRecord> {
        let query = format!(
            "INSERT INTO attendance (id, session_id, student_id, status, created_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {}",
            ATTENDANCE_COLUMNS
        );
        let row = sqlx::query_as::<_, AttendanceRecord>(&query)
            .bind(record.id)
            .bind(record.session_id)
            .bind(record.student_id)
            .bind(record.status.db_value())
            .bind(record.created_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_attendance(&self, session_id: SessionId) -> StoreResult<Vec<AttendanceEntry>> {
        let rows = sqlx::query_as::<_, AttendanceEntry>(
            "SELECT a.id, a.session_id, a.student_id, a.status, a.created_at, \
                    p.username, p.firstname, p.lastname, p.email \
             FROM attendance a \
             JOIN profiles p ON p.user_id = a.student_id \
             WHERE a.session_id = $1 \
             ORDER BY a.created_at DESC, a.id DESC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn is_enrolled(&self, course_id: CourseId, student_id: UserId) -> StoreResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM enrollments WHERE course_id = $1 AND student_id = $2)",
        )
        .bind(course_id)
        .bind(student_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}
