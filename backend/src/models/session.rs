//! Attendance session models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::types::{CourseId, SessionId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
/// A dated class meeting under a course.
pub struct AttendanceSession {
    pub id: SessionId,
    pub course_id: CourseId,
    /// Unique within the course; assigned as the current maximum plus one.
    pub session_number: i32,
    pub title: String,
    pub session_date: NaiveDate,
    /// Opaque token embedded in the check-in URL.
    pub session_token: String,
    pub created_at: DateTime<Utc>,
}

/// Values for a session insert; the store assigns nothing itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    pub id: SessionId,
    pub course_id: CourseId,
    pub session_number: i32,
    pub title: String,
    pub session_date: NaiveDate,
    pub session_token: String,
    pub created_at: DateTime<Utc>,
}

impl NewSession {
    pub fn into_session(self) -> AttendanceSession {
        AttendanceSession {
            id: self.id,
            course_id: self.course_id,
            session_number: self.session_number,
            title: self.title,
            session_date: self.session_date,
            session_token: self.session_token,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateSessionRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    /// Defaults to today in the configured time zone.
    pub session_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
/// Session as shown to both roles. The token is never included here.
pub struct SessionResponse {
    #[schema(value_type = String)]
    pub id: SessionId,
    pub session_number: i32,
    pub title: String,
    pub session_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl From<&AttendanceSession> for SessionResponse {
    fn from(session: &AttendanceSession) -> Self {
        Self {
            id: session.id,
            session_number: session.session_number,
            title: session.title.clone(),
            session_date: session.session_date,
            created_at: session.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
/// Teacher-side view of a freshly created or opened session, carrying what the QR code encodes.
pub struct IssuedSessionResponse {
    pub session: SessionResponse,
    pub token: String,
    pub check_in_url: String,
}
