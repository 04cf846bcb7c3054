use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use crate::{
    models::{session::SessionResponse, user::StudentSummary},
    types::{AttendanceId, SessionId, UserId},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct AttendanceRecord {
    pub id: AttendanceId,
    pub session_id: SessionId,
    pub student_id: UserId,
    pub status: AttendanceStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
/// Only presence is ever stored; a missing record means "not checked in".
pub enum AttendanceStatus {
    Present,
}

impl AttendanceStatus {
    pub fn db_value(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
        }
    }
}

impl AttendanceRecord {
    pub fn present(session_id: SessionId, student_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: AttendanceId::new(),
            session_id,
            student_id,
            status: AttendanceStatus::Present,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
/// An attendance record joined with the student's display info.
pub struct AttendanceEntry {
    pub id: AttendanceId,
    pub session_id: SessionId,
    pub student_id: UserId,
    pub status: AttendanceStatus,
    pub created_at: DateTime<Utc>,
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AttendanceEntryResponse {
    #[schema(value_type = String)]
    pub id: AttendanceId,
    pub status: AttendanceStatus,
    pub checked_in_at: DateTime<Utc>,
    pub student: StudentSummary,
}

impl From<AttendanceEntry> for AttendanceEntryResponse {
    fn from(entry: AttendanceEntry) -> Self {
        Self {
            id: entry.id,
            status: entry.status,
            checked_in_at: entry.created_at,
            student: StudentSummary {
                user_id: entry.student_id,
                username: entry.username,
                firstname: entry.firstname,
                lastname: entry.lastname,
                email: entry.email,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
/// Teacher's session page: QR payload plus who has checked in, most recent first.
pub struct SessionAttendanceResponse {
    pub session: SessionResponse,
    pub check_in_url: String,
    pub attendance: Vec<AttendanceEntryResponse>,
}

#[derive(Debug, Clone, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct CheckInQuery {
    /// Token from the scanned check-in URL.
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StudentAttendanceState {
    Present,
    NotCheckedIn,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
/// Student's session page and check-in result.
pub struct StudentAttendanceResponse {
    pub session: SessionResponse,
    pub status: StudentAttendanceState,
    pub checked_in_at: Option<DateTime<Utc>>,
    /// Only set by a check-in call; false when an earlier check-in was returned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newly_recorded: Option<bool>,
}
