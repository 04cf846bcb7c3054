//! Course and enrollment models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    models::{session::SessionResponse, user::StudentSummary},
    types::{CourseId, UserId},
};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Course {
    #[schema(value_type = String)]
    pub id: CourseId,
    /// Stable identifier used in URLs.
    pub course_code: String,
    #[schema(value_type = String)]
    pub teacher_id: UserId,
    pub course_name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Course {
    pub fn new(
        teacher_id: UserId,
        course_code: String,
        course_name: String,
        description: Option<String>,
    ) -> Self {
        Self {
            id: CourseId::new(),
            course_code,
            teacher_id,
            course_name,
            description,
            created_at: Utc::now(),
        }
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.teacher_id == user_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateCourseRequest {
    #[validate(length(min = 1, max = 32), custom(function = "validate_course_code"))]
    pub course_code: String,
    #[validate(length(min = 1, max = 200))]
    pub course_name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

fn validate_course_code(code: &str) -> Result<(), validator::ValidationError> {
    if code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        Ok(())
    } else {
        Err(validator::ValidationError::new("course_code_charset"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct EnrollStudentRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EnrollmentResponse {
    pub course_code: String,
    pub student: StudentSummary,
    /// False when the student was already enrolled.
    pub newly_enrolled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CourseResponse {
    pub course_code: String,
    pub course_name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Course> for CourseResponse {
    fn from(course: Course) -> Self {
        Self {
            course_code: course.course_code,
            course_name: course.course_name,
            description: course.description,
            created_at: course.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
/// Course page payload: the course plus its sessions, newest number first.
pub struct CourseDetailResponse {
    pub course: CourseResponse,
    pub sessions: Vec<SessionResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TeacherDashboardResponse {
    /// Greeting name; absent when the profile row cannot be read.
    pub firstname: Option<String>,
    pub active_courses: i64,
    pub courses: Vec<CourseResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StudentDashboardResponse {
    pub firstname: Option<String>,
    pub courses: Vec<CourseResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_course_request_rejects_bad_code() {
        let payload = CreateCourseRequest {
            course_code: "CS 101".into(),
            course_name: "Intro".into(),
            description: None,
        };
        assert!(payload.validate().is_err());

        let payload = CreateCourseRequest {
            course_code: "CS101-A_1".into(),
            course_name: "Intro".into(),
            description: None,
        };
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn enroll_request_requires_email() {
        let payload = EnrollStudentRequest {
            email: "not-an-email".into(),
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn course_ownership_compares_teacher_id() {
        let teacher = UserId::new();
        let course = Course::new(teacher, "C1".into(), "Course".into(), None);
        assert!(course.is_owned_by(teacher));
        assert!(!course.is_owned_by(UserId::new()));
    }
}
