use std::sync::Arc;

use crate::{
    error::AppError,
    models::{course::Course, user::{Profile, UserRole}},
    repositories::{CourseRepository, StoreError, UserDirectory, COURSE_CODE_CONSTRAINT},
    types::UserId,
};

#[derive(Debug, thiserror::Error)]
pub enum CourseError {
    #[error("course not found")]
    NotFound,
    #[error("course belongs to another teacher")]
    NotOwner,
    #[error("course code already in use: {0}")]
    DuplicateCode(String),
    #[error("student not found")]
    StudentNotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<CourseError> for AppError {
    fn from(err: CourseError) -> Self {
        match err {
            CourseError::NotFound => AppError::NotFound("Course not found".into()),
            CourseError::NotOwner => {
                AppError::Forbidden("You do not have access to this course".into())
            }
            CourseError::DuplicateCode(code) => {
                AppError::Conflict(format!("Course code {} is already in use", code))
            }
            CourseError::StudentNotFound => AppError::NotFound("Student not found".into()),
            CourseError::Store(err) => err.into(),
        }
    }
}

pub type CourseResult<T> = Result<T, CourseError>;

#[derive(Debug, Clone)]
pub struct EnrollmentOutcome {
    pub student: Profile,
    pub newly_enrolled: bool,
}

#[derive(Clone)]
pub struct CourseService {
    courses: Arc<dyn CourseRepository>,
    directory: Arc<dyn UserDirectory>,
}

impl CourseService {
    pub fn new(courses: Arc<dyn CourseRepository>, directory: Arc<dyn UserDirectory>) -> Self {
        Self { courses, directory }
    }

    pub async fn create_course(
        &self,
        teacher_id: UserId,
        course_code: &str,
        course_name: &str,
        description: Option<&str>,
    ) -> CourseResult<Course> {
        let course_code = course_code.trim();
        let course = Course::new(
            teacher_id,
            course_code.to_string(),
            course_name.trim().to_string(),
            description
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
        );
        match self.courses.create(&course).await {
            Ok(course) => {
                tracing::info!(
                    teacher_id = %teacher_id,
                    course_code = %course.course_code,
                    "Course created"
                );
                Ok(course)
            }
            Err(err) if err.is_conflict_on(COURSE_CODE_CONSTRAINT) => {
                Err(CourseError::DuplicateCode(course_code.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn course_by_code(&self, course_code: &str) -> CourseResult<Course> {
        self.courses
            .find_by_code(course_code)
            .await?
            .ok_or(CourseError::NotFound)
    }

    /// A course the teacher owns.
    pub async fn course_for_teacher(
        &self,
        course_code: &str,
        teacher_id: UserId,
    ) -> CourseResult<Course> {
        let course = self.course_by_code(course_code).await?;
        if !course.is_owned_by(teacher_id) {
            tracing::warn!(
                teacher_id = %teacher_id,
                course_code = %course_code,
                "Teacher requested a course they do not own"
            );
            return Err(CourseError::NotOwner);
        }
        Ok(course)
    }

    /// Any existing course. Students may view courses they are not enrolled in, matching
    /// check-in, which only checks enrollment when configured to.
    pub async fn course_for_student(&self, course_code: &str) -> CourseResult<Course> {
        self.course_by_code(course_code).await
    }

    /// Profile shown in dashboard greetings.
    pub async fn member_profile(&self, user_id: UserId) -> CourseResult<Option<Profile>> {
        Ok(self.directory.find_profile(user_id).await?)
    }

    pub async fn list_teacher_courses(&self, teacher_id: UserId) -> CourseResult<Vec<Course>> {
        Ok(self.courses.list_for_teacher(teacher_id).await?)
    }

    pub async fn count_teacher_courses(&self, teacher_id: UserId) -> CourseResult<i64> {
        Ok(self.courses.count_for_teacher(teacher_id).await?)
    }

    pub async fn list_student_courses(&self, student_id: UserId) -> CourseResult<Vec<Course>> {
        Ok(self.courses.list_for_student(student_id).await?)
    }

    /// Adds a student to the course by email. Adding someone already enrolled succeeds.
    pub async fn enroll_student(
        &self,
        course: &Course,
        email: &str,
    ) -> CourseResult<EnrollmentOutcome> {
        let student = self
            .directory
            .find_by_email(email.trim())
            .await?
            .filter(|profile| profile.role == UserRole::Student)
            .ok_or(CourseError::StudentNotFound)?;

        let newly_enrolled = self.courses.enroll(course.id, student.user_id).await?;
        tracing::info!(
            course_code = %course.course_code,
            student_id = %student.user_id,
            student = %student.display_name(),
            newly_enrolled,
            "Student enrollment"
        );
        Ok(EnrollmentOutcome {
            student,
            newly_enrolled,
        })
    }
}
