//! Course and enrollment persistence.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    models::course::Course,
    repositories::common::StoreResult,
    types::{CourseId, UserId},
};

const COURSE_COLUMNS: &str =
    "c.id, c.course_code, c.teacher_id, c.course_name, c.description, c.created_at";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Insert a course; a duplicate `course_code` surfaces as a conflict.
    async fn create(&self, course: &Course) -> StoreResult<Course>;

    async fn find_by_code(&self, course_code: &str) -> StoreResult<Option<Course>>;

    async fn list_for_teacher(&self, teacher_id: UserId) -> StoreResult<Vec<Course>>;

    async fn count_for_teacher(&self, teacher_id: UserId) -> StoreResult<i64>;

    async fn list_for_student(&self, student_id: UserId) -> StoreResult<Vec<Course>>;

    /// Returns false when the enrollment already existed.
    async fn enroll(&self, course_id: CourseId, student_id: UserId) -> StoreResult<bool>;
}

#[derive(Debug, Clone)]
pub struct PgCourseRepository {
    pool: PgPool,
}

impl PgCourseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CourseRepository for PgCourseRepository {
    async fn create(&self, course: &Course) -> StoreResult<Course> {
        let row = sqlx::query_as::<_, Course>(
            "INSERT INTO courses (id, course_code, teacher_id, course_name, description, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, course_code, teacher_id, course_name, description, created_at",
        )
        .bind(course.id)
        .bind(&course.course_code)
        .bind(course.teacher_id)
        .bind(&course.course_name)
        .bind(&course.description)
        .bind(course.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_by_code(&self, course_code: &str) -> StoreResult<Option<Course>> {
        let query = format!(
            "SELECT {} FROM courses c WHERE c.course_code = $1",
            COURSE_COLUMNS
        );
        let row = sqlx::query_as::<_, Course>(&query)
            .bind(course_code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_for_teacher(&self, teacher_id: UserId) -> StoreResult<Vec<Course>> {
        let query = format!(
            "SELECT {} FROM courses c WHERE c.teacher_id = $1 ORDER BY c.created_at DESC",
            COURSE_COLUMNS
        );
        let rows = sqlx::query_as::<_, Course>(&query)
            .bind(teacher_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn count_for_teacher(&self, teacher_id: UserId) -> StoreResult<i64> {
        let total = sqlx::query_scalar("SELECT COUNT(*) FROM courses WHERE teacher_id = $1")
            .bind(teacher_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    async fn list_for_student(&self, student_id: UserId) -> StoreResult<Vec<Course>> {
        let query = format!(
            "SELECT {} FROM courses c \
             JOIN enrollments e ON e.course_id = c.id \
             WHERE e.student_id = $1 ORDER BY c.course_name",
            COURSE_COLUMNS
        );
        let rows = sqlx::query_as::<_, Course>(&query)
            .bind(student_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn enroll(&self, course_id: CourseId, student_id: UserId) -> StoreResult<bool> {
        let result = sqlx::query(
            "INSERT INTO enrollments (course_id, student_id, created_at) VALUES ($1, $2, NOW()) \
             ON CONFLICT (course_id, student_id) DO NOTHING",
        )
        .bind(course_id)
        .bind(student_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
