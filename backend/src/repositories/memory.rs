//! In-memory store used by unit tests and the `test-utils` feature.
//!
//! It enforces the same uniqueness constraints as the PostgreSQL schema and reports them with
//! the same constraint names, and it yields between reads and writes so concurrent callers
//! interleave the way separate database round trips do.

use std::collections::{HashMap, HashSet};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex, MutexGuard,
};

use async_trait::async_trait;

use crate::{
    models::{
        attendance::{AttendanceEntry, AttendanceRecord},
        course::Course,
        session::{AttendanceSession, NewSession},
        user::{Profile, UserRole},
    },
    repositories::{
        common::{
            StoreError, StoreResult, ATTENDANCE_UNIQUE_CONSTRAINT, COURSE_CODE_CONSTRAINT,
            SESSION_NUMBER_CONSTRAINT,
        },
        course::CourseRepository,
        course_store::CourseStore,
        user::UserDirectory,
    },
    types::{CourseId, SessionId, UserId},
};

#[derive(Default)]
struct Tables {
    profiles: HashMap<UserId, Profile>,
    courses: Vec<Course>,
    enrollments: HashSet<(CourseId, UserId)>,
    sessions: Vec<AttendanceSession>,
    attendance: Vec<AttendanceRecord>,
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
    unavailable: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call fail as if the database were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn insert_profile(&self, profile: Profile) {
        self.lock().profiles.insert(profile.user_id, profile);
    }

    pub fn seed_profile(&self, role: UserRole) -> Profile {
        let user_id = UserId::new();
        let id_text = user_id.to_string();
        let short = &id_text[..8];
        let profile = Profile::new(
            user_id,
            format!("user_{}", short),
            "Test".into(),
            format!("User {}", short),
            format!("user_{}@example.com", short),
            role,
        );
        self.insert_profile(profile.clone());
        profile
    }

    pub fn attendance_count(&self, session_id: SessionId) -> usize {
        self.lock()
            .attendance
            .iter()
            .filter(|record| record.session_id == session_id)
            .count()
    }

    pub fn session_numbers(&self, course_id: CourseId) -> Vec<i32> {
        let mut numbers: Vec<i32> = self
            .lock()
            .sessions
            .iter()
            .filter(|session| session.course_id == course_id)
            .map(|session| session.session_number)
            .collect();
        numbers.sort_unstable();
        numbers
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn enter(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        tokio::task::yield_now().await;
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(sqlx::Error::PoolTimedOut));
        }
        Ok(self.lock())
    }
}

#[async_trait]
impl UserDirectory for InMemoryStore {
    async fn get_role(&self, user_id: UserId) -> StoreResult<Option<UserRole>> {
        let tables = self.enter().await?;
        Ok(tables.profiles.get(&user_id).map(|profile| profile.role))
    }

    async fn find_profile(&self, user_id: UserId) -> StoreResult<Option<Profile>> {
        let tables = self.enter().await?;
        Ok(tables.profiles.get(&user_id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Profile>> {
        let tables = self.enter().await?;
        let email = email.trim();
        Ok(tables
            .profiles
            .values()
            .find(|profile| profile.email.eq_ignore_ascii_case(email))
            .cloned())
    }
}

#[async_trait]
impl CourseRepository for InMemoryStore {
    async fn create(&self, course: &Course) -> StoreResult<Course> {
        let mut tables = self.enter().await?;
        if tables
            .courses
            .iter()
            .any(|existing| existing.course_code == course.course_code)
        {
            return Err(StoreError::Conflict(COURSE_CODE_CONSTRAINT.to_string()));
        }
        tables.courses.push(course.clone());
        Ok(course.clone())
    }

    async fn find_by_code(&self, course_code: &str) -> StoreResult<Option<Course>> {
        let tables = self.enter().await?;
        Ok(tables
            .courses
            .iter()
            .find(|course| course.course_code == course_code)
            .cloned())
    }

    async fn list_for_teacher(&self, teacher_id: UserId) -> StoreResult<Vec<Course>> {
        let tables = self.enter().await?;
        let mut courses: Vec<Course> = tables
            .courses
            .iter()
            .filter(|course| course.teacher_id == teacher_id)
            .cloned()
            .collect();
        courses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(courses)
    }

    async fn count_for_teacher(&self, teacher_id: UserId) -> StoreResult<i64> {
        let tables = self.enter().await?;
        Ok(tables
            .courses
            .iter()
            .filter(|course| course.teacher_id == teacher_id)
            .count() as i64)
    }

    async fn list_for_student(&self, student_id: UserId) -> StoreResult<Vec<Course>> {
        let tables = self.enter().await?;
        let mut courses: Vec<Course> = tables
            .courses
            .iter()
            .filter(|course| tables.enrollments.contains(&(course.id, student_id)))
            .cloned()
            .collect();
        courses.sort_by(|a, b| a.course_name.cmp(&b.course_name));
        Ok(courses)
    }

    async fn enroll(&self, course_id: CourseId, student_id: UserId) -> StoreResult<bool> {
        let mut tables = self.enter().await?;
        Ok(tables.enrollments.insert((course_id, student_id)))
    }
}

#[async_trait]
impl CourseStore for InMemoryStore {
    async fn max_session_number(&self, course_id: CourseId) -> StoreResult<i32> {
        let tables = self.enter().await?;
        Ok(tables
            .sessions
            .iter()
            .filter(|session| session.course_id == course_id)
            .map(|session| session.session_number)
            .max()
            .unwrap_or(0))
    }

    async fn insert_session(&self, session: &NewSession) -> StoreResult<AttendanceSession> {
        let mut tables = self.enter().await?;
        if tables.sessions.iter().any(|existing| {
            existing.course_id == session.course_id
                && existing.session_number == session.session_number
        }) {
            return Err(StoreError::Conflict(SESSION_NUMBER_CONSTRAINT.to_string()));
        }
        let stored = session.clone().into_session();
        tables.sessions.push(stored.clone());
        Ok(stored)
    }

    async fn get_session(&self, session_id: SessionId) -> StoreResult<Option<AttendanceSession>> {
        let tables = self.enter().await?;
        Ok(tables
            .sessions
            .iter()
            .find(|session| session.id == session_id)
            .cloned())
    }

    async fn list_sessions(&self, course_id: CourseId) -> StoreResult<Vec<AttendanceSession>> {
        let tables = self.enter().await?;
        let mut sessions: Vec<AttendanceSession> = tables
            .sessions
            .iter()
            .filter(|session| session.course_id == course_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.session_number.cmp(&a.session_number));
        Ok(sessions)
    }

    async fn find_attendance(
        &self,
        session_id: SessionId,
        student_id: UserId,
    ) -> StoreResult<Option<AttendanceRecord>> {
        let tables = self.enter().await?;
        Ok(tables
            .attendance
            .iter()
            .find(|record| record.session_id == session_id && record.student_id == student_id)
            .cloned())
    }

    async fn insert_attendance(&self, record: &AttendanceRecord) -> StoreResult<AttendanceRecord> {
        let mut tables = self.enter().await?;
        if tables.attendance.iter().any(|existing| {
            existing.session_id == record.session_id && existing.student_id == record.student_id
        }) {
            return Err(StoreError::Conflict(ATTENDANCE_UNIQUE_CONSTRAINT.to_string()));
        }
        tables.attendance.push(record.clone());
        Ok(record.clone())
    }

    async fn list_attendance(&self, session_id: SessionId) -> StoreResult<Vec<AttendanceEntry>> {
        let tables = self.enter().await?;
        let mut entries: Vec<AttendanceEntry> = tables
            .attendance
            .iter()
            .filter(|record| record.session_id == session_id)
            .filter_map(|record| {
                let profile = tables.profiles.get(&record.student_id)?;
                Some(AttendanceEntry {
                    id: record.id,
                    session_id: record.session_id,
                    student_id: record.student_id,
                    status: record.status,
                    created_at: record.created_at,
                    username: profile.username.clone(),
                    firstname: profile.firstname.clone(),
                    lastname: profile.lastname.clone(),
                    email: profile.email.clone(),
                })
            })
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(entries)
    }

    async fn is_enrolled(&self, course_id: CourseId, student_id: UserId) -> StoreResult<bool> {
        let tables = self.enter().await?;
        Ok(tables.enrollments.contains(&(course_id, student_id)))
    }
}
