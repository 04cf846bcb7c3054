//! Attendance session lifecycle and the check-in protocol.
//!
//! No in-process locking: session numbering and check-in idempotency are coordinated through the
//! store's uniqueness constraints, so any number of server instances may run side by side.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use url::form_urlencoded;

use crate::{
    error::AppError,
    models::{
        attendance::{AttendanceEntry, AttendanceRecord},
        course::Course,
        session::{AttendanceSession, NewSession},
    },
    repositories::{
        CourseStore, StoreError, ATTENDANCE_UNIQUE_CONSTRAINT, SESSION_NUMBER_CONSTRAINT,
    },
    services::token::{tokens_match, TokenGenerator},
    types::{CourseId, SessionId, UserId},
};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session not found")]
    SessionNotFound,
    #[error("check-in token does not match the session")]
    InvalidToken,
    #[error("student is not enrolled in this course")]
    NotEnrolled,
    #[error("could not allocate a session number after {attempts} attempts")]
    Conflict { attempts: u32 },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::SessionNotFound => AppError::NotFound("Session not found".into()),
            SessionError::InvalidToken => {
                AppError::Forbidden("Invalid or missing check-in token".into())
            }
            SessionError::NotEnrolled => {
                AppError::Forbidden("You are not enrolled in this course".into())
            }
            SessionError::Conflict { .. } => AppError::Conflict(
                "Another session was created at the same time, please retry".into(),
            ),
            SessionError::Store(err) => err.into(),
        }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Extra checks applied before a check-in is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckInPolicy {
    pub require_token: bool,
    pub require_enrollment: bool,
}

impl Default for CheckInPolicy {
    fn default() -> Self {
        Self {
            require_token: true,
            require_enrollment: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckInOutcome {
    pub record: AttendanceRecord,
    /// False when the student had already checked in.
    pub newly_recorded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceStatusView {
    pub session: AttendanceSession,
    pub record: Option<AttendanceRecord>,
}

#[derive(Clone)]
pub struct AttendanceSessionManager {
    store: Arc<dyn CourseStore>,
    tokens: Arc<dyn TokenGenerator>,
    policy: CheckInPolicy,
    max_create_attempts: u32,
}

impl AttendanceSessionManager {
    pub fn new(
        store: Arc<dyn CourseStore>,
        tokens: Arc<dyn TokenGenerator>,
        policy: CheckInPolicy,
        max_create_attempts: u32,
    ) -> Self {
        Self {
            store,
            tokens,
            policy,
            max_create_attempts: max_create_attempts.max(1),
        }
    }

    /// Creates the next numbered session of a course.
    ///
    /// The number is `max + 1`, re-read on every attempt so a number lost to a concurrent
    /// create is never reused. Only a conflict on the session number constraint is retried.
    pub async fn create_session(
        &self,
        course_id: CourseId,
        title: &str,
        session_date: NaiveDate,
    ) -> SessionResult<AttendanceSession> {
        for attempt in 1..=self.max_create_attempts {
            let session_number = self.store.max_session_number(course_id).await? + 1;
            let new_session = NewSession {
                id: SessionId::new(),
                course_id,
                session_number,
                title: title.to_string(),
                session_date,
                session_token: self.tokens.new_token(),
                created_at: Utc::now(),
            };

            match self.store.insert_session(&new_session).await {
                Ok(session) => {
                    tracing::info!(
                        course_id = %course_id,
                        session_id = %session.id,
                        session_number = session.session_number,
                        "Attendance session created"
                    );
                    return Ok(session);
                }
                Err(err) if err.is_conflict_on(SESSION_NUMBER_CONSTRAINT) => {
                    tracing::debug!(
                        course_id = %course_id,
                        session_number,
                        attempt,
                        "Session number taken, retrying"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }

        tracing::warn!(
            course_id = %course_id,
            attempts = self.max_create_attempts,
            "Gave up allocating a session number"
        );
        Err(SessionError::Conflict {
            attempts: self.max_create_attempts,
        })
    }

    pub async fn get_session(&self, session_id: SessionId) -> SessionResult<AttendanceSession> {
        self.store
            .get_session(session_id)
            .await?
            .ok_or(SessionError::SessionNotFound)
    }

    /// The session, provided it belongs to `course`.
    pub async fn session_in_course(
        &self,
        course: &Course,
        session_id: SessionId,
    ) -> SessionResult<AttendanceSession> {
        let session = self.get_session(session_id).await?;
        if session.course_id != course.id {
            return Err(SessionError::SessionNotFound);
        }
        Ok(session)
    }

    pub async fn list_sessions(&self, course_id: CourseId) -> SessionResult<Vec<AttendanceSession>> {
        Ok(self.store.list_sessions(course_id).await?)
    }

    /// Records the student as present. Safe to call any number of times: every call after the
    /// first returns the original record unchanged.
    pub async fn check_in(
        &self,
        session_id: SessionId,
        student_id: UserId,
        presented_token: Option<&str>,
    ) -> SessionResult<CheckInOutcome> {
        let session = self.get_session(session_id).await?;

        if self.policy.require_token {
            let valid = presented_token
                .map(|token| tokens_match(token, &session.session_token))
                .unwrap_or(false);
            if !valid {
                tracing::warn!(
                    session_id = %session_id,
                    student_id = %student_id,
                    "Check-in rejected: token mismatch"
                );
                return Err(SessionError::InvalidToken);
            }
        }

        if self.policy.require_enrollment
            && !self.store.is_enrolled(session.course_id, student_id).await?
        {
            return Err(SessionError::NotEnrolled);
        }

        if let Some(record) = self.store.find_attendance(session_id, student_id).await? {
            return Ok(CheckInOutcome {
                record,
                newly_recorded: false,
            });
        }

        let record = AttendanceRecord::present(session_id, student_id, Utc::now());
        match self.store.insert_attendance(&record).await {
            Ok(record) => {
                tracing::info!(
                    session_id = %session_id,
                    student_id = %student_id,
                    "Check-in recorded"
                );
                Ok(CheckInOutcome {
                    record,
                    newly_recorded: true,
                })
            }
            Err(err) if err.is_conflict_on(ATTENDANCE_UNIQUE_CONSTRAINT) => {
                // Lost the race to a concurrent check-in of the same student.
                let existing = self
                    .store
                    .find_attendance(session_id, student_id)
                    .await?
                    .ok_or(SessionError::Store(err))?;
                Ok(CheckInOutcome {
                    record: existing,
                    newly_recorded: false,
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Attendance of a session, most recent check-in first.
    pub async fn list_attendance(
        &self,
        session_id: SessionId,
    ) -> SessionResult<Vec<AttendanceEntry>> {
        Ok(self.store.list_attendance(session_id).await?)
    }

    pub async fn attendance_status(
        &self,
        session_id: SessionId,
        student_id: UserId,
    ) -> SessionResult<AttendanceStatusView> {
        let session = self.get_session(session_id).await?;
        let record = self.store.find_attendance(session_id, student_id).await?;
        Ok(AttendanceStatusView { session, record })
    }
}

/// URL a student opens (usually from a QR code) to check in.
pub fn build_check_in_url(
    base_url: &str,
    course_code: &str,
    session_id: SessionId,
    token: &str,
) -> String {
    let token: String = form_urlencoded::byte_serialize(token.as_bytes()).collect();
    format!(
        "{}/student/courses/{}/attendance/{}?token={}",
        base_url.trim_end_matches('/'),
        course_code,
        session_id,
        token
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{attendance::AttendanceStatus, user::UserRole},
        repositories::{course_store::MockCourseStore, memory::InMemoryStore},
        services::token::{MockTokenGenerator, RandomTokenGenerator},
    };
    use chrono::Duration;
    use mockall::{predicate::always, Sequence};
    use std::collections::HashSet;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 2).unwrap()
    }

    fn manager_over(store: Arc<InMemoryStore>, policy: CheckInPolicy) -> AttendanceSessionManager {
        AttendanceSessionManager::new(store, Arc::new(RandomTokenGenerator::new()), policy, 3)
    }

    fn open_policy() -> CheckInPolicy {
        CheckInPolicy {
            require_token: false,
            require_enrollment: false,
        }
    }

    fn fixed_tokens(token: &'static str) -> Arc<MockTokenGenerator> {
        let mut tokens = MockTokenGenerator::new();
        tokens.expect_new_token().returning(move || token.to_string());
        Arc::new(tokens)
    }

    #[tokio::test]
    async fn first_session_of_a_course_is_number_one() {
        let store = Arc::new(InMemoryStore::new());
        let manager = manager_over(store.clone(), open_policy());
        let course_id = CourseId::new();

        let first = manager.create_session(course_id, "Week 1", date()).await.unwrap();
        let second = manager.create_session(course_id, "Week 2", date()).await.unwrap();
        let other = manager
            .create_session(CourseId::new(), "Other", date())
            .await
            .unwrap();

        assert_eq!(first.session_number, 1);
        assert_eq!(second.session_number, 2);
        assert_eq!(other.session_number, 1);
        assert_ne!(first.session_token, second.session_token);
        assert_eq!(first.session_token.len(), 43);
    }

    #[tokio::test]
    async fn two_concurrent_creates_get_distinct_numbers() {
        let store = Arc::new(InMemoryStore::new());
        let manager = manager_over(store.clone(), open_policy());
        let course_id = CourseId::new();

        let (a, b) = tokio::join!(
            manager.create_session(course_id, "A", date()),
            manager.create_session(course_id, "B", date())
        );

        let mut numbers = vec![a.unwrap().session_number, b.unwrap().session_number];
        numbers.sort_unstable();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(store.session_numbers(course_id), vec![1, 2]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_produce_gapless_numbers() {
        let store = Arc::new(InMemoryStore::new());
        let manager = manager_over(store.clone(), open_policy());
        let course_id = CourseId::new();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let manager = manager.clone();
                tokio::spawn(async move {
                    manager
                        .create_session(course_id, &format!("Session {i}"), date())
                        .await
                })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(SessionError::Conflict { attempts }) => assert_eq!(attempts, 3),
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert!(successes >= 1);
        let expected: Vec<i32> = (1..=successes).collect();
        assert_eq!(store.session_numbers(course_id), expected);
    }

    #[tokio::test]
    async fn retry_recomputes_the_maximum() {
        let course_id = CourseId::new();
        let mut store = MockCourseStore::new();
        let mut seq = Sequence::new();
        store
            .expect_max_session_number()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(0));
        store
            .expect_insert_session()
            .withf(|s| s.session_number == 1)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(StoreError::Conflict(SESSION_NUMBER_CONSTRAINT.into())));
        store
            .expect_max_session_number()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(1));
        store
            .expect_insert_session()
            .withf(|s| s.session_number == 2)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|s| Ok(s.clone().into_session()));

        let manager =
            AttendanceSessionManager::new(Arc::new(store), fixed_tokens("tok"), open_policy(), 3);
        let session = manager.create_session(course_id, "Lab", date()).await.unwrap();
        assert_eq!(session.session_number, 2);
        assert_eq!(session.session_token, "tok");
    }

    #[tokio::test]
    async fn create_gives_up_after_bounded_attempts() {
        let mut store = MockCourseStore::new();
        store
            .expect_max_session_number()
            .times(2)
            .returning(|_| Ok(4));
        store
            .expect_insert_session()
            .times(2)
            .returning(|_| Err(StoreError::Conflict(SESSION_NUMBER_CONSTRAINT.into())));

        let manager =
            AttendanceSessionManager::new(Arc::new(store), fixed_tokens("tok"), open_policy(), 2);
        let err = manager
            .create_session(CourseId::new(), "Lab", date())
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Conflict { attempts: 2 }));
    }

    #[tokio::test]
    async fn create_does_not_retry_other_failures() {
        let mut store = MockCourseStore::new();
        store.expect_max_session_number().times(1).returning(|_| Ok(0));
        store
            .expect_insert_session()
            .times(1)
            .returning(|_| Err(StoreError::Unavailable(sqlx::Error::PoolTimedOut)));

        let manager =
            AttendanceSessionManager::new(Arc::new(store), fixed_tokens("tok"), open_policy(), 3);
        let err = manager
            .create_session(CourseId::new(), "Lab", date())
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Store(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn check_in_twice_keeps_one_record() {
        let store = Arc::new(InMemoryStore::new());
        let manager = manager_over(store.clone(), CheckInPolicy::default());
        let student = store.seed_profile(UserRole::Student);
        let session = manager
            .create_session(CourseId::new(), "Week 1", date())
            .await
            .unwrap();
        let token = session.session_token.clone();

        let first = manager
            .check_in(session.id, student.user_id, Some(&token))
            .await
            .unwrap();
        let second = manager
            .check_in(session.id, student.user_id, Some(&token))
            .await
            .unwrap();

        assert!(first.newly_recorded);
        assert!(!second.newly_recorded);
        assert_eq!(first.record, second.record);
        assert_eq!(first.record.status, AttendanceStatus::Present);
        assert_eq!(store.attendance_count(session.id), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_check_ins_return_the_same_record() {
        let store = Arc::new(InMemoryStore::new());
        let manager = manager_over(store.clone(), open_policy());
        let student_id = store.seed_profile(UserRole::Student).user_id;
        let session = manager
            .create_session(CourseId::new(), "Week 1", date())
            .await
            .unwrap();

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let manager = manager.clone();
                let session_id = session.id;
                tokio::spawn(async move { manager.check_in(session_id, student_id, None).await })
            })
            .collect();

        let mut outcomes = Vec::new();
        for handle in handles {
            outcomes.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(store.attendance_count(session.id), 1);
        assert_eq!(outcomes.iter().filter(|o| o.newly_recorded).count(), 1);
        let created: HashSet<_> = outcomes.iter().map(|o| o.record.created_at).collect();
        assert_eq!(created.len(), 1);
    }

    #[tokio::test]
    async fn lost_insert_race_rereads_existing_record() {
        let session = NewSession {
            id: SessionId::new(),
            course_id: CourseId::new(),
            session_number: 1,
            title: "Week 1".into(),
            session_date: date(),
            session_token: "tok".into(),
            created_at: Utc::now(),
        }
        .into_session();
        let student_id = UserId::new();
        let winner = AttendanceRecord::present(session.id, student_id, Utc::now());

        let mut store = MockCourseStore::new();
        let mut seq = Sequence::new();
        let returned = session.clone();
        store
            .expect_get_session()
            .returning(move |_| Ok(Some(returned.clone())));
        store
            .expect_find_attendance()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(None));
        store
            .expect_insert_attendance()
            .with(always())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(StoreError::Conflict(ATTENDANCE_UNIQUE_CONSTRAINT.into())));
        let existing = winner.clone();
        store
            .expect_find_attendance()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_, _| Ok(Some(existing.clone())));

        let manager =
            AttendanceSessionManager::new(Arc::new(store), fixed_tokens("tok"), open_policy(), 3);
        let outcome = manager.check_in(session.id, student_id, None).await.unwrap();
        assert_eq!(outcome.record, winner);
        assert!(!outcome.newly_recorded);
    }

    #[tokio::test]
    async fn check_in_to_unknown_session_records_nothing() {
        let store = Arc::new(InMemoryStore::new());
        let manager = manager_over(store.clone(), open_policy());
        let missing = SessionId::new();

        let err = manager
            .check_in(missing, UserId::new(), Some("whatever"))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::SessionNotFound));
        assert_eq!(store.attendance_count(missing), 0);
    }

    #[tokio::test]
    async fn token_is_required_by_default() {
        let store = Arc::new(InMemoryStore::new());
        let manager = manager_over(store.clone(), CheckInPolicy::default());
        let student_id = store.seed_profile(UserRole::Student).user_id;
        let session = manager
            .create_session(CourseId::new(), "Week 1", date())
            .await
            .unwrap();

        for presented in [None, Some("wrong"), Some("")] {
            let err = manager
                .check_in(session.id, student_id, presented)
                .await
                .unwrap_err();
            assert!(matches!(err, SessionError::InvalidToken));
        }
        assert_eq!(store.attendance_count(session.id), 0);
    }

    #[tokio::test]
    async fn enrollment_is_checked_only_when_required() {
        let store = Arc::new(InMemoryStore::new());
        let strict = manager_over(
            store.clone(),
            CheckInPolicy {
                require_token: false,
                require_enrollment: true,
            },
        );
        let student_id = store.seed_profile(UserRole::Student).user_id;
        let course_id = CourseId::new();
        let session = strict.create_session(course_id, "Week 1", date()).await.unwrap();

        let err = strict.check_in(session.id, student_id, None).await.unwrap_err();
        assert!(matches!(err, SessionError::NotEnrolled));

        let lenient = manager_over(store.clone(), open_policy());
        assert!(lenient.check_in(session.id, student_id, None).await.is_ok());

        use crate::repositories::CourseRepository;
        let other_student = store.seed_profile(UserRole::Student).user_id;
        store.enroll(course_id, other_student).await.unwrap();
        assert!(strict.check_in(session.id, other_student, None).await.is_ok());
    }

    #[tokio::test]
    async fn list_attendance_is_most_recent_first() {
        let store = Arc::new(InMemoryStore::new());
        let manager = manager_over(store.clone(), open_policy());
        let session = manager
            .create_session(CourseId::new(), "Week 1", date())
            .await
            .unwrap();

        let base = Utc::now();
        let mut students = Vec::new();
        for offset in [3, 1, 2] {
            let student_id = store.seed_profile(UserRole::Student).user_id;
            let record = AttendanceRecord::present(
                session.id,
                student_id,
                base + Duration::seconds(offset),
            );
            store.insert_attendance(&record).await.unwrap();
            students.push((offset, student_id));
        }

        let entries = manager.list_attendance(session.id).await.unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries
            .windows(2)
            .all(|pair| pair[0].created_at > pair[1].created_at));
        let newest = students.iter().find(|(offset, _)| *offset == 3).unwrap().1;
        assert_eq!(entries[0].student_id, newest);
    }

    #[tokio::test]
    async fn attendance_status_reflects_check_in() {
        let store = Arc::new(InMemoryStore::new());
        let manager = manager_over(store.clone(), open_policy());
        let student_id = store.seed_profile(UserRole::Student).user_id;
        let session = manager
            .create_session(CourseId::new(), "Week 1", date())
            .await
            .unwrap();

        let before = manager.attendance_status(session.id, student_id).await.unwrap();
        assert!(before.record.is_none());

        manager.check_in(session.id, student_id, None).await.unwrap();
        let after = manager.attendance_status(session.id, student_id).await.unwrap();
        assert_eq!(after.record.map(|r| r.student_id), Some(student_id));
    }

    #[tokio::test]
    async fn session_from_another_course_is_not_found() {
        let store = Arc::new(InMemoryStore::new());
        let manager = manager_over(store.clone(), open_policy());
        let teacher_id = UserId::new();
        let course = Course::new(teacher_id, "C1".into(), "Course".into(), None);
        let other = Course::new(teacher_id, "C2".into(), "Other".into(), None);
        let session = manager.create_session(other.id, "Week 1", date()).await.unwrap();

        let err = manager
            .session_in_course(&course, session.id)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::SessionNotFound));
        assert!(manager.session_in_course(&other, session.id).await.is_ok());
    }

    #[tokio::test]
    async fn store_outage_surfaces_as_unavailable() {
        let store = Arc::new(InMemoryStore::new());
        let manager = manager_over(store.clone(), open_policy());
        store.set_unavailable(true);

        let err = manager.get_session(SessionId::new()).await.unwrap_err();
        let app: AppError = err.into();
        assert!(matches!(app, AppError::ServiceUnavailable(_)));
    }

    #[test]
    fn check_in_url_format() {
        let session_id = SessionId::new();
        let url = build_check_in_url("https://rollcall.example/", "CS101", session_id, "a+b/c=");
        assert_eq!(
            url,
            format!(
                "https://rollcall.example/student/courses/CS101/attendance/{}?token=a%2Bb%2Fc%3D",
                session_id
            )
        );
    }

    #[test]
    fn check_in_url_keeps_url_safe_tokens_verbatim() {
        let session_id = SessionId::new();
        let url = build_check_in_url("http://localhost:3000", "C1", session_id, "Ab-_9");
        assert!(url.ends_with("?token=Ab-_9"));
    }

    #[test]
    fn session_errors_map_to_http_errors() {
        assert!(matches!(
            AppError::from(SessionError::SessionNotFound),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            AppError::from(SessionError::InvalidToken),
            AppError::Forbidden(_)
        ));
        assert!(matches!(
            AppError::from(SessionError::NotEnrolled),
            AppError::Forbidden(_)
        ));
        assert!(matches!(
            AppError::from(SessionError::Conflict { attempts: 3 }),
            AppError::Conflict(_)
        ));
    }
}
