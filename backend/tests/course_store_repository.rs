use std::{collections::HashSet, sync::Arc};

use chrono::{Duration, NaiveDate, Utc};
use rollcall_backend::{
    models::{attendance::AttendanceRecord, course::Course, user::UserRole},
    repositories::{
        CourseRepository, CourseStore, PgCourseRepository, PgCourseStore, PgUserDirectory,
        StoreError, UserDirectory, ATTENDANCE_UNIQUE_CONSTRAINT, COURSE_CODE_CONSTRAINT,
    },
    services::{AttendanceSessionManager, CheckInPolicy, RandomTokenGenerator, SessionError},
    types::{CourseId, UserId},
};

mod support;

use support::{seed_profile, test_pool, unique_course_code};

async fn seed_course(pool: &sqlx::PgPool) -> Course {
    let teacher = seed_profile(pool, UserRole::Teacher).await;
    let course = Course::new(
        teacher.user_id,
        unique_course_code("REPO"),
        "Repository course".into(),
        None,
    );
    PgCourseRepository::new(pool.clone())
        .create(&course)
        .await
        .expect("create course")
}

fn manager(pool: &sqlx::PgPool, attempts: u32) -> AttendanceSessionManager {
    AttendanceSessionManager::new(
        Arc::new(PgCourseStore::new(pool.clone())),
        Arc::new(RandomTokenGenerator::new()),
        CheckInPolicy {
            require_token: false,
            require_enrollment: false,
        },
        attempts,
    )
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 9, 2).unwrap()
}

#[tokio::test]
async fn directory_resolves_roles_and_emails() {
    let pool = test_pool().await;
    let directory = PgUserDirectory::new(pool.clone());
    let student = seed_profile(&pool, UserRole::Student).await;

    assert_eq!(
        directory.get_role(student.user_id).await.unwrap(),
        Some(UserRole::Student)
    );
    assert_eq!(directory.get_role(UserId::new()).await.unwrap(), None);
    let found = directory
        .find_by_email(&student.email.to_uppercase())
        .await
        .unwrap()
        .expect("profile by email");
    assert_eq!(found.user_id, student.user_id);
}

#[tokio::test]
async fn duplicate_course_code_is_a_named_conflict() {
    let pool = test_pool().await;
    let repo = PgCourseRepository::new(pool.clone());
    let course = seed_course(&pool).await;

    let copy = Course::new(
        course.teacher_id,
        course.course_code.clone(),
        "Copy".into(),
        None,
    );
    let err = repo.create(&copy).await.unwrap_err();
    assert!(err.is_conflict_on(COURSE_CODE_CONSTRAINT));
}

#[tokio::test]
async fn enroll_twice_reports_existing_enrollment() {
    let pool = test_pool().await;
    let repo = PgCourseRepository::new(pool.clone());
    let course = seed_course(&pool).await;
    let student = seed_profile(&pool, UserRole::Student).await;

    assert!(repo.enroll(course.id, student.user_id).await.unwrap());
    assert!(!repo.enroll(course.id, student.user_id).await.unwrap());
    let courses = repo.list_for_student(student.user_id).await.unwrap();
    assert_eq!(courses.len(), 1);
    assert!(PgCourseStore::new(pool.clone())
        .is_enrolled(course.id, student.user_id)
        .await
        .unwrap());
}

#[tokio::test]
async fn concurrent_session_creates_number_without_gaps() {
    let pool = test_pool().await;
    let course = seed_course(&pool).await;
    let manager = manager(&pool, 10);

    let handles: Vec<_> = (0..6)
        .map(|i| {
            let manager = manager.clone();
            let course_id = course.id;
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
            Err(SessionError::Conflict { .. }) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    let mut numbers: Vec<i32> = manager
        .list_sessions(course.id)
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.session_number)
        .collect();
    numbers.sort_unstable();
    assert_eq!(numbers, (1..=successes).collect::<Vec<i32>>());
}

#[tokio::test]
async fn attendance_insert_conflict_is_named() {
    let pool = test_pool().await;
    let store = PgCourseStore::new(pool.clone());
    let course = seed_course(&pool).await;
    let student = seed_profile(&pool, UserRole::Student).await;
    let session = manager(&pool, 3)
        .create_session(course.id, "Week 1", date())
        .await
        .unwrap();

    let record = AttendanceRecord::present(session.id, student.user_id, Utc::now());
    store.insert_attendance(&record).await.unwrap();
    let again = AttendanceRecord::present(session.id, student.user_id, Utc::now());
    let err = store.insert_attendance(&again).await.unwrap_err();
    assert!(matches!(&err, StoreError::Conflict(_)));
    assert!(err.is_conflict_on(ATTENDANCE_UNIQUE_CONSTRAINT));
}

#[tokio::test]
async fn concurrent_check_ins_store_one_row() {
    let pool = test_pool().await;
    let course = seed_course(&pool).await;
    let student = seed_profile(&pool, UserRole::Student).await;
    let manager = manager(&pool, 3);
    let session = manager
        .create_session(course.id, "Week 1", date())
        .await
        .unwrap();

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let manager = manager.clone();
            let session_id = session.id;
            let student_id = student.user_id;
            tokio::spawn(async move { manager.check_in(session_id, student_id, None).await })
        })
        .collect();

    let mut created_at = HashSet::new();
    for handle in handles {
        let outcome = handle.await.unwrap().expect("check in");
        created_at.insert(outcome.record.created_at);
    }
    assert_eq!(created_at.len(), 1);

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attendance WHERE session_id = $1")
        .bind(session.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn list_attendance_orders_newest_first() {
    let pool = test_pool().await;
    let store = PgCourseStore::new(pool.clone());
    let course = seed_course(&pool).await;
    let session = manager(&pool, 3)
        .create_session(course.id, "Week 1", date())
        .await
        .unwrap();

    let base = Utc::now();
    for offset in [5, 1, 3] {
        let student = seed_profile(&pool, UserRole::Student).await;
        let record =
            AttendanceRecord::present(session.id, student.user_id, base + Duration::seconds(offset));
        store.insert_attendance(&record).await.unwrap();
    }

    let entries = store.list_attendance(session.id).await.unwrap();
    assert_eq!(entries.len(), 3);
    assert!(entries
        .windows(2)
        .all(|pair| pair[0].created_at > pair[1].created_at));
}

#[tokio::test]
async fn max_session_number_is_zero_for_new_course() {
    let pool = test_pool().await;
    let store = PgCourseStore::new(pool.clone());
    assert_eq!(store.max_session_number(CourseId::new()).await.unwrap(), 0);
}
