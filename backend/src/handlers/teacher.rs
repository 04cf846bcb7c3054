use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    error::AppError,
    handlers::parse_session_id,
    middleware::auth::require_teacher,
    models::{
        attendance::{AttendanceEntryResponse, SessionAttendanceResponse},
        course::{
            CourseDetailResponse, CourseResponse, CreateCourseRequest, EnrollStudentRequest,
            EnrollmentResponse,
        },
        session::{CreateSessionRequest, IssuedSessionResponse, SessionResponse},
        user::StudentSummary,
    },
    services::{build_check_in_url, Caller},
    state::AppState,
};

pub async fn create_course(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<CreateCourseRequest>,
) -> Result<(StatusCode, Json<CourseResponse>), AppError> {
    let teacher_id = require_teacher(&caller)?;
    payload.validate()?;

    let course = state
        .courses
        .create_course(
            teacher_id,
            &payload.course_code,
            &payload.course_name,
            payload.description.as_deref(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(course.into())))
}

pub async fn course_detail(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(course_code): Path<String>,
) -> Result<Json<CourseDetailResponse>, AppError> {
    let teacher_id = require_teacher(&caller)?;
    let course = state
        .courses
        .course_for_teacher(&course_code, teacher_id)
        .await?;
    let sessions = state.sessions.list_sessions(course.id).await?;

    Ok(Json(CourseDetailResponse {
        course: course.into(),
        sessions: sessions.iter().map(SessionResponse::from).collect(),
    }))
}

pub async fn enroll_student(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(course_code): Path<String>,
    Json(payload): Json<EnrollStudentRequest>,
) -> Result<Json<EnrollmentResponse>, AppError> {
    let teacher_id = require_teacher(&caller)?;
    payload.validate()?;

    let course = state
        .courses
        .course_for_teacher(&course_code, teacher_id)
        .await?;
    let outcome = state.courses.enroll_student(&course, &payload.email).await?;

    Ok(Json(EnrollmentResponse {
        course_code: course.course_code,
        student: StudentSummary::from(outcome.student),
        newly_enrolled: outcome.newly_enrolled,
    }))
}

pub async fn create_session(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(course_code): Path<String>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<IssuedSessionResponse>), AppError> {
    let teacher_id = require_teacher(&caller)?;
    payload.validate()?;

    let course = state
        .courses
        .course_for_teacher(&course_code, teacher_id)
        .await?;
    let session_date = payload.session_date.unwrap_or_else(|| {
        Utc::now()
            .with_timezone(&state.config.time_zone)
            .date_naive()
    });
    let session = state
        .sessions
        .create_session(course.id, payload.title.trim(), session_date)
        .await?;

    let check_in_url = build_check_in_url(
        &state.config.base_url,
        &course.course_code,
        session.id,
        &session.session_token,
    );
    Ok((
        StatusCode::CREATED,
        Json(IssuedSessionResponse {
            session: SessionResponse::from(&session),
            token: session.session_token,
            check_in_url,
        }),
    ))
}

pub async fn session_attendance(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path((course_code, session_id)): Path<(String, String)>,
) -> Result<Json<SessionAttendanceResponse>, AppError> {
    let teacher_id = require_teacher(&caller)?;
    let session_id = parse_session_id(&session_id)?;

    let course = state
        .courses
        .course_for_teacher(&course_code, teacher_id)
        .await?;
    let session = state.sessions.session_in_course(&course, session_id).await?;
    let attendance = state.sessions.list_attendance(session.id).await?;

    Ok(Json(SessionAttendanceResponse {
        check_in_url: build_check_in_url(
            &state.config.base_url,
            &course.course_code,
            session.id,
            &session.session_token,
        ),
        session: SessionResponse::from(&session),
        attendance: attendance
            .into_iter()
            .map(AttendanceEntryResponse::from)
            .collect(),
    }))
}
