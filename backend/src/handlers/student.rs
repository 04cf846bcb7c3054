use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};

use crate::{
    error::AppError,
    handlers::parse_session_id,
    middleware::auth::require_student,
    models::{
        attendance::{
            AttendanceRecord, CheckInQuery, StudentAttendanceResponse, StudentAttendanceState,
        },
        course::CourseDetailResponse,
        session::{AttendanceSession, SessionResponse},
    },
    services::Caller,
    state::AppState,
};

fn attendance_response(
    session: &AttendanceSession,
    record: Option<&AttendanceRecord>,
    newly_recorded: Option<bool>,
) -> StudentAttendanceResponse {
    StudentAttendanceResponse {
        session: SessionResponse::from(session),
        status: if record.is_some() {
            StudentAttendanceState::Present
        } else {
            StudentAttendanceState::NotCheckedIn
        },
        checked_in_at: record.map(|r| r.created_at),
        newly_recorded,
    }
}

pub async fn course_detail(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(course_code): Path<String>,
) -> Result<Json<CourseDetailResponse>, AppError> {
    require_student(&caller)?;
    let course = state.courses.course_for_student(&course_code).await?;
    let sessions = state.sessions.list_sessions(course.id).await?;

    Ok(Json(CourseDetailResponse {
        course: course.into(),
        sessions: sessions.iter().map(SessionResponse::from).collect(),
    }))
}

pub async fn attendance_status(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path((course_code, session_id)): Path<(String, String)>,
) -> Result<Json<StudentAttendanceResponse>, AppError> {
    let student_id = require_student(&caller)?;
    let session_id = parse_session_id(&session_id)?;

    let course = state.courses.course_for_student(&course_code).await?;
    state.sessions.session_in_course(&course, session_id).await?;
    let view = state
        .sessions
        .attendance_status(session_id, student_id)
        .await?;

    Ok(Json(attendance_response(
        &view.session,
        view.record.as_ref(),
        None,
    )))
}

pub async fn check_in(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path((course_code, session_id)): Path<(String, String)>,
    Query(query): Query<CheckInQuery>,
) -> Result<Json<StudentAttendanceResponse>, AppError> {
    let student_id = require_student(&caller)?;
    let session_id = parse_session_id(&session_id)?;

    let course = state.courses.course_for_student(&course_code).await?;
    let session = state.sessions.session_in_course(&course, session_id).await?;
    let outcome = state
        .sessions
        .check_in(session.id, student_id, query.token.as_deref())
        .await?;

    Ok(Json(attendance_response(
        &session,
        Some(&outcome.record),
        Some(outcome.newly_recorded),
    )))
}
