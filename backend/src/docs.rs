#![allow(dead_code)] // OpenAPI doc stubs are only referenced by utoipa macros.

use crate::models::{
    attendance::{
        AttendanceEntryResponse, AttendanceStatus, CheckInQuery, SessionAttendanceResponse,
        StudentAttendanceResponse, StudentAttendanceState,
    },
    course::{
        CourseDetailResponse, CourseResponse, CreateCourseRequest, EnrollStudentRequest,
        EnrollmentResponse, StudentDashboardResponse, TeacherDashboardResponse,
    },
    session::{CreateSessionRequest, IssuedSessionResponse, SessionResponse},
    user::StudentSummary,
};
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health_doc,
        teacher_dashboard_doc,
        student_dashboard_doc,
        create_course_doc,
        teacher_course_detail_doc,
        enroll_student_doc,
        create_session_doc,
        session_attendance_doc,
        student_course_detail_doc,
        attendance_status_doc,
        check_in_doc
    ),
    components(
        schemas(
            // courses
            CreateCourseRequest,
            CourseResponse,
            CourseDetailResponse,
            EnrollStudentRequest,
            EnrollmentResponse,
            StudentSummary,
            TeacherDashboardResponse,
            StudentDashboardResponse,
            // sessions & attendance
            CreateSessionRequest,
            SessionResponse,
            IssuedSessionResponse,
            AttendanceStatus,
            AttendanceEntryResponse,
            SessionAttendanceResponse,
            StudentAttendanceState,
            StudentAttendanceResponse
        )
    ),
    modifiers(&SecuritySchemes),
    tags(
        (name = "Teacher", description = "Courses, enrollment and attendance sessions"),
        (name = "Student", description = "Course pages and check-in"),
        (name = "System", description = "Health")
    ),
    security(("BearerAuth" = []))
)]
pub struct ApiDoc;

struct SecuritySchemes;

impl Modify for SecuritySchemes {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();

        let mut bearer = Http::new(HttpAuthScheme::Bearer);
        bearer.bearer_format = Some("JWT".to_string());

        components.add_security_scheme("BearerAuth", SecurityScheme::Http(bearer));
    }
}

#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service and database reachable", body = serde_json::Value),
        (status = 503, description = "Database unreachable", body = serde_json::Value)
    ),
    tag = "System",
    security(())
)]
fn health_doc() {}

#[utoipa::path(
    get,
    path = "/teacher-dashboard",
    responses(
        (status = 200, body = TeacherDashboardResponse),
        (status = 307, description = "Redirected by role")
    ),
    tag = "Teacher"
)]
fn teacher_dashboard_doc() {}

#[utoipa::path(
    get,
    path = "/student-dashboard",
    responses(
        (status = 200, body = StudentDashboardResponse),
        (status = 307, description = "Redirected by role")
    ),
    tag = "Student"
)]
fn student_dashboard_doc() {}

#[utoipa::path(
    post,
    path = "/teacher/courses",
    request_body = CreateCourseRequest,
    responses(
        (status = 201, body = CourseResponse),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Course code already in use")
    ),
    tag = "Teacher"
)]
fn create_course_doc() {}

#[utoipa::path(
    get,
    path = "/teacher/courses/{course_code}",
    params(("course_code" = String, Path, description = "Course code")),
    responses(
        (status = 200, body = CourseDetailResponse),
        (status = 403, description = "Course owned by another teacher"),
        (status = 404, description = "Course not found")
    ),
    tag = "Teacher"
)]
fn teacher_course_detail_doc() {}

#[utoipa::path(
    post,
    path = "/teacher/courses/{course_code}/students",
    params(("course_code" = String, Path, description = "Course code")),
    request_body = EnrollStudentRequest,
    responses(
        (status = 200, body = EnrollmentResponse),
        (status = 404, description = "Course or student not found")
    ),
    tag = "Teacher"
)]
fn enroll_student_doc() {}

#[utoipa::path(
    post,
    path = "/teacher/courses/{course_code}/sessions",
    params(("course_code" = String, Path, description = "Course code")),
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session with its token and check-in URL", body = IssuedSessionResponse),
        (status = 409, description = "Session number contention, retry")
    ),
    tag = "Teacher"
)]
fn create_session_doc() {}

#[utoipa::path(
    get,
    path = "/teacher/courses/{course_code}/attendance/{session_id}",
    params(
        ("course_code" = String, Path, description = "Course code"),
        ("session_id" = String, Path, description = "Session ID")
    ),
    responses(
        (status = 200, body = SessionAttendanceResponse),
        (status = 404, description = "Session not found in this course")
    ),
    tag = "Teacher"
)]
fn session_attendance_doc() {}

#[utoipa::path(
    get,
    path = "/student/courses/{course_code}",
    params(("course_code" = String, Path, description = "Course code")),
    responses((status = 200, body = CourseDetailResponse)),
    tag = "Student"
)]
fn student_course_detail_doc() {}

#[utoipa::path(
    get,
    path = "/student/courses/{course_code}/attendance/{session_id}",
    params(
        ("course_code" = String, Path, description = "Course code"),
        ("session_id" = String, Path, description = "Session ID")
    ),
    responses((status = 200, body = StudentAttendanceResponse)),
    tag = "Student"
)]
fn attendance_status_doc() {}

#[utoipa::path(
    post,
    path = "/student/courses/{course_code}/attendance/{session_id}",
    params(
        ("course_code" = String, Path, description = "Course code"),
        ("session_id" = String, Path, description = "Session ID"),
        CheckInQuery
    ),
    responses(
        (status = 200, description = "Checked in; repeated calls return the first record", body = StudentAttendanceResponse),
        (status = 403, description = "Token mismatch or not enrolled"),
        (status = 404, description = "Session not found")
    ),
    tag = "Student"
)]
fn check_in_doc() {}
