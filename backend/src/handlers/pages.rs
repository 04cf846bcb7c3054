//! Public pages and dashboards.

use axum::{
    extract::{Extension, State},
    Json,
};
use serde_json::{json, Value};

use crate::{
    error::AppError,
    middleware::auth::{require_student, require_teacher},
    models::course::{CourseResponse, StudentDashboardResponse, TeacherDashboardResponse},
    services::Caller,
    state::AppState,
};

fn page(name: &str) -> Json<Value> {
    Json(json!({ "page": name }))
}

pub async fn login() -> Json<Value> {
    page("login")
}

pub async fn register() -> Json<Value> {
    page("register")
}

pub async fn reset_password() -> Json<Value> {
    page("reset-password")
}

pub async fn update_password() -> Json<Value> {
    page("update-password")
}

pub async fn teacher_dashboard(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<TeacherDashboardResponse>, AppError> {
    let teacher_id = require_teacher(&caller)?;
    let active_courses = state.courses.count_teacher_courses(teacher_id).await?;
    let courses = state.courses.list_teacher_courses(teacher_id).await?;
    let profile = state.courses.member_profile(teacher_id).await?;
    Ok(Json(TeacherDashboardResponse {
        firstname: profile.map(|p| p.firstname),
        active_courses,
        courses: courses.into_iter().map(CourseResponse::from).collect(),
    }))
}

pub async fn student_dashboard(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<StudentDashboardResponse>, AppError> {
    let student_id = require_student(&caller)?;
    let courses = state.courses.list_student_courses(student_id).await?;
    let profile = state.courses.member_profile(student_id).await?;
    Ok(Json(StudentDashboardResponse {
        firstname: profile.map(|p| p.firstname),
        courses: courses.into_iter().map(CourseResponse::from).collect(),
    }))
}
