pub mod config;
pub mod db;
pub mod docs;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod services;
pub mod state;
pub mod types;
pub mod utils;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{docs::ApiDoc, state::AppState};

/// Application routes with the gate and request-id layers, without CORS or tracing.
pub fn build_router(state: AppState) -> Router {
    let pages = Router::new()
        .route("/", get(handlers::pages::login))
        .route("/register", get(handlers::pages::register))
        .route("/reset-password", get(handlers::pages::reset_password))
        .route("/update-password", get(handlers::pages::update_password))
        .route(
            "/teacher-dashboard",
            get(handlers::pages::teacher_dashboard),
        )
        .route(
            "/student-dashboard",
            get(handlers::pages::student_dashboard),
        );

    let teacher_routes = Router::new()
        .route("/teacher/courses", post(handlers::teacher::create_course))
        .route(
            "/teacher/courses/{course_code}",
            get(handlers::teacher::course_detail),
        )
        .route(
            "/teacher/courses/{course_code}/students",
            post(handlers::teacher::enroll_student),
        )
        .route(
            "/teacher/courses/{course_code}/sessions",
            post(handlers::teacher::create_session),
        )
        .route(
            "/teacher/courses/{course_code}/attendance/{session_id}",
            get(handlers::teacher::session_attendance),
        );

    let student_routes = Router::new()
        .route(
            "/student/courses/{course_code}",
            get(handlers::student::course_detail),
        )
        .route(
            "/student/courses/{course_code}/attendance/{session_id}",
            get(handlers::student::attendance_status).post(handlers::student::check_in),
        );

    let api_routes = Router::new().route("/api/health", get(handlers::health::health));

    Router::new()
        .merge(pages)
        .merge(teacher_routes)
        .merge(student_routes)
        .merge(api_routes)
        .merge(SwaggerUi::new("/api/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::gate,
        ))
        .layer(axum_middleware::from_fn(middleware::request_id::request_id))
        .with_state(state)
}
