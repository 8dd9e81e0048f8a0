// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{assessment, interview, session},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (session, assessments, interviews).
/// * Every route requires a valid access token.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:5173"),
        HeaderValue::from_static("http://127.0.0.1:5173"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let session_routes = Router::new()
        .route("/", get(session::get_session))
        .route("/sign-out", post(session::sign_out));

    let assessment_routes = Router::new()
        .route(
            "/{skill_id}",
            get(assessment::open_assessment).delete(assessment::close_assessment),
        )
        .route("/{skill_id}/start", post(assessment::start_assessment))
        .route("/{skill_id}/answer", post(assessment::select_answer))
        .route("/{skill_id}/navigate", post(assessment::navigate))
        .route("/{skill_id}/submit", post(assessment::submit_assessment));

    let interview_routes = Router::new()
        .route("/", post(interview::book_interview))
        .route("/{va_id}/slots", get(interview::list_slots));

    Router::new()
        .nest("/api/session", session_routes)
        .nest("/api/assessments", assessment_routes)
        .nest("/api/interviews", interview_routes)
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
