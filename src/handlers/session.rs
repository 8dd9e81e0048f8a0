// src/handlers/session.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::{error::AppError, session::Session, state::AppState};

/// Returns the caller's session (restored by the auth middleware).
pub async fn get_session(Extension(session): Extension<Session>) -> impl IntoResponse {
    Json(session)
}

/// Clears the session and discards every open assessment of the caller.
pub async fn sign_out(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, AppError> {
    state.sessions.sign_out(&session.user_id).await;
    let closed = state.registry.remove_user(&session.user_id).await;

    tracing::info!(
        "User {} signed out ({} open assessments discarded)",
        session.user_id,
        closed
    );
    Ok(StatusCode::NO_CONTENT)
}
