// src/handlers/assessment.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    assessment::{ActiveAssessment, SubmitTrigger},
    error::AppError,
    models::assessment::{NavigateAction, NavigateRequest, SelectAnswerRequest},
    session::{Session, SessionRefresh},
    state::AppState,
};

/// Looks up the caller's open assessment for `skill_id`.
async fn live_assessment(
    state: &AppState,
    session: &Session,
    skill_id: &str,
) -> Result<ActiveAssessment, AppError> {
    session.require_va()?;
    state
        .registry
        .get(&session.user_id, skill_id)
        .await
        .ok_or_else(|| AppError::NotFound("Open the assessment first".to_string()))
}

/// Opens the assessment page.
///
/// * Creates the runner and loads eligibility + config on first visit.
/// * Returns the current view on later visits (polled for the countdown).
pub async fn open_assessment(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(skill_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let va = session.require_va()?;

    if let Some(existing) = state.registry.get(&session.user_id, &skill_id).await {
        return Ok(Json(existing.view().await));
    }

    let refresh = SessionRefresh::new(
        state.sessions.clone(),
        state.profiles.clone(),
        &session.user_id,
    );
    let assessment = ActiveAssessment::new(
        &va.id,
        &skill_id,
        state.assessments.clone(),
        state.notifier.clone(),
        state.tick_period(),
    )
    .with_pass_listener(Arc::new(refresh));
    assessment.load().await;

    let live = state
        .registry
        .insert_if_absent(&session.user_id, &skill_id, assessment)
        .await;

    Ok(Json(live.view().await))
}

/// Leaves the assessment page. The in-progress attempt is discarded.
pub async fn close_assessment(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(skill_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    session.require_va()?;

    if !state.registry.remove(&session.user_id, &skill_id).await {
        return Err(AppError::NotFound("Assessment is not open".to_string()));
    }

    tracing::info!("User {} left assessment {}", session.user_id, skill_id);
    Ok(StatusCode::NO_CONTENT)
}

/// Starts a new attempt from the intro screen.
pub async fn start_assessment(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(skill_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let assessment = live_assessment(&state, &session, &skill_id).await?;
    assessment.start().await?;
    Ok(Json(assessment.view().await))
}

/// Records the answer to the question on screen.
pub async fn select_answer(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(skill_id): Path<String>,
    Json(payload): Json<SelectAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let assessment = live_assessment(&state, &session, &skill_id).await?;
    assessment.select_answer(payload.option_index).await?;
    Ok(Json(assessment.view().await))
}

/// Moves between questions. Never requires the current question to be answered.
pub async fn navigate(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(skill_id): Path<String>,
    Json(payload): Json<NavigateRequest>,
) -> Result<impl IntoResponse, AppError> {
    let assessment = live_assessment(&state, &session, &skill_id).await?;

    match payload.action {
        NavigateAction::Next => assessment.go_next().await?,
        NavigateAction::Prev => assessment.go_prev().await?,
        NavigateAction::Goto => {
            let index = payload
                .index
                .ok_or_else(|| AppError::BadRequest("'index' is required for goto".to_string()))?;
            assessment.go_to_question(index).await?
        }
    };

    Ok(Json(assessment.view().await))
}

/// Submits the attempt from the last question.
///
/// A pass refreshes the caller's session (see `SessionRefresh`) before the
/// results are returned.
pub async fn submit_assessment(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(skill_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let assessment = live_assessment(&state, &session, &skill_id).await?;
    assessment.submit(SubmitTrigger::UserConfirmed).await?;
    Ok(Json(assessment.view().await))
}
