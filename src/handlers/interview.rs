// src/handlers/interview.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        interview::{BookInterviewRequest, NewInterview, SlotParams},
        profile::Role,
    },
    notify::Notification,
    scheduling::{DEFAULT_DAYS, DEFAULT_SLOT_MINUTES, SlotQuery, is_open_slot, open_slots},
    session::Session,
    state::AppState,
};

fn slot_range(query: &SlotQuery) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
    query
        .range()
        .ok_or_else(|| AppError::BadRequest("Date is out of range".to_string()))
}

/// Lists a VA's free interview slots.
///
/// * `from` defaults to today (UTC), `days` to a week.
/// * Slots inside the minimum notice period are not offered.
pub async fn list_slots(
    State(state): State<AppState>,
    Path(va_id): Path<String>,
    Query(params): Query<SlotParams>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = params.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let now = Utc::now();
    let query = SlotQuery::new(
        params.from.unwrap_or_else(|| now.date_naive()),
        params.days.unwrap_or(DEFAULT_DAYS),
        now,
    );
    let (range_start, range_end) = slot_range(&query)?;

    let (windows, bookings) = tokio::try_join!(
        state.interviews.fetch_availability(&va_id),
        state.interviews.fetch_bookings(&va_id, range_start, range_end),
    )?;

    let slots = open_slots(&windows, &bookings, &query);
    Ok(Json(json!({ "va_id": va_id, "slots": slots })))
}

/// Books an interview with a VA (clients only).
///
/// The slot is re-checked against current bookings right before insert.
pub async fn book_interview(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(payload): Json<BookInterviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    session.require_role(Role::Client)?;

    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let query = SlotQuery::new(payload.scheduled_at.date_naive(), 1, Utc::now());
    let (range_start, range_end) = slot_range(&query)?;

    let (windows, bookings) = tokio::try_join!(
        state.interviews.fetch_availability(&payload.va_id),
        state
            .interviews
            .fetch_bookings(&payload.va_id, range_start, range_end),
    )?;

    if !is_open_slot(&windows, &bookings, payload.scheduled_at, &query) {
        return Err(AppError::Conflict(
            "This time slot is no longer available".to_string(),
        ));
    }

    let interview = state
        .interviews
        .book_interview(&NewInterview {
            client_id: session.user_id.clone(),
            va_id: payload.va_id,
            scheduled_at: payload.scheduled_at,
            duration_minutes: DEFAULT_SLOT_MINUTES,
            notes: payload.notes.filter(|n| !n.trim().is_empty()),
        })
        .await?;

    tracing::info!(
        "Interview {} booked by {} with {} at {}",
        interview.id,
        interview.client_id,
        interview.va_id,
        interview.scheduled_at
    );

    state.notifier.notify(Notification::InterviewBooked {
        interview_id: interview.id.clone(),
        client_id: interview.client_id.clone(),
        va_id: interview.va_id.clone(),
        scheduled_at: interview.scheduled_at,
    });

    Ok((StatusCode::CREATED, Json(interview)))
}
