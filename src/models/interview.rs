// src/models/interview.rs

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A weekly recurring window in which a VA accepts interviews (UTC).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityWindow {
    /// 0 = Sunday .. 6 = Saturday.
    pub day_of_week: u8,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// An existing interview occupying a VA's calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookedInterview {
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i64,
}

/// A stored interview record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interview {
    pub id: String,
    pub client_id: String,
    pub va_id: String,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i64,
    pub status: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Insert payload for a new interview.
#[derive(Debug, Clone, Serialize)]
pub struct NewInterview {
    pub client_id: String,
    pub va_id: String,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i64,
    pub notes: Option<String>,
}

/// Query parameters for listing open slots.
#[derive(Debug, Deserialize, Validate)]
pub struct SlotParams {
    /// First day to consider (default: today).
    pub from: Option<NaiveDate>,
    /// Number of days to expand (default: 7, max: 31).
    #[validate(range(min = 1, max = 31))]
    pub days: Option<u32>,
}

/// DTO for booking an interview.
#[derive(Debug, Deserialize, Validate)]
pub struct BookInterviewRequest {
    #[validate(length(min = 1, max = 64))]
    pub va_id: String,
    pub scheduled_at: DateTime<Utc>,
    #[validate(length(max = 1000, message = "Notes must be at most 1000 characters"))]
    pub notes: Option<String>,
}
