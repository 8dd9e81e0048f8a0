// src/remote/mod.rs

//! Ports to the managed backend.
//!
//! Everything persistent (question pools, attempts, scoring, eligibility,
//! profiles, interviews) lives behind these traits.

pub mod memory;
pub mod normalize;
pub mod rest;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    models::{
        assessment::{AnswerRecord, AssessmentConfig, AssessmentResults, Eligibility, Question},
        interview::{AvailabilityWindow, BookedInterview, Interview, NewInterview},
        profile::Profile,
    },
};

pub use memory::InMemoryBackend;
pub use rest::RestBackend;

#[async_trait]
pub trait AssessmentBackend: Send + Sync {
    async fn check_eligibility(&self, va_id: &str, skill_id: &str)
    -> Result<Eligibility, AppError>;

    /// `None` when the skill has no assessment configured.
    async fn fetch_config(&self, skill_id: &str) -> Result<Option<AssessmentConfig>, AppError>;

    /// Server-selected question set for one attempt.
    async fn fetch_questions(&self, skill_id: &str, va_id: &str)
    -> Result<Vec<Question>, AppError>;

    /// Creates the attempt record and returns its id.
    async fn create_attempt(
        &self,
        va_id: &str,
        skill_id: &str,
        question_ids: &[String],
    ) -> Result<String, AppError>;

    async fn submit_answers(
        &self,
        attempt_id: &str,
        answers: &[AnswerRecord],
    ) -> Result<AssessmentResults, AppError>;
}

#[async_trait]
pub trait ProfileBackend: Send + Sync {
    async fn fetch_profile(&self, user_id: &str) -> Result<Option<Profile>, AppError>;
}

#[async_trait]
pub trait InterviewBackend: Send + Sync {
    async fn fetch_availability(&self, va_id: &str) -> Result<Vec<AvailabilityWindow>, AppError>;

    /// Non-cancelled interviews starting in `[from, to)`.
    async fn fetch_bookings(
        &self,
        va_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<BookedInterview>, AppError>;

    async fn book_interview(&self, booking: &NewInterview) -> Result<Interview, AppError>;
}
