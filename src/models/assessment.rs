// src/models/assessment.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Sentinel index submitted for a question the user never answered.
pub const UNANSWERED: i32 = -1;

/// Per-skill assessment settings, loaded once per runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentConfig {
    pub skill_id: String,
    pub skill_name: String,
    pub questions_per_test: u32,
    pub time_limit_minutes: u32,
    /// Minimum score (0-100) that counts as a pass.
    pub passing_score: u32,
}

impl AssessmentConfig {
    pub fn time_limit_seconds(&self) -> u32 {
        self.time_limit_minutes.saturating_mul(60)
    }
}

/// A question as delivered to the candidate (no answer key).
///
/// The order of `options` is significant: answers are positional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub prompt: String,
    pub options: Vec<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Result of the remote eligibility check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eligibility {
    pub can_take: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

/// One entry of the submit payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_id: String,
    /// Option index, or `UNANSWERED`.
    pub selected_option_index: i32,
}

/// Remote scoring result. Terminal for the attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentResults {
    pub score: u32,
    pub passed: bool,
    pub correct_count: u32,
    pub total_questions: u32,
}

/// DTO for recording an answer on the current question.
#[derive(Debug, Deserialize, Validate)]
pub struct SelectAnswerRequest {
    #[validate(range(max = 63))]
    pub option_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigateAction {
    Next,
    Prev,
    Goto,
}

/// DTO for moving between questions.
#[derive(Debug, Deserialize)]
pub struct NavigateRequest {
    pub action: NavigateAction,
    /// Target index, required for `goto`.
    pub index: Option<usize>,
}
