// src/remote/memory.rs

//! In-process stand-in for the managed backend.
//!
//! Implements the remote rules the REST client delegates: server-side question
//! selection, scoring, single submission per attempt, pass-once and a retake
//! cooldown after a failed attempt. Test double; the binary always uses
//! `RestBackend`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use tokio::sync::Mutex;

use super::{AssessmentBackend, InterviewBackend, ProfileBackend};
use crate::{
    error::AppError,
    models::{
        assessment::{AnswerRecord, AssessmentConfig, AssessmentResults, Eligibility, Question},
        interview::{AvailabilityWindow, BookedInterview, Interview, NewInterview},
        profile::Profile,
    },
};

/// Remote calls that can be made to fail on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    Eligibility,
    Config,
    Questions,
    CreateAttempt,
    Submit,
}

#[derive(Debug, Clone)]
struct BankQuestion {
    question: Question,
    correct_index: i32,
}

#[derive(Debug, Clone)]
struct AttemptRecord {
    va_id: String,
    skill_id: String,
    question_ids: Vec<String>,
    completed: bool,
}

#[derive(Debug, Clone)]
struct AttemptOutcome {
    va_id: String,
    skill_id: String,
    passed: bool,
    finished_at: DateTime<Utc>,
}

#[derive(Default)]
struct MemoryState {
    configs: HashMap<String, AssessmentConfig>,
    banks: HashMap<String, Vec<BankQuestion>>,
    attempts: HashMap<String, AttemptRecord>,
    outcomes: Vec<AttemptOutcome>,
    profiles: HashMap<String, Profile>,
    availability: HashMap<String, Vec<AvailabilityWindow>>,
    interviews: Vec<Interview>,
    submissions: Vec<Vec<AnswerRecord>>,
    failures: HashMap<FailPoint, usize>,
}

impl MemoryState {
    fn take_failure(&mut self, point: FailPoint) -> Result<(), AppError> {
        match self.failures.get_mut(&point) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Err(AppError::Upstream(format!("injected failure at {:?}", point)))
            }
            _ => Ok(()),
        }
    }
}

/// Calculates the number of correct answers and the percentage score.
///
/// Every question in `answer_key` counts towards the total; a question absent
/// from `user_answers` (or answered with the sentinel) is incorrect.
pub fn calculate_score(
    user_answers: &HashMap<String, i32>,
    answer_key: &HashMap<String, i32>,
) -> (u32, u32) {
    let total_questions = answer_key.len();

    if total_questions == 0 {
        return (0, 0);
    }

    let correct_count = answer_key
        .iter()
        .filter(|(q_id, correct)| user_answers.get(*q_id) == Some(*correct))
        .count();

    let score = (correct_count as f64 / total_questions as f64 * 100.0).round() as u32;
    (correct_count as u32, score)
}

pub struct InMemoryBackend {
    state: Mutex<MemoryState>,
    submit_calls: AtomicUsize,
    cooldown: chrono::Duration,
    submit_delay: Option<Duration>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            submit_calls: AtomicUsize::new(0),
            cooldown: chrono::Duration::hours(24),
            submit_delay: None,
        }
    }

    /// Registers an assessment. Each question is paired with its correct option index.
    pub fn with_assessment(mut self, config: AssessmentConfig, questions: Vec<(Question, usize)>) -> Self {
        let state = self.state.get_mut();
        let bank = questions
            .into_iter()
            .map(|(question, correct)| BankQuestion {
                question,
                correct_index: correct as i32,
            })
            .collect();
        state.banks.insert(config.skill_id.clone(), bank);
        state.configs.insert(config.skill_id.clone(), config);
        self
    }

    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.state.get_mut().profiles.insert(profile.id.clone(), profile);
        self
    }

    pub fn with_availability(mut self, va_id: &str, windows: Vec<AvailabilityWindow>) -> Self {
        self.state
            .get_mut()
            .availability
            .insert(va_id.to_string(), windows);
        self
    }

    pub fn with_cooldown(mut self, cooldown: chrono::Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Delays every scoring call, keeping a submission in flight.
    pub fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = Some(delay);
        self
    }

    /// Makes the next `times` calls at `point` fail with an upstream error.
    pub async fn fail_next(&self, point: FailPoint, times: usize) {
        self.state.lock().await.failures.insert(point, times);
    }

    /// Number of scoring calls received so far, failed ones included.
    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    /// Correct option index for a question, if it exists.
    pub async fn correct_index(&self, question_id: &str) -> Option<usize> {
        let state = self.state.lock().await;
        state
            .banks
            .values()
            .flatten()
            .find(|b| b.question.id == question_id)
            .map(|b| b.correct_index as usize)
    }

    /// Every answer payload received by the scoring call, in arrival order.
    pub async fn submissions(&self) -> Vec<Vec<AnswerRecord>> {
        self.state.lock().await.submissions.clone()
    }

    pub async fn interviews(&self) -> Vec<Interview> {
        self.state.lock().await.interviews.clone()
    }

    async fn set_verified(&self, va_id: &str) {
        let mut state = self.state.lock().await;
        if let Some(va) = state
            .profiles
            .values_mut()
            .filter_map(|p| p.va_profile.as_mut())
            .find(|va| va.id == va_id)
        {
            va.is_verified = true;
        }
    }
}

#[async_trait]
impl AssessmentBackend for InMemoryBackend {
    async fn check_eligibility(
        &self,
        va_id: &str,
        skill_id: &str,
    ) -> Result<Eligibility, AppError> {
        let mut state = self.state.lock().await;
        state.take_failure(FailPoint::Eligibility)?;

        let history: Vec<&AttemptOutcome> = state
            .outcomes
            .iter()
            .filter(|o| o.va_id == va_id && o.skill_id == skill_id)
            .collect();

        if history.iter().any(|o| o.passed) {
            return Ok(Eligibility {
                can_take: false,
                reason: Some("You have already passed this assessment.".to_string()),
            });
        }

        if let Some(last) = history.iter().map(|o| o.finished_at).max() {
            let retry_at = last + self.cooldown;
            if Utc::now() < retry_at {
                return Ok(Eligibility {
                    can_take: false,
                    reason: Some(format!(
                        "You can retake this assessment after {}.",
                        retry_at.format("%Y-%m-%d %H:%M UTC")
                    )),
                });
            }
        }

        Ok(Eligibility {
            can_take: true,
            reason: None,
        })
    }

    async fn fetch_config(&self, skill_id: &str) -> Result<Option<AssessmentConfig>, AppError> {
        let mut state = self.state.lock().await;
        state.take_failure(FailPoint::Config)?;
        Ok(state.configs.get(skill_id).cloned())
    }

    async fn fetch_questions(
        &self,
        skill_id: &str,
        _va_id: &str,
    ) -> Result<Vec<Question>, AppError> {
        let mut state = self.state.lock().await;
        state.take_failure(FailPoint::Questions)?;

        let limit = state
            .configs
            .get(skill_id)
            .map(|c| c.questions_per_test as usize)
            .unwrap_or(0);

        let mut pool: Vec<Question> = state
            .banks
            .get(skill_id)
            .map(|bank| bank.iter().map(|b| b.question.clone()).collect())
            .unwrap_or_default();

        pool.shuffle(&mut rand::thread_rng());
        pool.truncate(limit);
        Ok(pool)
    }

    async fn create_attempt(
        &self,
        va_id: &str,
        skill_id: &str,
        question_ids: &[String],
    ) -> Result<String, AppError> {
        let mut state = self.state.lock().await;
        state.take_failure(FailPoint::CreateAttempt)?;

        let attempt_id = uuid::Uuid::new_v4().to_string();
        state.attempts.insert(
            attempt_id.clone(),
            AttemptRecord {
                va_id: va_id.to_string(),
                skill_id: skill_id.to_string(),
                question_ids: question_ids.to_vec(),
                completed: false,
            },
        );

        tracing::debug!("Created attempt {} for va {} skill {}", attempt_id, va_id, skill_id);
        Ok(attempt_id)
    }

    async fn submit_answers(
        &self,
        attempt_id: &str,
        answers: &[AnswerRecord],
    ) -> Result<AssessmentResults, AppError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.submit_delay {
            tokio::time::sleep(delay).await;
        }

        let (va_id, results) = {
            let mut state = self.state.lock().await;
            state.submissions.push(answers.to_vec());
            state.take_failure(FailPoint::Submit)?;

            let attempt = state
                .attempts
                .get(attempt_id)
                .cloned()
                .ok_or_else(|| AppError::NotFound("Attempt not found".to_string()))?;

            if attempt.completed {
                return Err(AppError::Conflict("Attempt already submitted".to_string()));
            }

            let config = state
                .configs
                .get(&attempt.skill_id)
                .cloned()
                .ok_or_else(|| AppError::NotFound("Assessment not found".to_string()))?;

            let answer_key: HashMap<String, i32> = state
                .banks
                .get(&attempt.skill_id)
                .map(|bank| {
                    bank.iter()
                        .filter(|b| attempt.question_ids.contains(&b.question.id))
                        .map(|b| (b.question.id.clone(), b.correct_index))
                        .collect()
                })
                .unwrap_or_default();

            let user_answers: HashMap<String, i32> = answers
                .iter()
                .map(|a| (a.question_id.clone(), a.selected_option_index))
                .collect();

            let (correct_count, score) = calculate_score(&user_answers, &answer_key);
            let passed = score >= config.passing_score;

            if let Some(record) = state.attempts.get_mut(attempt_id) {
                record.completed = true;
            }
            state.outcomes.push(AttemptOutcome {
                va_id: attempt.va_id.clone(),
                skill_id: attempt.skill_id.clone(),
                passed,
                finished_at: Utc::now(),
            });

            (
                attempt.va_id,
                AssessmentResults {
                    score,
                    passed,
                    correct_count,
                    total_questions: answer_key.len() as u32,
                },
            )
        };

        if results.passed {
            self.set_verified(&va_id).await;
        }

        Ok(results)
    }
}

#[async_trait]
impl ProfileBackend for InMemoryBackend {
    async fn fetch_profile(&self, user_id: &str) -> Result<Option<Profile>, AppError> {
        Ok(self.state.lock().await.profiles.get(user_id).cloned())
    }
}

#[async_trait]
impl InterviewBackend for InMemoryBackend {
    async fn fetch_availability(&self, va_id: &str) -> Result<Vec<AvailabilityWindow>, AppError> {
        Ok(self
            .state
            .lock()
            .await
            .availability
            .get(va_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_bookings(
        &self,
        va_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<BookedInterview>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .interviews
            .iter()
            .filter(|i| i.va_id == va_id && i.status != "cancelled")
            .filter(|i| i.scheduled_at >= from && i.scheduled_at < to)
            .map(|i| BookedInterview {
                scheduled_at: i.scheduled_at,
                duration_minutes: i.duration_minutes,
            })
            .collect())
    }

    async fn book_interview(&self, booking: &NewInterview) -> Result<Interview, AppError> {
        let interview = Interview {
            id: uuid::Uuid::new_v4().to_string(),
            client_id: booking.client_id.clone(),
            va_id: booking.va_id.clone(),
            scheduled_at: booking.scheduled_at,
            duration_minutes: booking.duration_minutes,
            status: "scheduled".to_string(),
            notes: booking.notes.clone(),
        };

        self.state.lock().await.interviews.push(interview.clone());
        Ok(interview)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(pairs: &[(&str, i32)]) -> HashMap<String, i32> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn question(id: &str) -> Question {
        Question {
            id: id.to_string(),
            prompt: format!("Question {}", id),
            options: vec!["A".into(), "B".into(), "C".into()],
            difficulty: None,
            category: None,
        }
    }

    fn backend(passing_score: u32) -> InMemoryBackend {
        InMemoryBackend::new().with_assessment(
            AssessmentConfig {
                skill_id: "excel".into(),
                skill_name: "Excel".into(),
                questions_per_test: 2,
                time_limit_minutes: 5,
                passing_score,
            },
            vec![(question("q1"), 0), (question("q2"), 1)],
        )
    }

    #[test]
    fn test_calculate_score_perfect() {
        let answer_key = key(&[("1", 0), ("2", 1)]);
        let user_answers = key(&[("1", 0), ("2", 1)]);

        let (correct, score) = calculate_score(&user_answers, &answer_key);
        assert_eq!(correct, 2);
        assert_eq!(score, 100);
    }

    #[test]
    fn test_calculate_score_half() {
        let answer_key = key(&[("1", 0), ("2", 1)]);
        let user_answers = key(&[("1", 0), ("2", 2)]); // Wrong

        let (correct, score) = calculate_score(&user_answers, &answer_key);
        assert_eq!(correct, 1);
        assert_eq!(score, 50);
    }

    #[test]
    fn test_calculate_score_unanswered_counts_as_wrong() {
        let answer_key = key(&[("1", 0), ("2", 1), ("3", 2)]);
        let user_answers = key(&[("1", 0), ("2", 0), ("3", -1)]);

        let (correct, score) = calculate_score(&user_answers, &answer_key);
        assert_eq!(correct, 1);
        assert_eq!(score, 33);
    }

    #[test]
    fn test_calculate_score_zero() {
        let (correct, score) = calculate_score(&HashMap::new(), &HashMap::new());
        assert_eq!(correct, 0);
        assert_eq!(score, 0);
    }

    #[tokio::test]
    async fn test_attempt_cannot_be_submitted_twice() {
        let backend = backend(50);
        let ids = vec!["q1".to_string(), "q2".to_string()];
        let attempt = backend.create_attempt("va1", "excel", &ids).await.unwrap();

        let answers = vec![AnswerRecord {
            question_id: "q1".into(),
            selected_option_index: 0,
        }];
        let results = backend.submit_answers(&attempt, &answers).await.unwrap();
        assert_eq!(results.correct_count, 1);
        assert!(results.passed);

        let again = backend.submit_answers(&attempt, &answers).await;
        assert!(matches!(again, Err(AppError::Conflict(_))));
        assert_eq!(backend.submit_calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_attempt_starts_cooldown() {
        let backend = backend(100);
        let ids = vec!["q1".to_string(), "q2".to_string()];
        let attempt = backend.create_attempt("va1", "excel", &ids).await.unwrap();
        backend.submit_answers(&attempt, &[]).await.unwrap();

        let eligibility = backend.check_eligibility("va1", "excel").await.unwrap();
        assert!(!eligibility.can_take);
        assert!(eligibility.reason.unwrap().contains("retake"));

        let other = backend.check_eligibility("va2", "excel").await.unwrap();
        assert!(other.can_take);
    }

    #[tokio::test]
    async fn test_zero_cooldown_allows_retake() {
        let backend = backend(100).with_cooldown(chrono::Duration::zero());
        let ids = vec!["q1".to_string()];
        let attempt = backend.create_attempt("va1", "excel", &ids).await.unwrap();
        backend.submit_answers(&attempt, &[]).await.unwrap();

        let eligibility = backend.check_eligibility("va1", "excel").await.unwrap();
        assert!(eligibility.can_take);
    }

    #[tokio::test]
    async fn test_injected_failure_is_consumed() {
        let backend = backend(50);
        backend.fail_next(FailPoint::Config, 1).await;

        assert!(backend.fetch_config("excel").await.is_err());
        assert!(backend.fetch_config("excel").await.unwrap().is_some());
    }
}
