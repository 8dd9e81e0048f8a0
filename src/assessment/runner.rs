// src/assessment/runner.rs

//! Client-side state machine of a timed skill assessment.
//!
//! `loading -> intro -> (loading) -> quiz -> submitting -> results`, with
//! `submitting -> quiz` on a scoring failure. `intro` doubles as the error
//! screen. The runner performs no I/O: async work is split into a `begin_*`
//! call that returns a ticket and a `finish_*` call that applies the outcome.
//! Each ticket carries the generation it was issued under and outcomes from an
//! older generation are dropped.

use std::collections::HashMap;

use serde::Serialize;

use crate::{
    error::AppError,
    models::assessment::{
        AnswerRecord, AssessmentConfig, AssessmentResults, Eligibility, Question, UNANSWERED,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Loading,
    Intro,
    Quiz,
    Submitting,
    Results,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitTrigger {
    UserConfirmed,
    TimerExpired,
}

/// Work order for starting an attempt.
#[derive(Debug, Clone)]
pub struct StartTicket {
    pub generation: u64,
    pub va_id: String,
    pub skill_id: String,
    pub questions_per_test: usize,
}

/// Work order for the single scoring call of an attempt.
#[derive(Debug, Clone)]
pub struct SubmitTicket {
    pub generation: u64,
    pub attempt_id: String,
    pub answers: Vec<AnswerRecord>,
    pub trigger: SubmitTrigger,
}

#[derive(Debug)]
pub enum TickOutcome {
    /// Seconds left after this tick.
    Running(u32),
    /// The countdown hit zero and the submission was claimed.
    Expired(SubmitTicket),
    /// Nothing to count down for this generation; the ticker should exit.
    Stopped,
}

/// Local, ephemeral state of one attempt.
#[derive(Debug, Clone)]
pub struct AttemptSession {
    pub attempt_id: String,
    pub questions: Vec<Question>,
    /// Question id -> selected option index.
    pub answers: HashMap<String, usize>,
    pub current_index: usize,
    pub seconds_remaining: u32,
}

impl AttemptSession {
    fn current_question(&self) -> &Question {
        &self.questions[self.current_index]
    }

    fn last_index(&self) -> usize {
        self.questions.len().saturating_sub(1)
    }

    /// One record per question, in delivery order.
    fn answer_records(&self) -> Vec<AnswerRecord> {
        self.questions
            .iter()
            .map(|q| AnswerRecord {
                question_id: q.id.clone(),
                selected_option_index: self
                    .answers
                    .get(&q.id)
                    .map(|i| *i as i32)
                    .unwrap_or(UNANSWERED),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionView {
    pub index: usize,
    pub total: usize,
    pub question_id: String,
    pub prompt: String,
    pub options: Vec<String>,
    pub difficulty: Option<String>,
    pub category: Option<String>,
    pub selected: Option<usize>,
}

/// Snapshot rendered by the assessment screen.
#[derive(Debug, Clone, Serialize)]
pub struct RunnerView {
    pub skill_id: String,
    pub phase: Phase,
    pub config: Option<AssessmentConfig>,
    pub eligibility: Option<Eligibility>,
    pub error: Option<String>,
    pub question: Option<QuestionView>,
    pub answered_count: usize,
    pub seconds_remaining: Option<u32>,
    pub results: Option<AssessmentResults>,
}

#[derive(Debug)]
pub struct AssessmentRunner {
    va_id: String,
    skill_id: String,
    phase: Phase,
    generation: u64,
    eligibility: Option<Eligibility>,
    config: Option<AssessmentConfig>,
    attempt: Option<AttemptSession>,
    results: Option<AssessmentResults>,
    error: Option<String>,
}

impl AssessmentRunner {
    pub fn new(va_id: impl Into<String>, skill_id: impl Into<String>) -> Self {
        Self {
            va_id: va_id.into(),
            skill_id: skill_id.into(),
            phase: Phase::Loading,
            generation: 0,
            eligibility: None,
            config: None,
            attempt: None,
            results: None,
            error: None,
        }
    }

    pub fn va_id(&self) -> &str {
        &self.va_id
    }

    pub fn skill_id(&self) -> &str {
        &self.skill_id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn config(&self) -> Option<&AssessmentConfig> {
        self.config.as_ref()
    }

    pub fn attempt(&self) -> Option<&AttemptSession> {
        self.attempt.as_ref()
    }

    pub fn results(&self) -> Option<&AssessmentResults> {
        self.results.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    // ---------------------------------------------------------------------
    // loading -> intro
    // ---------------------------------------------------------------------

    pub fn begin_load(&mut self) -> u64 {
        self.generation += 1;
        self.phase = Phase::Loading;
        self.error = None;
        self.generation
    }

    pub fn finish_load(
        &mut self,
        generation: u64,
        outcome: Result<(Eligibility, AssessmentConfig), AppError>,
    ) {
        if generation != self.generation || self.phase != Phase::Loading {
            return;
        }

        self.phase = Phase::Intro;
        match outcome {
            Ok((eligibility, config)) => {
                self.eligibility = Some(eligibility);
                self.config = Some(config);
            }
            Err(e) => {
                self.error = Some(e.user_message());
            }
        }
    }

    // ---------------------------------------------------------------------
    // intro -> loading -> quiz
    // ---------------------------------------------------------------------

    pub fn begin_start(&mut self) -> Result<StartTicket, AppError> {
        if self.phase != Phase::Intro {
            return Err(AppError::Conflict(
                "The assessment can only be started from the intro screen".to_string(),
            ));
        }

        let questions_per_test = self
            .config
            .as_ref()
            .map(|c| c.questions_per_test as usize)
            .ok_or_else(|| AppError::NotFound("Assessment not found".to_string()))?;

        match &self.eligibility {
            Some(e) if e.can_take => {}
            Some(e) => {
                return Err(AppError::Ineligible(e.reason.clone().unwrap_or_else(|| {
                    "You are not eligible to take this assessment".to_string()
                })));
            }
            None => {
                return Err(AppError::Ineligible(
                    "Eligibility could not be verified".to_string(),
                ));
            }
        }

        self.generation += 1;
        self.phase = Phase::Loading;
        self.attempt = None;
        self.results = None;
        self.error = None;

        Ok(StartTicket {
            generation: self.generation,
            va_id: self.va_id.clone(),
            skill_id: self.skill_id.clone(),
            questions_per_test,
        })
    }

    /// Applies the start outcome. Returns the generation to arm the countdown for.
    pub fn finish_start(
        &mut self,
        generation: u64,
        outcome: Result<(String, Vec<Question>), AppError>,
    ) -> Option<u64> {
        if generation != self.generation || self.phase != Phase::Loading {
            return None;
        }

        match outcome {
            Ok((attempt_id, questions)) if !questions.is_empty() => {
                let seconds_remaining = self
                    .config
                    .as_ref()
                    .map(AssessmentConfig::time_limit_seconds)
                    .unwrap_or(0);

                self.attempt = Some(AttemptSession {
                    attempt_id,
                    questions,
                    answers: HashMap::new(),
                    current_index: 0,
                    seconds_remaining,
                });
                self.phase = Phase::Quiz;
                Some(self.generation)
            }
            Ok(_) => {
                self.phase = Phase::Intro;
                self.error = Some("No questions available for this assessment".to_string());
                None
            }
            Err(e) => {
                self.phase = Phase::Intro;
                self.error = Some(e.user_message());
                None
            }
        }
    }

    // ---------------------------------------------------------------------
    // quiz
    // ---------------------------------------------------------------------

    fn quiz_attempt_mut(&mut self) -> Result<&mut AttemptSession, AppError> {
        if self.phase != Phase::Quiz {
            return Err(AppError::Conflict("No question is on screen".to_string()));
        }
        self.attempt
            .as_mut()
            .ok_or_else(|| AppError::Conflict("No question is on screen".to_string()))
    }

    /// Records or overwrites the answer to the current question.
    pub fn select_answer(&mut self, option_index: usize) -> Result<(), AppError> {
        let attempt = self.quiz_attempt_mut()?;
        let question = attempt.current_question();

        if option_index >= question.options.len() {
            return Err(AppError::BadRequest(format!(
                "Option {} does not exist for this question",
                option_index
            )));
        }

        let question_id = question.id.clone();
        attempt.answers.insert(question_id, option_index);
        Ok(())
    }

    pub fn go_next(&mut self) -> Result<usize, AppError> {
        let attempt = self.quiz_attempt_mut()?;
        attempt.current_index = (attempt.current_index + 1).min(attempt.last_index());
        Ok(attempt.current_index)
    }

    pub fn go_prev(&mut self) -> Result<usize, AppError> {
        let attempt = self.quiz_attempt_mut()?;
        attempt.current_index = attempt.current_index.saturating_sub(1);
        Ok(attempt.current_index)
    }

    /// Jumps to `index`, clamped to the last question.
    pub fn go_to_question(&mut self, index: usize) -> Result<usize, AppError> {
        let attempt = self.quiz_attempt_mut()?;
        attempt.current_index = index.min(attempt.last_index());
        Ok(attempt.current_index)
    }

    // ---------------------------------------------------------------------
    // quiz -> submitting
    // ---------------------------------------------------------------------

    /// Claims the single submission of the current quiz entry.
    ///
    /// Returns `Ok(None)` when a submission is already in flight or finished.
    /// A user-confirmed submission is only accepted on the last question.
    pub fn begin_submit(
        &mut self,
        trigger: SubmitTrigger,
    ) -> Result<Option<SubmitTicket>, AppError> {
        match self.phase {
            Phase::Submitting | Phase::Results => return Ok(None),
            Phase::Quiz => {}
            Phase::Loading | Phase::Intro => {
                return Err(AppError::Conflict(
                    "No assessment is in progress".to_string(),
                ));
            }
        }

        let Some(attempt) = self.attempt.as_ref() else {
            return Err(AppError::Conflict(
                "No assessment is in progress".to_string(),
            ));
        };

        if trigger == SubmitTrigger::UserConfirmed && attempt.current_index != attempt.last_index()
        {
            return Err(AppError::BadRequest(
                "Go to the last question to submit".to_string(),
            ));
        }

        let ticket = SubmitTicket {
            generation: self.generation,
            attempt_id: attempt.attempt_id.clone(),
            answers: attempt.answer_records(),
            trigger,
        };

        self.phase = Phase::Submitting;
        self.error = None;
        Ok(Some(ticket))
    }

    /// One countdown step for the ticker armed at `generation`.
    pub fn tick(&mut self, generation: u64) -> TickOutcome {
        if generation != self.generation || self.phase != Phase::Quiz {
            return TickOutcome::Stopped;
        }

        let Some(attempt) = self.attempt.as_mut() else {
            return TickOutcome::Stopped;
        };

        // Frozen at zero after a failed expiry submission.
        if attempt.seconds_remaining == 0 {
            return TickOutcome::Stopped;
        }

        attempt.seconds_remaining -= 1;
        if attempt.seconds_remaining > 0 {
            return TickOutcome::Running(attempt.seconds_remaining);
        }

        match self.begin_submit(SubmitTrigger::TimerExpired) {
            Ok(Some(ticket)) => TickOutcome::Expired(ticket),
            _ => TickOutcome::Stopped,
        }
    }

    // ---------------------------------------------------------------------
    // submitting -> results | quiz
    // ---------------------------------------------------------------------

    /// Applies the scoring outcome. Returns the generation to re-arm the
    /// countdown for when the attempt goes back to the quiz with time left.
    pub fn finish_submit(
        &mut self,
        generation: u64,
        outcome: Result<AssessmentResults, AppError>,
    ) -> Option<u64> {
        if generation != self.generation || self.phase != Phase::Submitting {
            return None;
        }

        match outcome {
            Ok(results) => {
                self.results = Some(results);
                self.attempt = None;
                self.phase = Phase::Results;
                None
            }
            Err(e) => {
                self.phase = Phase::Quiz;
                self.error = Some(e.user_message());
                self.generation += 1;

                let time_left = self
                    .attempt
                    .as_ref()
                    .is_some_and(|a| a.seconds_remaining > 0);
                time_left.then_some(self.generation)
            }
        }
    }

    /// Navigation away: drops the attempt and invalidates pending work.
    pub fn abandon(&mut self) {
        self.generation += 1;
        self.attempt = None;
        if self.phase != Phase::Results {
            self.phase = Phase::Intro;
        }
    }

    pub fn view(&self) -> RunnerView {
        let question = self.attempt.as_ref().map(|a| {
            let q = a.current_question();
            QuestionView {
                index: a.current_index,
                total: a.questions.len(),
                question_id: q.id.clone(),
                prompt: q.prompt.clone(),
                options: q.options.clone(),
                difficulty: q.difficulty.clone(),
                category: q.category.clone(),
                selected: a.answers.get(&q.id).copied(),
            }
        });

        RunnerView {
            skill_id: self.skill_id.clone(),
            phase: self.phase,
            config: self.config.clone(),
            eligibility: self.eligibility.clone(),
            error: self.error.clone(),
            question,
            answered_count: self.attempt.as_ref().map_or(0, |a| a.answers.len()),
            seconds_remaining: self.attempt.as_ref().map(|a| a.seconds_remaining),
            results: self.results.clone(),
        }
    }
}
