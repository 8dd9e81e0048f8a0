// src/assessment/driver.rs

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use tokio::sync::Mutex;

use super::runner::{
    AssessmentRunner, Phase, RunnerView, StartTicket, SubmitTicket, SubmitTrigger, TickOutcome,
};
use crate::{
    error::AppError,
    models::assessment::{AssessmentResults, Question},
    notify::{Notification, Notifier},
    remote::AssessmentBackend,
};

/// Told when a scoring call of this assessment comes back passed.
#[async_trait]
pub trait PassListener: Send + Sync {
    async fn assessment_passed(&self, results: &AssessmentResults);
}

/// Async driver of one `AssessmentRunner`.
///
/// Performs the remote calls between the runner's synchronous transitions and
/// owns the countdown task. The runner lock is never held across a remote
/// call, so a tick and a user action race only on the phase check.
#[derive(Clone)]
pub struct ActiveAssessment {
    runner: Arc<Mutex<AssessmentRunner>>,
    backend: Arc<dyn AssessmentBackend>,
    notifier: Arc<dyn Notifier>,
    pass_listener: Option<Arc<dyn PassListener>>,
    tick_period: Duration,
}

impl ActiveAssessment {
    pub fn new(
        va_id: &str,
        skill_id: &str,
        backend: Arc<dyn AssessmentBackend>,
        notifier: Arc<dyn Notifier>,
        tick_period: Duration,
    ) -> Self {
        Self {
            runner: Arc::new(Mutex::new(AssessmentRunner::new(va_id, skill_id))),
            backend,
            notifier,
            pass_listener: None,
            tick_period,
        }
    }

    pub fn with_pass_listener(mut self, listener: Arc<dyn PassListener>) -> Self {
        self.pass_listener = Some(listener);
        self
    }

    /// Creates the runner and performs the initial load.
    pub async fn open(
        va_id: &str,
        skill_id: &str,
        backend: Arc<dyn AssessmentBackend>,
        notifier: Arc<dyn Notifier>,
        tick_period: Duration,
    ) -> Self {
        let assessment = Self::new(va_id, skill_id, backend, notifier, tick_period);
        assessment.load().await;
        assessment
    }

    /// Fetches eligibility and config; always ends in `intro`.
    pub async fn load(&self) {
        let (generation, va_id, skill_id) = {
            let mut runner = self.runner.lock().await;
            let generation = runner.begin_load();
            (generation, runner.va_id().to_string(), runner.skill_id().to_string())
        };

        let outcome = tokio::try_join!(
            self.backend.check_eligibility(&va_id, &skill_id),
            async {
                self.backend
                    .fetch_config(&skill_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Assessment not found".to_string()))
            }
        );

        if let Err(e) = &outcome {
            tracing::warn!("Loading assessment {} for {} failed: {:?}", skill_id, va_id, e);
        }

        self.runner.lock().await.finish_load(generation, outcome);
    }

    /// Starts an attempt. Remote failures end in `intro` with an error shown;
    /// only a rejected transition is returned as `Err`.
    pub async fn start(&self) -> Result<(), AppError> {
        let ticket = self.runner.lock().await.begin_start()?;

        let outcome = self.prepare_attempt(&ticket).await;
        match &outcome {
            Ok((attempt_id, questions)) => tracing::info!(
                "Attempt {} started: va {} skill {} ({} questions)",
                attempt_id,
                ticket.va_id,
                ticket.skill_id,
                questions.len()
            ),
            Err(e) => tracing::warn!(
                "Starting assessment {} for {} failed: {:?}",
                ticket.skill_id,
                ticket.va_id,
                e
            ),
        }

        let armed = self
            .runner
            .lock()
            .await
            .finish_start(ticket.generation, outcome);
        if let Some(generation) = armed {
            self.arm_timer(generation);
        }
        Ok(())
    }

    async fn prepare_attempt(
        &self,
        ticket: &StartTicket,
    ) -> Result<(String, Vec<Question>), AppError> {
        let mut questions = self
            .backend
            .fetch_questions(&ticket.skill_id, &ticket.va_id)
            .await?;

        if questions.is_empty() {
            return Err(AppError::NotFound(
                "No questions available for this assessment".to_string(),
            ));
        }

        questions.shuffle(&mut rand::thread_rng());
        if ticket.questions_per_test > 0 {
            questions.truncate(ticket.questions_per_test);
        }

        let question_ids: Vec<String> = questions.iter().map(|q| q.id.clone()).collect();
        let attempt_id = self
            .backend
            .create_attempt(&ticket.va_id, &ticket.skill_id, &question_ids)
            .await?;

        Ok((attempt_id, questions))
    }

    pub async fn select_answer(&self, option_index: usize) -> Result<(), AppError> {
        self.runner.lock().await.select_answer(option_index)
    }

    pub async fn go_next(&self) -> Result<usize, AppError> {
        self.runner.lock().await.go_next()
    }

    pub async fn go_prev(&self) -> Result<usize, AppError> {
        self.runner.lock().await.go_prev()
    }

    pub async fn go_to_question(&self, index: usize) -> Result<usize, AppError> {
        self.runner.lock().await.go_to_question(index)
    }

    /// Submits the attempt unless a submission already claimed it.
    pub async fn submit(&self, trigger: SubmitTrigger) -> Result<(), AppError> {
        let ticket = self.runner.lock().await.begin_submit(trigger)?;
        match ticket {
            Some(ticket) => self.complete_submit(ticket).await,
            None => tracing::debug!("Submission already claimed, ignoring {:?}", trigger),
        }
        Ok(())
    }

    async fn complete_submit(&self, ticket: SubmitTicket) {
        tracing::info!(
            "Submitting attempt {} ({:?}, {} answers)",
            ticket.attempt_id,
            ticket.trigger,
            ticket.answers.len()
        );

        let outcome = self
            .backend
            .submit_answers(&ticket.attempt_id, &ticket.answers)
            .await;

        let notification = match &outcome {
            Ok(results) => {
                tracing::info!(
                    "Attempt {} scored {} (passed: {})",
                    ticket.attempt_id,
                    results.score,
                    results.passed
                );
                Some(results.clone())
            }
            Err(e) => {
                tracing::warn!("Scoring attempt {} failed: {:?}", ticket.attempt_id, e);
                None
            }
        };

        // The backend has recorded the pass even if the runner moved on, so the
        // listener runs before the results become visible.
        if let (Ok(results), Some(listener)) = (&outcome, &self.pass_listener) {
            if results.passed {
                listener.assessment_passed(results).await;
            }
        }

        let (rearm, applied, va_id, skill_name) = {
            let mut runner = self.runner.lock().await;
            let rearm = runner.finish_submit(ticket.generation, outcome);
            // Results of an abandoned attempt are dropped, not announced.
            let applied =
                runner.generation() == ticket.generation && runner.phase() == Phase::Results;
            let skill_name = runner
                .config()
                .map(|c| c.skill_name.clone())
                .unwrap_or_default();
            (rearm, applied, runner.va_id().to_string(), skill_name)
        };

        if let Some(AssessmentResults { score, passed, .. }) = notification.filter(|_| applied) {
            self.notifier.notify(Notification::AssessmentCompleted {
                va_id,
                skill_name,
                score,
                passed,
            });
        }

        if let Some(generation) = rearm {
            self.arm_timer(generation);
        }
    }

    /// Spawns the countdown for one quiz entry.
    ///
    /// The task exits as soon as the runner moves to another generation or
    /// phase, and submits exactly once when the counter reaches zero.
    fn arm_timer(&self, generation: u64) {
        let this = self.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(this.tick_period);
            // The first tick completes immediately.
            interval.tick().await;

            loop {
                interval.tick().await;

                let outcome = this.runner.lock().await.tick(generation);
                match outcome {
                    TickOutcome::Running(_) => continue,
                    TickOutcome::Stopped => return,
                    TickOutcome::Expired(ticket) => {
                        tracing::info!("Time is up for attempt {}", ticket.attempt_id);
                        this.complete_submit(ticket).await;
                        return;
                    }
                }
            }
        });
    }

    /// Navigation away. In-flight calls complete but their outcome is dropped.
    pub async fn abandon(&self) {
        self.runner.lock().await.abandon();
    }

    pub async fn view(&self) -> RunnerView {
        self.runner.lock().await.view()
    }
}
