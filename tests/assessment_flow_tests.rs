// tests/assessment_flow_tests.rs
//
// Drives `ActiveAssessment` against the in-memory backend with tokio's paused
// clock, so countdown behaviour runs instantly and deterministically.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use hirehub::{
    assessment::{ActiveAssessment, PassListener, Phase, SubmitTrigger},
    error::{AppError, GENERIC_FAILURE_MESSAGE},
    models::assessment::{AssessmentConfig, AssessmentResults, Question, UNANSWERED},
    notify::{Notification, Notifier},
    remote::{InMemoryBackend, memory::FailPoint},
};

const TICK: Duration = Duration::from_secs(1);

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.sent.lock().unwrap().push(notification);
    }
}

#[derive(Default)]
struct RecordingListener {
    passes: Mutex<Vec<u32>>,
}

#[async_trait::async_trait]
impl PassListener for RecordingListener {
    async fn assessment_passed(&self, results: &AssessmentResults) {
        self.passes.lock().unwrap().push(results.score);
    }
}

fn question(id: &str) -> Question {
    Question {
        id: id.to_string(),
        prompt: format!("Question {}", id),
        options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
        difficulty: None,
        category: Some("formulas".into()),
    }
}

/// Three questions, one minute.
fn backend(passing_score: u32) -> InMemoryBackend {
    InMemoryBackend::new().with_assessment(
        AssessmentConfig {
            skill_id: "excel".into(),
            skill_name: "Excel".into(),
            questions_per_test: 3,
            time_limit_minutes: 1,
            passing_score,
        },
        vec![(question("q1"), 0), (question("q2"), 1), (question("q3"), 2)],
    )
}

struct Harness {
    backend: Arc<InMemoryBackend>,
    notifier: Arc<RecordingNotifier>,
    assessment: ActiveAssessment,
}

async fn open(backend: InMemoryBackend) -> Harness {
    let backend = Arc::new(backend);
    let notifier = Arc::new(RecordingNotifier::default());
    let assessment = ActiveAssessment::open(
        "va-1",
        "excel",
        backend.clone(),
        notifier.clone(),
        TICK,
    )
    .await;

    Harness {
        backend,
        notifier,
        assessment,
    }
}

async fn started(backend: InMemoryBackend) -> Harness {
    let harness = open(backend).await;
    harness.assessment.start().await.unwrap();
    assert_eq!(harness.assessment.view().await.phase, Phase::Quiz);
    harness
}

async fn current_question_id(assessment: &ActiveAssessment) -> String {
    assessment.view().await.question.unwrap().question_id
}

#[tokio::test(start_paused = true)]
async fn countdown_expiry_submits_without_user_input() {
    let harness = started(backend(70)).await;

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(harness.assessment.view().await.phase, Phase::Quiz);

    tokio::time::sleep(Duration::from_secs(31)).await;

    let view = harness.assessment.view().await;
    assert_eq!(view.phase, Phase::Results);
    assert_eq!(harness.backend.submit_calls(), 1);
    assert_eq!(view.results.unwrap().score, 0);
}

#[tokio::test(start_paused = true)]
async fn countdown_decrements_once_per_tick() {
    let harness = started(backend(70)).await;
    assert_eq!(harness.assessment.view().await.seconds_remaining, Some(60));

    tokio::time::sleep(Duration::from_millis(10_500)).await;

    assert_eq!(harness.assessment.view().await.seconds_remaining, Some(50));
}

async fn mixed_answers_then_expire(passing_score: u32) -> Harness {
    let harness = started(backend(passing_score)).await;
    let assessment = &harness.assessment;

    // First on screen: right
    let first = current_question_id(assessment).await;
    let correct = harness.backend.correct_index(&first).await.unwrap();
    assessment.select_answer(correct).await.unwrap();

    // Second: wrong
    assessment.go_next().await.unwrap();
    let second = current_question_id(assessment).await;
    let correct = harness.backend.correct_index(&second).await.unwrap();
    assessment.select_answer((correct + 1) % 4).await.unwrap();

    // Third: left unanswered
    assessment.go_next().await.unwrap();

    tokio::time::sleep(Duration::from_secs(61)).await;
    harness
}

#[tokio::test(start_paused = true)]
async fn expiry_with_mixed_answers_fails_below_passing_score() {
    let harness = mixed_answers_then_expire(70).await;

    let submissions = harness.backend.submissions().await;
    assert_eq!(submissions.len(), 1);
    let payload = &submissions[0];
    assert_eq!(payload.len(), 3);
    assert_eq!(
        payload
            .iter()
            .filter(|a| a.selected_option_index == UNANSWERED)
            .count(),
        1
    );

    let results = harness.assessment.view().await.results.unwrap();
    assert_eq!(results.correct_count, 1);
    assert_eq!(results.total_questions, 3);
    assert_eq!(results.score, 33);
    assert!(!results.passed);
}

#[tokio::test(start_paused = true)]
async fn expiry_with_mixed_answers_passes_at_low_threshold() {
    let harness = mixed_answers_then_expire(30).await;

    let results = harness.assessment.view().await.results.unwrap();
    assert_eq!(results.score, 33);
    assert!(results.passed);

    let sent = harness.notifier.sent.lock().unwrap().clone();
    assert_eq!(
        sent,
        vec![Notification::AssessmentCompleted {
            va_id: "va-1".into(),
            skill_name: "Excel".into(),
            score: 33,
            passed: true,
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn user_and_timer_race_submits_once() {
    let harness = started(backend(70).with_submit_delay(Duration::from_secs(5))).await;
    harness.assessment.go_to_question(2).await.unwrap();

    // Half a second before expiry, with the scoring call slow enough to be
    // in flight when the countdown would hit zero.
    tokio::time::sleep(Duration::from_millis(59_500)).await;

    let (a, b) = tokio::join!(
        harness.assessment.submit(SubmitTrigger::UserConfirmed),
        harness.assessment.submit(SubmitTrigger::UserConfirmed),
    );
    assert!(a.is_ok());
    assert!(b.is_ok());

    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(harness.backend.submit_calls(), 1);
    assert_eq!(harness.assessment.view().await.phase, Phase::Results);
    assert_eq!(harness.notifier.sent.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn user_submit_after_expiry_is_ignored() {
    let harness = started(backend(70).with_submit_delay(Duration::from_secs(5))).await;
    harness.assessment.go_to_question(2).await.unwrap();

    // Expiry has claimed the submission and the call is in flight.
    tokio::time::sleep(Duration::from_millis(60_500)).await;
    assert_eq!(harness.assessment.view().await.phase, Phase::Submitting);

    harness
        .assessment
        .submit(SubmitTrigger::UserConfirmed)
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(harness.backend.submit_calls(), 1);
    assert_eq!(harness.assessment.view().await.phase, Phase::Results);
}

#[tokio::test(start_paused = true)]
async fn failed_question_fetch_leaves_no_stale_attempt() {
    let harness = open(backend(70)).await;
    harness.backend.fail_next(FailPoint::Questions, 1).await;

    harness.assessment.start().await.unwrap();

    let view = harness.assessment.view().await;
    assert_eq!(view.phase, Phase::Intro);
    assert_eq!(view.error.as_deref(), Some(GENERIC_FAILURE_MESSAGE));
    assert!(view.question.is_none());
    assert!(view.seconds_remaining.is_none());

    let result = harness.assessment.submit(SubmitTrigger::UserConfirmed).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    // Retrying works and clears the error.
    harness.assessment.start().await.unwrap();
    let view = harness.assessment.view().await;
    assert_eq!(view.phase, Phase::Quiz);
    assert!(view.error.is_none());
}

#[tokio::test(start_paused = true)]
async fn failed_attempt_creation_leaves_no_stale_attempt() {
    let harness = open(backend(70)).await;
    harness.backend.fail_next(FailPoint::CreateAttempt, 1).await;

    harness.assessment.start().await.unwrap();

    let view = harness.assessment.view().await;
    assert_eq!(view.phase, Phase::Intro);
    assert!(view.question.is_none());

    // No countdown is running for the failed start.
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(harness.backend.submit_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn failed_submit_returns_to_quiz_and_countdown_resumes() {
    let harness = started(backend(70)).await;
    harness.backend.fail_next(FailPoint::Submit, 1).await;
    harness.assessment.go_to_question(2).await.unwrap();

    tokio::time::sleep(Duration::from_millis(10_500)).await;
    harness
        .assessment
        .submit(SubmitTrigger::UserConfirmed)
        .await
        .unwrap();

    let view = harness.assessment.view().await;
    assert_eq!(view.phase, Phase::Quiz);
    assert_eq!(view.error.as_deref(), Some(GENERIC_FAILURE_MESSAGE));
    assert_eq!(view.seconds_remaining, Some(50));
    assert_eq!(view.question.unwrap().index, 2);

    tokio::time::sleep(Duration::from_millis(5_200)).await;
    assert_eq!(harness.assessment.view().await.seconds_remaining, Some(45));

    // The resumed countdown still expires and submits.
    tokio::time::sleep(Duration::from_secs(50)).await;
    assert_eq!(harness.assessment.view().await.phase, Phase::Results);
    assert_eq!(harness.backend.submit_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_expiry_submit_freezes_at_zero() {
    let harness = started(backend(70)).await;
    harness.backend.fail_next(FailPoint::Submit, 1).await;

    tokio::time::sleep(Duration::from_secs(61)).await;

    let view = harness.assessment.view().await;
    assert_eq!(view.phase, Phase::Quiz);
    assert_eq!(view.seconds_remaining, Some(0));
    assert_eq!(harness.backend.submit_calls(), 1);

    // Nothing retries on its own.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(harness.backend.submit_calls(), 1);

    harness.assessment.go_to_question(2).await.unwrap();
    harness
        .assessment
        .submit(SubmitTrigger::UserConfirmed)
        .await
        .unwrap();
    assert_eq!(harness.assessment.view().await.phase, Phase::Results);
    assert_eq!(harness.backend.submit_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn abandoning_drops_in_flight_results() {
    let harness = started(backend(70).with_submit_delay(Duration::from_secs(5))).await;
    harness.assessment.go_to_question(2).await.unwrap();

    let submitting = harness.assessment.clone();
    let pending = tokio::spawn(async move {
        submitting.submit(SubmitTrigger::UserConfirmed).await
    });

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(harness.assessment.view().await.phase, Phase::Submitting);

    harness.assessment.abandon().await;
    pending.await.unwrap().unwrap();

    let view = harness.assessment.view().await;
    assert_eq!(view.phase, Phase::Intro);
    assert!(view.results.is_none());
    assert!(harness.notifier.sent.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn failed_attempt_is_on_cooldown() {
    let harness = started(backend(70)).await;
    harness.assessment.go_to_question(2).await.unwrap();
    harness
        .assessment
        .submit(SubmitTrigger::UserConfirmed)
        .await
        .unwrap();
    assert!(!harness.assessment.view().await.results.unwrap().passed);

    harness.assessment.load().await;

    let view = harness.assessment.view().await;
    let eligibility = view.eligibility.unwrap();
    assert!(!eligibility.can_take);
    assert!(eligibility.reason.unwrap().starts_with("You can retake"));

    let result = harness.assessment.start().await;
    assert!(matches!(result, Err(AppError::Ineligible(_))));
}

#[tokio::test(start_paused = true)]
async fn timer_triggered_pass_reaches_listener() {
    let backend = Arc::new(backend(30));
    let listener = Arc::new(RecordingListener::default());
    let assessment = ActiveAssessment::new(
        "va-1",
        "excel",
        backend.clone(),
        Arc::new(RecordingNotifier::default()),
        TICK,
    )
    .with_pass_listener(listener.clone());
    assessment.load().await;
    assessment.start().await.unwrap();

    let first = current_question_id(&assessment).await;
    let correct = backend.correct_index(&first).await.unwrap();
    assessment.select_answer(correct).await.unwrap();

    tokio::time::sleep(Duration::from_secs(61)).await;

    assert_eq!(assessment.view().await.phase, Phase::Results);
    assert_eq!(*listener.passes.lock().unwrap(), vec![33]);
}

#[tokio::test(start_paused = true)]
async fn failed_attempt_does_not_reach_listener() {
    let backend = Arc::new(backend(70));
    let listener = Arc::new(RecordingListener::default());
    let assessment = ActiveAssessment::new(
        "va-1",
        "excel",
        backend.clone(),
        Arc::new(RecordingNotifier::default()),
        TICK,
    )
    .with_pass_listener(listener.clone());
    assessment.load().await;
    assessment.start().await.unwrap();

    tokio::time::sleep(Duration::from_secs(61)).await;

    assert_eq!(assessment.view().await.phase, Phase::Results);
    assert!(listener.passes.lock().unwrap().is_empty());
}
