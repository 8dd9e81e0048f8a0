use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRef;

use crate::{
    assessment::AssessmentRegistry,
    config::Config,
    notify::Notifier,
    remote::{AssessmentBackend, InterviewBackend, ProfileBackend},
    session::SessionStore,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub assessments: Arc<dyn AssessmentBackend>,
    pub profiles: Arc<dyn ProfileBackend>,
    pub interviews: Arc<dyn InterviewBackend>,
    pub notifier: Arc<dyn Notifier>,
    pub sessions: Arc<SessionStore>,
    pub registry: Arc<AssessmentRegistry>,
}

impl AppState {
    /// Wires every port to the same backend implementation.
    pub fn new<B>(config: Config, backend: Arc<B>, notifier: Arc<dyn Notifier>) -> Self
    where
        B: AssessmentBackend + ProfileBackend + InterviewBackend + 'static,
    {
        Self {
            config,
            assessments: backend.clone(),
            profiles: backend.clone(),
            interviews: backend,
            notifier,
            sessions: Arc::new(SessionStore::new()),
            registry: Arc::new(AssessmentRegistry::new()),
        }
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.config.tick_interval_ms)
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
