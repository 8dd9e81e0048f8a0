// src/assessment/mod.rs

pub mod driver;
pub mod registry;
pub mod runner;

pub use driver::{ActiveAssessment, PassListener};
pub use registry::AssessmentRegistry;
pub use runner::{AssessmentRunner, Phase, RunnerView, SubmitTrigger};
