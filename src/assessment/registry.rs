// src/assessment/registry.rs

use std::collections::HashMap;

use tokio::sync::RwLock;

use super::driver::ActiveAssessment;

/// Live assessments keyed by (user id, skill id).
///
/// An entry exists while the user has the assessment page open; removing it
/// is the equivalent of navigating away.
#[derive(Default)]
pub struct AssessmentRegistry {
    entries: RwLock<HashMap<(String, String), ActiveAssessment>>,
}

impl AssessmentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, user_id: &str, skill_id: &str) -> Option<ActiveAssessment> {
        self.entries
            .read()
            .await
            .get(&(user_id.to_string(), skill_id.to_string()))
            .cloned()
    }

    /// Inserts `assessment` unless another one was opened meanwhile; returns the live entry.
    pub async fn insert_if_absent(
        &self,
        user_id: &str,
        skill_id: &str,
        assessment: ActiveAssessment,
    ) -> ActiveAssessment {
        self.entries
            .write()
            .await
            .entry((user_id.to_string(), skill_id.to_string()))
            .or_insert(assessment)
            .clone()
    }

    /// Removes and abandons one assessment. Returns whether it existed.
    pub async fn remove(&self, user_id: &str, skill_id: &str) -> bool {
        let removed = self
            .entries
            .write()
            .await
            .remove(&(user_id.to_string(), skill_id.to_string()));

        match removed {
            Some(assessment) => {
                assessment.abandon().await;
                true
            }
            None => false,
        }
    }

    /// Removes and abandons every assessment of a user (sign-out).
    pub async fn remove_user(&self, user_id: &str) -> usize {
        let removed: Vec<ActiveAssessment> = {
            let mut entries = self.entries.write().await;
            let keys: Vec<(String, String)> = entries
                .keys()
                .filter(|(owner, _)| owner == user_id)
                .cloned()
                .collect();
            keys.iter().filter_map(|k| entries.remove(k)).collect()
        };

        for assessment in &removed {
            assessment.abandon().await;
        }
        removed.len()
    }
}
