// src/notify.rs

//! Best-effort notification port.
//!
//! `notify` returns immediately. Delivery is at-most-once with no retry and no
//! acknowledgement; callers must not assume the message arrived.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use url::Url;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    AssessmentCompleted {
        va_id: String,
        skill_name: String,
        score: u32,
        passed: bool,
    },
    InterviewBooked {
        interview_id: String,
        client_id: String,
        va_id: String,
        scheduled_at: DateTime<Utc>,
    },
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Drops every notification.
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, notification: Notification) {
        tracing::debug!("Notification dropped: {:?}", notification);
    }
}

/// Posts each notification once to an e-mail function endpoint.
pub struct HttpNotifier {
    client: reqwest::Client,
    url: Url,
    service_key: String,
}

impl HttpNotifier {
    pub fn new(client: reqwest::Client, url: Url, service_key: String) -> Self {
        Self {
            client,
            url,
            service_key,
        }
    }
}

impl HttpNotifier {
    /// Spawns the single delivery attempt. The handle resolves to whether the
    /// endpoint accepted the notification.
    fn dispatch(&self, notification: Notification) -> JoinHandle<bool> {
        let request = self
            .client
            .post(self.url.clone())
            .bearer_auth(&self.service_key)
            .json(&notification);

        tokio::spawn(async move {
            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    tracing::debug!("Notification delivered: {:?}", notification);
                    true
                }
                Ok(response) => {
                    tracing::warn!(
                        "Notification rejected with {}: {:?}",
                        response.status(),
                        notification
                    );
                    false
                }
                Err(e) => {
                    tracing::warn!("Notification not sent: {:?}", e);
                    false
                }
            }
        })
    }
}

impl Notifier for HttpNotifier {
    /// Must be called from within a tokio runtime.
    fn notify(&self, notification: Notification) {
        drop(self.dispatch(notification));
    }
}
