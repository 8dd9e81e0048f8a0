// src/session.rs

//! Signed-in user state, passed explicitly to every handler.
//!
//! A `Session` is created on first authenticated request (session restore),
//! refreshed when the profile may have changed, and cleared on sign-out.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::{
    assessment::PassListener,
    error::AppError,
    models::{
        assessment::AssessmentResults,
        profile::{Profile, Role, VaProfile},
    },
    remote::ProfileBackend,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub user_id: String,
    pub email: Option<String>,
    pub full_name: String,
    pub role: Role,
    pub va_profile: Option<VaProfile>,
}

impl Session {
    pub fn from_profile(profile: Profile) -> Self {
        Self {
            user_id: profile.id,
            email: profile.email,
            full_name: profile.full_name,
            role: profile.role,
            va_profile: profile.va_profile,
        }
    }

    pub fn is_verified(&self) -> bool {
        self.va_profile.as_ref().is_some_and(|va| va.is_verified)
    }

    pub fn require_role(&self, role: Role) -> Result<(), AppError> {
        if self.role != role {
            return Err(AppError::Forbidden(format!(
                "This action requires the '{}' role",
                role.as_str()
            )));
        }
        Ok(())
    }

    /// The VA profile of a VA account.
    pub fn require_va(&self) -> Result<&VaProfile, AppError> {
        self.require_role(Role::Va)?;
        self.va_profile
            .as_ref()
            .ok_or_else(|| AppError::Forbidden("Complete your VA profile first".to_string()))
    }
}

/// Cached session plus the latest token expiry seen for it.
struct CachedSession {
    session: Session,
    expires_at: usize,
}

/// Live sessions keyed by user id.
///
/// An entry lives until sign-out or until the newest access token presented
/// for it has expired (see `prune_expired`).
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, CachedSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached session or restores it from the user's profile.
    ///
    /// `expires_at` is the `exp` claim of the token the request carried.
    pub async fn restore(
        &self,
        user_id: &str,
        expires_at: usize,
        profiles: &dyn ProfileBackend,
    ) -> Result<Session, AppError> {
        if let Some(cached) = self.sessions.write().await.get_mut(user_id) {
            cached.expires_at = cached.expires_at.max(expires_at);
            return Ok(cached.session.clone());
        }

        let session = fetch_session(user_id, profiles).await?;
        let mut sessions = self.sessions.write().await;
        let cached = sessions
            .entry(user_id.to_string())
            .or_insert(CachedSession {
                session,
                expires_at,
            });
        cached.expires_at = cached.expires_at.max(expires_at);
        Ok(cached.session.clone())
    }

    /// Re-fetches the profile and replaces the cached session.
    pub async fn refresh(
        &self,
        user_id: &str,
        profiles: &dyn ProfileBackend,
    ) -> Result<Session, AppError> {
        let session = fetch_session(user_id, profiles).await?;

        let mut sessions = self.sessions.write().await;
        let expires_at = sessions.get(user_id).map_or(0, |cached| cached.expires_at);
        sessions.insert(
            user_id.to_string(),
            CachedSession {
                session: session.clone(),
                expires_at,
            },
        );
        Ok(session)
    }

    /// Returns whether a session existed.
    pub async fn sign_out(&self, user_id: &str) -> bool {
        self.sessions.write().await.remove(user_id).is_some()
    }

    /// Drops sessions whose newest token expired before `now` (Unix seconds).
    /// Returns the user ids removed.
    pub async fn prune_expired(&self, now: usize) -> Vec<String> {
        let mut sessions = self.sessions.write().await;
        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, cached)| cached.expires_at <= now)
            .map(|(user_id, _)| user_id.clone())
            .collect();

        for user_id in &expired {
            sessions.remove(user_id);
        }
        expired
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

async fn fetch_session(user_id: &str, profiles: &dyn ProfileBackend) -> Result<Session, AppError> {
    let profile = profiles
        .fetch_profile(user_id)
        .await?
        .ok_or_else(|| AppError::AuthError("No profile for this account".to_string()))?;

    let session = Session::from_profile(profile);
    tracing::debug!("Session restored for {} ({})", session.user_id, session.role.as_str());
    Ok(session)
}

/// Refreshes a user's session after a passed assessment, which may have set
/// the verified flag on their VA profile.
pub struct SessionRefresh {
    sessions: Arc<SessionStore>,
    profiles: Arc<dyn ProfileBackend>,
    user_id: String,
}

impl SessionRefresh {
    pub fn new(sessions: Arc<SessionStore>, profiles: Arc<dyn ProfileBackend>, user_id: &str) -> Self {
        Self {
            sessions,
            profiles,
            user_id: user_id.to_string(),
        }
    }
}

#[async_trait]
impl PassListener for SessionRefresh {
    async fn assessment_passed(&self, results: &AssessmentResults) {
        match self
            .sessions
            .refresh(&self.user_id, self.profiles.as_ref())
            .await
        {
            Ok(session) => tracing::info!(
                "Session of {} refreshed after passing with {} (verified: {})",
                self.user_id,
                results.score,
                session.is_verified()
            ),
            Err(e) => tracing::warn!("Session refresh for {} failed: {:?}", self.user_id, e),
        }
    }
}
