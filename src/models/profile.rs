// src/models/profile.rs

use serde::{Deserialize, Serialize};

/// Marketplace role of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Virtual assistant offering services.
    Va,
    /// Client hiring virtual assistants.
    Client,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Va => "va",
            Role::Client => "client",
            Role::Admin => "admin",
        }
    }
}

/// The VA-specific half of a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaProfile {
    pub id: String,
    #[serde(default)]
    pub headline: Option<String>,
    /// Set once the VA passed at least one skill assessment.
    pub is_verified: bool,
}

/// An account profile in canonical shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    pub full_name: String,
    pub role: Role,
    pub va_profile: Option<VaProfile>,
}
