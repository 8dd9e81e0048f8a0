// src/config.rs

use std::env;
use std::net::SocketAddr;

use dotenvy::dotenv;
use url::Url;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the managed backend (REST + RPC).
    pub backend_url: Url,
    pub backend_service_key: String,
    /// Secret the managed auth service signs access tokens with.
    pub jwt_secret: String,
    pub jwt_audience: String,
    /// Function endpoint for e-mail notifications. Disabled when unset.
    pub notify_url: Option<Url>,
    pub listen_addr: SocketAddr,
    /// Countdown period; one second in production.
    pub tick_interval_ms: u64,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup (the process environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| AppError::InternalServerError(format!("{} must be set", key)))
        };

        let mut backend_url = Url::parse(&required("BACKEND_URL")?)?;
        // Endpoints are joined relative to this URL, which keeps the last
        // path segment only when it ends in '/'.
        if !backend_url.path().ends_with('/') {
            let path = format!("{}/", backend_url.path());
            backend_url.set_path(&path);
        }
        let backend_service_key = required("BACKEND_SERVICE_KEY")?;
        let jwt_secret = required("JWT_SECRET")?;

        let jwt_audience = lookup("JWT_AUDIENCE").unwrap_or_else(|| "authenticated".to_string());

        let notify_url = match lookup("NOTIFY_URL").filter(|v| !v.trim().is_empty()) {
            Some(raw) => Some(Url::parse(&raw)?),
            None => None,
        };

        let listen_addr = lookup("LISTEN_ADDR")
            .unwrap_or_else(|| "0.0.0.0:3000".to_string())
            .parse::<SocketAddr>()
            .map_err(|e| AppError::InternalServerError(format!("Invalid LISTEN_ADDR: {}", e)))?;

        let tick_interval_ms = match lookup("TICK_INTERVAL_MS") {
            Some(raw) => raw.parse::<u64>().map_err(|e| {
                AppError::InternalServerError(format!("Invalid TICK_INTERVAL_MS: {}", e))
            })?,
            None => 1000,
        };

        let rust_log = lookup("RUST_LOG").unwrap_or_else(|| "info".to_string());

        Ok(Self {
            backend_url,
            backend_service_key,
            jwt_secret,
            jwt_audience,
            notify_url,
            listen_addr,
            tick_interval_ms,
            rust_log,
        })
    }
}
