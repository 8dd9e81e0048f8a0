// src/utils/jwt.rs

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, state::AppState};

/// Claims of an access token issued by the managed auth service.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - the account's user ID.
    pub sub: String,
    /// Audience, `authenticated` for signed-in users.
    pub aud: String,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
    #[serde(default)]
    pub email: Option<String>,
}

/// Verifies and decodes an access token.
///
/// Returns the `Claims` if valid, otherwise returns an `AppError`.
pub fn verify_jwt(token: &str, secret: &str, audience: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[audience]);

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        tracing::debug!("Rejected access token: {:?}", e);
        AppError::AuthError("Invalid token".to_string())
    })?;

    Ok(token_data.claims)
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header_value: Option<&str>) -> Option<&str> {
    header_value
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Axum Middleware: Authentication.
///
/// Validates the 'Authorization: Bearer <token>' header, restores the
/// caller's `Session` and injects it into the request extensions for handlers
/// to use. If invalid, returns 401 Unauthorized.
///
/// Sessions whose newest token has expired are evicted here, together with
/// their open assessments.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let token = bearer_token(auth_header)
        .ok_or_else(|| AppError::AuthError("Missing bearer token".to_string()))?;

    let claims = verify_jwt(token, &state.config.jwt_secret, &state.config.jwt_audience)?;

    let session = state
        .sessions
        .restore(&claims.sub, claims.exp, state.profiles.as_ref())
        .await?;

    let now = chrono::Utc::now().timestamp().max(0) as usize;
    for user_id in state.sessions.prune_expired(now).await {
        let closed = state.registry.remove_user(&user_id).await;
        tracing::info!(
            "Session of {} expired ({} open assessments discarded)",
            user_id,
            closed
        );
    }

    req.extensions_mut().insert(session);
    Ok(next.run(req).await)
}
