pub mod bookings;
pub mod clients;
pub mod health;
pub mod services;
pub mod stream;

use axum::http::HeaderMap;

use crate::errors::AppError;

/// Every `/api` route expects `Authorization: Bearer <API_TOKEN>`.
pub(crate) fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token.is_empty() || token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}
