use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{BookingDetails, ChangeEvent};
use crate::services::booking::{self, BookingUpdate, NewBooking};
use crate::state::AppState;

use super::check_auth;

// GET /api/bookings
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<BookingDetails>>, AppError> {
    check_auth(&headers, &state.config.api_token)?;

    let bookings = {
        let db = state.conn();
        queries::get_all_bookings(&db)?
    };
    Ok(Json(bookings))
}

// GET /api/bookings/range?start=..&end=..
#[derive(Deserialize)]
pub struct RangeQuery {
    pub start: Option<String>,
    pub end: Option<String>,
}

pub async fn get_range(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<BookingDetails>>, AppError> {
    check_auth(&headers, &state.config.api_token)?;

    let (Some(start), Some(end)) = (
        query.start.as_deref().filter(|s| !s.is_empty()),
        query.end.as_deref().filter(|s| !s.is_empty()),
    ) else {
        return Err(AppError::validation("Missing date range"));
    };
    let (start, end) = match (parse_instant(start), parse_instant(end)) {
        (Some(start), Some(end)) => (start, end),
        _ => return Err(AppError::validation("Invalid date range")),
    };
    if start > end {
        return Err(AppError::validation("start must not be after end"));
    }

    let bookings = {
        let db = state.conn();
        queries::get_bookings_in_range(&db, &start, &end)?
    };
    tracing::debug!(%start, %end, count = bookings.len(), "range fetch");
    Ok(Json(bookings))
}

fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

// POST /api/bookings/new
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<NewBooking>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    check_auth(&headers, &state.config.api_token)?;

    // Publish under the lock so the feed sees writes in commit order.
    let details = {
        let db = state.conn();
        let details = booking::create_booking(&db, &body, state.config.default_duration_minutes)?;
        state.changes.publish(ChangeEvent::insert(details.clone()));
        details
    };

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "booking": details })),
    ))
}

// PATCH /api/bookings/update
pub async fn update_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<BookingUpdate>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.api_token)?;

    let id = body
        .id
        .clone()
        .ok_or_else(|| AppError::validation("Missing booking id"))?;
    let details = apply_update(&state, &id, &body)?;
    Ok(Json(serde_json::json!({ "booking": details })))
}

// PUT /api/bookings/:id
pub async fn replace_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<BookingUpdate>,
) -> Result<Json<BookingDetails>, AppError> {
    check_auth(&headers, &state.config.api_token)?;

    let details = apply_update(&state, &id, &body)?;
    Ok(Json(details))
}

fn apply_update(state: &AppState, id: &str, body: &BookingUpdate) -> Result<BookingDetails, AppError> {
    let db = state.conn();
    let details = booking::update_booking(&db, id, body)?;
    state.changes.publish(ChangeEvent::update(details.clone()));
    Ok(details)
}

// DELETE /api/bookings/:id
pub async fn delete_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<BookingDetails>, AppError> {
    check_auth(&headers, &state.config.api_token)?;

    let details = {
        let db = state.conn();
        let details = booking::delete_booking(&db, &id)?;
        state.changes.publish(ChangeEvent::delete(details.clone()));
        details
    };
    Ok(Json(details))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_instant_accepts_offsets() {
        let a = parse_instant("2024-01-01T10:00:00.000Z").unwrap();
        let b = parse_instant("2024-01-01T11:00:00+01:00").unwrap();
        assert_eq!(a, b);
        assert!(parse_instant("2024-01-01").is_none());
        assert!(parse_instant("yesterday").is_none());
    }
}
