use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::Service;
use crate::services::catalog::{self, NewService};
use crate::state::AppState;

use super::check_auth;

// GET /api/services
pub async fn list_services(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Service>>, AppError> {
    check_auth(&headers, &state.config.api_token)?;

    let services = {
        let db = state.conn();
        queries::list_services(&db)?
    };
    Ok(Json(services))
}

// POST /api/services
pub async fn create_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<NewService>,
) -> Result<(StatusCode, Json<Service>), AppError> {
    check_auth(&headers, &state.config.api_token)?;

    let service = {
        let db = state.conn();
        catalog::create_service(&db, &body)?
    };
    Ok((StatusCode::CREATED, Json(service)))
}

// DELETE /api/services/:id
pub async fn delete_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.api_token)?;

    {
        let db = state.conn();
        catalog::soft_delete_service(&db, &id)?;
    }
    Ok(Json(serde_json::json!({ "ok": true })))
}
