use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::lenient::opt_string;
use crate::models::{Client, ClientQuery};
use crate::services::clients::{self, ClientUpdate};
use crate::state::AppState;

use super::check_auth;

// POST /api/clients/search
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(default, deserialize_with = "opt_string")]
    pub search_term: Option<String>,
}

pub async fn search_clients(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<SearchRequest>,
) -> Result<Json<Vec<Client>>, AppError> {
    check_auth(&headers, &state.config.api_token)?;

    let clients = {
        let db = state.conn();
        queries::search_clients(
            &db,
            body.search_term.as_deref(),
            state.config.clients_fetch_limit,
        )?
    };
    Ok(Json(clients))
}

// POST /api/clients/find-similar
pub async fn find_similar(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(query): Json<ClientQuery>,
) -> Result<Json<Vec<Client>>, AppError> {
    check_auth(&headers, &state.config.api_token)?;

    let clients = {
        let db = state.conn();
        queries::find_similar_clients(&db, &query, state.config.similar_clients_limit)?
    };
    Ok(Json(clients))
}

// PUT /api/clients/:id
pub async fn update_client(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<ClientUpdate>,
) -> Result<Json<Client>, AppError> {
    check_auth(&headers, &state.config.api_token)?;

    let client = {
        let db = state.conn();
        clients::update_client(&db, &id, &body)?
    };
    Ok(Json(client))
}

// POST /api/clients/delete
#[derive(Deserialize)]
pub struct DeleteRequest {
    #[serde(default, deserialize_with = "opt_string")]
    pub id: Option<String>,
}

pub async fn delete_client(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<DeleteRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.api_token)?;

    let id = body
        .id
        .ok_or_else(|| AppError::validation("Client ID is required"))?;
    let client = {
        let db = state.conn();
        clients::soft_delete_client(&db, &id)?
    };

    Ok(Json(serde_json::json!({
        "message": "Client soft-deleted successfully",
        "client": client,
    })))
}
