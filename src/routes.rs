use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{delete, get, patch, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub fn app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(state.config.cors_allow_origin.as_deref());

    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/bookings", get(handlers::bookings::list_bookings))
        .route("/api/bookings/range", get(handlers::bookings::get_range))
        .route("/api/bookings/new", post(handlers::bookings::create_booking))
        .route("/api/bookings/update", patch(handlers::bookings::update_booking))
        .route("/api/bookings/stream", get(handlers::stream::booking_changes))
        .route(
            "/api/bookings/:id",
            put(handlers::bookings::replace_booking).delete(handlers::bookings::delete_booking),
        )
        .route("/api/clients/search", post(handlers::clients::search_clients))
        .route("/api/clients/find-similar", post(handlers::clients::find_similar))
        .route("/api/clients/delete", post(handlers::clients::delete_client))
        .route("/api/clients/:id", put(handlers::clients::update_client))
        .route(
            "/api/services",
            get(handlers::services::list_services).post(handlers::services::create_service),
        )
        .route("/api/services/:id", delete(handlers::services::delete_service))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match origin.map(HeaderValue::from_str) {
        Some(Ok(origin)) => layer.allow_origin(origin),
        Some(Err(e)) => {
            tracing::warn!(error = %e, "invalid CORS_ALLOW_ORIGIN, allowing any origin");
            layer.allow_origin(Any)
        }
        None => layer.allow_origin(Any),
    }
}
