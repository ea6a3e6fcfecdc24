//! Router configuration.
//!
//! Builds the complete Axum router with all endpoints.

use super::state::AppState;
use crate::api::{admin, auth, events, registrations};
use axum::{
    routing::{get, post, put},
    Router,
};
use rsvp_web::{correlation_id_layer, handlers::health_check};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the complete Axum router.
///
/// `/health` plus everything under `/api`. Every response carries an
/// `X-Correlation-ID` header.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Catalog and admin event CRUD
        .route("/events", get(events::list_events).post(events::create_event))
        .route(
            "/events/:id",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::delete_event),
        )
        // Registration
        .route(
            "/events/:id/register",
            post(registrations::register).delete(registrations::cancel),
        )
        // Admin
        .route("/admin/events/:id", put(events::update_event).delete(events::delete_event))
        .route("/admin/registrations", get(admin::list_registrations))
        .route("/admin/export", get(admin::export))
        // Accounts
        .route("/auth/register", post(auth::sign_up))
        .route("/auth/login", post(auth::log_in));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(correlation_id_layer())
        .with_state(state)
}
