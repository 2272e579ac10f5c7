use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::{apply_security_headers, create_cors_layer};
use crate::handlers::{events, health_check, payments, users};
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router {
    let cors = create_cors_layer(&state.config.cors_allowed_origins);
    let include_hsts = state.config.production;

    let router = Router::new()
        .route("/health", get(health_check))
        .route("/events", get(events::list_events).post(events::create_event))
        .route("/events/samples", post(events::create_sample_events))
        .route(
            "/events/:event_id/rsvp",
            post(events::create_rsvp).delete(events::cancel_rsvp),
        )
        .route(
            "/events/:event_id/interest",
            post(events::mark_interest).delete(events::remove_interest),
        )
        .route("/events/:event_id/interested", get(events::list_interested))
        .route("/events/:event_id/payment", post(events::create_payment))
        .route(
            "/payments/:payment_id/complete",
            post(payments::complete_payment),
        )
        .route("/users/me", get(users::profile))
        .with_state(state);

    apply_security_headers(router, include_hsts)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
