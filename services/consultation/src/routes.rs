use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, AppState};

pub fn create_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Consultant directory
        .route(
            "/api/consultants",
            get(handlers::list_consultants).post(handlers::create_consultant),
        )
        .route("/api/consultants/me", get(handlers::get_my_consultant))
        .route("/api/consultants/:consultant_id", get(handlers::get_consultant))
        .route(
            "/api/consultants/:consultant_id/reviews",
            get(handlers::list_consultant_reviews),
        )
        // Consultation lifecycle
        .route(
            "/api/consultations",
            get(handlers::list_my_consultations).post(handlers::create_consultation),
        )
        .route(
            "/api/consultations/incoming",
            get(handlers::list_incoming_consultations),
        )
        .route(
            "/api/consultations/:consultation_id/accept",
            post(handlers::accept_consultation),
        )
        .route(
            "/api/consultations/:consultation_id/reject",
            post(handlers::reject_consultation),
        )
        .route(
            "/api/consultations/:consultation_id/start",
            post(handlers::start_consultation),
        )
        .route(
            "/api/consultations/:consultation_id/complete",
            post(handlers::complete_consultation),
        )
        .route(
            "/api/consultations/:consultation_id/cancel",
            post(handlers::cancel_consultation),
        )
        // Payments (callback is unauthenticated; the gateway is the caller)
        .route("/api/payments", post(handlers::create_payment))
        .route("/api/payments/callback", post(handlers::payment_callback))
        .route("/api/payments/:consultation_id", get(handlers::get_payment))
        // Reviews
        .route("/api/reviews", post(handlers::create_review))
}
