use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, patch},
};

/// Staff Router Module
///
/// The application review queue. Wrapped in `require_role::<Staff>`, so moderators
/// and admins reach these handlers and everyone else gets 403.
pub fn staff_routes() -> Router<AppState> {
    Router::new()
        // GET /applications?status=&paymentStatus=
        .route(
            "/applications",
            get(handlers::applications::get_applications),
        )
        // PATCH /application/{id}/status
        .route(
            "/application/{id}/status",
            patch(handlers::applications::update_application_status),
        )
        // PATCH /application/{id}/feedback
        .route(
            "/application/{id}/feedback",
            patch(handlers::applications::update_application_feedback),
        )
}
