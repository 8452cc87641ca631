use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, patch, post},
};

/// Authenticated Router Module
///
/// Routes available to any signed-in user. The `auth_middleware` route layer
/// guarantees a verified `AuthUser`; handlers that touch someone's records compare
/// the owner email against it (and let staff through where the route allows).
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /users/{email}/role
        // The path parameter is named `id` because the admin router shares this path.
        .route("/users/{id}/role", get(handlers::users::get_user_role))
        // --- Applications ---
        // POST /applications
        // Always stored as pending/unpaid with fees copied from the scholarship.
        .route(
            "/applications",
            post(handlers::applications::create_application),
        )
        // GET /applications/{email}
        // Owner or staff.
        .route(
            "/applications/{email}",
            get(handlers::applications::get_user_applications),
        )
        // DELETE /application/{id}
        // Owner while pending, staff at any time.
        .route(
            "/application/{id}",
            delete(handlers::applications::delete_application),
        )
        // --- Payments ---
        // POST /payment-checkout-session
        .route(
            "/payment-checkout-session",
            post(handlers::payments::create_checkout_session),
        )
        // PATCH /payment-success?session_id=
        // Pull-based reconciliation; safe to repeat.
        .route(
            "/payment-success",
            patch(handlers::payments::confirm_payment),
        )
        // GET /payment-cancelled?session_id=
        .route(
            "/payment-cancelled",
            get(handlers::payments::payment_cancelled),
        )
        // --- Reviews ---
        // POST /reviews/{applicationId}, GET /reviews/{email}, DELETE /reviews/{id}
        // One path, so one parameter name for all three methods.
        .route(
            "/reviews/{id}",
            post(handlers::reviews::create_review)
                .get(handlers::reviews::get_user_reviews)
                .delete(handlers::reviews::delete_review),
        )
        // PATCH /review/{id}/edit
        // Author only.
        .route("/review/{id}/edit", patch(handlers::reviews::update_review))
}
