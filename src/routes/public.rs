use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that need no token: the scholarship catalogue, the public review wall
/// and the sign-up call the client makes after the identity provider logs a user in.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for the load balancer.
        .route("/health", get(|| async { "ok" }))
        // POST /users
        // First sign-in registers the account as a student. Idempotent per email.
        .route("/users", post(handlers::users::create_user))
        // GET /scholarships
        .route(
            "/scholarships",
            get(handlers::scholarships::get_scholarships),
        )
        // GET /scholarships/search?search=&country=&category=&degree=&sort=&page=&limit=
        .route(
            "/scholarships/search",
            get(handlers::scholarships::search_scholarships),
        )
        // GET /scholarship/{id}
        .route(
            "/scholarship/{id}",
            get(handlers::scholarships::get_scholarship),
        )
        // GET /reviews?scholarshipId=
        .route("/reviews", get(handlers::reviews::get_reviews))
}
