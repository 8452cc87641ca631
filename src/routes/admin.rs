use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, patch, post},
};

/// Admin Router Module
///
/// User management, the scholarship catalogue and the dashboard. The whole router is
/// wrapped in `require_role::<AdminOnly>`.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /users?role=&search=
        .route("/users", get(handlers::users::get_users))
        // PATCH /users/{id}/role
        // An admin cannot change their own role.
        .route("/users/{id}/role", patch(handlers::users::update_user_role))
        // DELETE /users/{id}
        .route("/users/{id}", delete(handlers::users::delete_user))
        // POST /scholarships
        .route(
            "/scholarships",
            post(handlers::scholarships::create_scholarship),
        )
        // PATCH/DELETE /scholarships/{id}
        .route(
            "/scholarships/{id}",
            patch(handlers::scholarships::update_scholarship)
                .delete(handlers::scholarships::delete_scholarship),
        )
}

/// Dashboard routes, nested under `/admin`.
pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/stats
        // Totals for users, scholarships, applications and reviews plus fees collected.
        .route("/stats", get(handlers::stats::get_admin_stats))
}
