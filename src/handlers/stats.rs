use crate::{AppState, error::Result, models::AdminDashboardStats};
use axum::{Json, extract::State};

/// get_admin_stats
///
/// [Admin Route] Headline numbers for the admin dashboard.
#[utoipa::path(
    get,
    path = "/admin/stats",
    responses(
        (status = 200, description = "Dashboard statistics", body = AdminDashboardStats),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn get_admin_stats(State(state): State<AppState>) -> Result<Json<AdminDashboardStats>> {
    Ok(Json(state.repo.get_stats().await?))
}
