//! HTTP handlers, one module per record collection plus the payment workflow and the
//! admin dashboard. Handlers are thin: extract, check ownership, call the repository.

pub mod applications;
pub mod payments;
pub mod reviews;
pub mod scholarships;
pub mod stats;
pub mod users;

use crate::{AppState, auth::AuthUser, error::Result, models::Role};

/// caller_role
///
/// Stored role of the authenticated caller. A caller without a user record has no
/// privileges beyond a student's.
pub(crate) async fn caller_role(state: &AppState, auth: &AuthUser) -> Result<Role> {
    Ok(state
        .repo
        .find_user_by_email(&auth.email)
        .await?
        .map(|user| user.role)
        .unwrap_or_default())
}

/// Grants access to `owner_email`'s records to the owner and to staff.
pub(crate) async fn ensure_owner_or_staff(
    state: &AppState,
    auth: &AuthUser,
    owner_email: &str,
) -> Result<()> {
    if auth.email == owner_email || caller_role(state, auth).await?.is_staff() {
        Ok(())
    } else {
        Err(crate::error::AppError::Forbidden)
    }
}
