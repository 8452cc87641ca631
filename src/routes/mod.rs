/// Router Module Index
///
/// Routes are grouped by the gate that protects them. Each group is wrapped in its
/// route layer in `create_router`, so a handler can never be mounted without its
/// access check.

/// Routes open to anonymous clients: catalogue browsing, public reviews, sign-up.
pub mod public;

/// Routes behind the `AuthUser` extractor middleware. Ownership checks happen in
/// the handlers.
pub mod authenticated;

/// Routes for moderators and admins (the application review queue).
pub mod staff;

/// Routes restricted to the 'admin' role.
pub mod admin;
