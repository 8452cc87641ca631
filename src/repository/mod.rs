use crate::error::Result;
use crate::models::{
    AdminDashboardStats, Application, ApplicationFilter, ApplicationStatus, NewApplication,
    NewReview, NewScholarship, NewUser, PaidTransition, Review, ReviewFilter, Role, Scholarship,
    ScholarshipSearch, UpdateReviewRequest, UpdateScholarshipRequest, User, UserFilter,
};
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

mod memory;
mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

/// Repository Trait
///
/// The persistence contract for the four record collections. Handlers only see this
/// trait, so the Postgres store and the in-memory store are interchangeable.
///
/// `Ok(None)` / `Ok(false)` mean "no such record"; `Err` is reserved for storage
/// failures.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    /// Inserts a `student`. Returns `None` when the email is already registered.
    async fn create_user(&self, user: NewUser) -> Result<Option<User>>;
    async fn find_user(&self, id: Uuid) -> Result<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>>;
    async fn set_user_role(&self, id: Uuid, role: Role) -> Result<Option<User>>;
    async fn delete_user(&self, id: Uuid) -> Result<bool>;

    // --- Scholarships ---
    async fn create_scholarship(&self, scholarship: NewScholarship) -> Result<Scholarship>;
    async fn find_scholarship(&self, id: Uuid) -> Result<Option<Scholarship>>;
    /// Every scholarship, newest first.
    async fn list_scholarships(&self) -> Result<Vec<Scholarship>>;
    /// One page of matches plus the total match count.
    async fn search_scholarships(
        &self,
        search: &ScholarshipSearch,
    ) -> Result<(Vec<Scholarship>, i64)>;
    async fn update_scholarship(
        &self,
        id: Uuid,
        changes: UpdateScholarshipRequest,
    ) -> Result<Option<Scholarship>>;
    async fn delete_scholarship(&self, id: Uuid) -> Result<bool>;

    // --- Applications ---
    /// Always stored as `pending` / `unpaid`.
    async fn create_application(&self, application: NewApplication) -> Result<Application>;
    async fn find_application(&self, id: Uuid) -> Result<Option<Application>>;
    async fn find_application_by_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Application>>;
    /// Newest first.
    async fn list_applications(&self, filter: &ApplicationFilter) -> Result<Vec<Application>>;
    async fn set_application_status(
        &self,
        id: Uuid,
        status: ApplicationStatus,
    ) -> Result<Option<Application>>;
    async fn set_application_feedback(
        &self,
        id: Uuid,
        feedback: String,
    ) -> Result<Option<Application>>;
    /// Atomically moves an `unpaid` application to `paid` and records the transaction.
    /// Returns `None` when the application does not exist.
    async fn mark_application_paid(
        &self,
        id: Uuid,
        transaction_id: &str,
    ) -> Result<Option<PaidTransition>>;
    async fn delete_application(&self, id: Uuid) -> Result<bool>;

    // --- Reviews ---
    /// Returns `None` when the application already has a review.
    async fn create_review(&self, review: NewReview) -> Result<Option<Review>>;
    async fn find_review(&self, id: Uuid) -> Result<Option<Review>>;
    async fn find_review_by_application(&self, application_id: Uuid) -> Result<Option<Review>>;
    /// Newest first.
    async fn list_reviews(&self, filter: &ReviewFilter) -> Result<Vec<Review>>;
    async fn update_review(
        &self,
        id: Uuid,
        changes: UpdateReviewRequest,
    ) -> Result<Option<Review>>;
    async fn delete_review(&self, id: Uuid) -> Result<bool>;

    // --- Dashboard ---
    async fn get_stats(&self) -> Result<AdminDashboardStats>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;
