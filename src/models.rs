use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

// --- Enumerations (stored as TEXT) ---

/// Role
///
/// The RBAC field of a user record. New users always start as `student`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    #[default]
    Student,
    Moderator,
    Admin,
}

impl Role {
    /// Moderators and admins share the review queue.
    pub fn is_staff(self) -> bool {
        matches!(self, Role::Moderator | Role::Admin)
    }
}

/// ApplicationStatus
///
/// Review progress of an application, driven by moderators.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ApplicationStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Rejected,
}

/// PaymentStatus
///
/// Only the reconciliation step moves an application from `unpaid` to `paid`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
}

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// A marketplace account, keyed by the email verified by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    // Unique across the table, stored lowercase.
    pub email: String,
    pub name: Option<String>,
    pub photo_url: Option<String>,
    pub role: Role,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Scholarship
///
/// A funding offer published by an admin. `created_at` doubles as the post date.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Scholarship {
    pub id: Uuid,
    pub name: String,
    pub university: String,
    pub university_image: Option<String>,
    pub country: String,
    pub city: Option<String>,
    pub world_rank: Option<i32>,
    pub subject_category: Option<String>,
    pub scholarship_category: Option<String>,
    pub degree: String,
    pub tuition_fees: Option<f64>,
    pub application_fees: f64,
    pub service_charge: f64,
    #[ts(type = "string | null")]
    pub application_deadline: Option<DateTime<Utc>>,
    // Email of the admin who published it.
    pub posted_by: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Application
///
/// A student's application to one scholarship. Scholarship name, university, degree
/// and fees are copied at submission time so later edits do not rewrite history.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Application {
    pub id: Uuid,
    pub scholarship_id: Uuid,
    pub user_email: String,
    pub user_name: Option<String>,
    pub scholarship_name: String,
    pub university_name: String,
    pub degree: String,
    pub application_fees: f64,
    pub service_charge: f64,
    pub status: ApplicationStatus,
    pub payment_status: PaymentStatus,
    pub feedback: Option<String>,
    // Provider payment intent id; unique once set.
    pub transaction_id: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string | null")]
    pub paid_at: Option<DateTime<Utc>>,
}

impl Application {
    /// What the applicant is charged at checkout.
    pub fn amount_due(&self) -> f64 {
        self.application_fees + self.service_charge
    }
}

/// Review
///
/// A rating left by the owner of an application. At most one per application.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Review {
    pub id: Uuid,
    pub application_id: Uuid,
    pub scholarship_id: Uuid,
    pub scholarship_name: String,
    pub university_name: String,
    pub user_email: String,
    pub user_name: Option<String>,
    pub user_image: Option<String>,
    // 1..=5
    pub rating: i32,
    pub comment: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Canonical form of an email address: trimmed and lowercased. Every stored email and
/// every email lookup goes through it.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// --- Insert Records (Internal) ---

/// Fields of a user row supplied by the caller; `role` is always `student`.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: Option<String>,
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewScholarship {
    pub request: CreateScholarshipRequest,
    pub posted_by: String,
}

/// Fully resolved application row. Status and payment status are not part of it:
/// every new application starts `pending` and `unpaid`.
#[derive(Debug, Clone)]
pub struct NewApplication {
    pub scholarship_id: Uuid,
    pub user_email: String,
    pub user_name: Option<String>,
    pub scholarship_name: String,
    pub university_name: String,
    pub degree: String,
    pub application_fees: f64,
    pub service_charge: f64,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub application_id: Uuid,
    pub scholarship_id: Uuid,
    pub scholarship_name: String,
    pub university_name: String,
    pub user_email: String,
    pub user_name: Option<String>,
    pub user_image: Option<String>,
    pub rating: i32,
    pub comment: String,
}

/// Outcome of the conditional `unpaid -> paid` update.
#[derive(Debug, Clone)]
pub enum PaidTransition {
    /// This call flipped the application to paid.
    Applied(Application),
    /// The application was already paid before this call.
    AlreadyPaid(Application),
}

// --- Request Payloads (Input Schemas) ---

/// CreateUserRequest
///
/// Sent by the client on first sign-in (POST /users).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateUserRequest {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    #[serde(alias = "photoURL")]
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UpdateRoleRequest {
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RoleResponse {
    pub role: Role,
}

/// UserFilter
///
/// Query parameters of the admin user listing (GET /users).
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct UserFilter {
    /// Only users holding this role.
    pub role: Option<Role>,
    /// Case-insensitive substring of email or name.
    pub search: Option<String>,
}

/// CreateScholarshipRequest
///
/// Input payload for publishing a scholarship (POST /scholarships).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateScholarshipRequest {
    pub name: String,
    pub university: String,
    #[serde(default)]
    pub university_image: Option<String>,
    pub country: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub world_rank: Option<i32>,
    #[serde(default)]
    pub subject_category: Option<String>,
    #[serde(default)]
    pub scholarship_category: Option<String>,
    pub degree: String,
    #[serde(default)]
    pub tuition_fees: Option<f64>,
    pub application_fees: f64,
    #[serde(default)]
    pub service_charge: f64,
    #[serde(default)]
    #[ts(type = "string | null")]
    pub application_deadline: Option<DateTime<Utc>>,
}

/// UpdateScholarshipRequest
///
/// Merge-set for PATCH /scholarships/{id}: only provided fields are written.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateScholarshipRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub university: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub university_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub world_rank: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scholarship_category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degree: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tuition_fees: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_fees: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_charge: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(type = "string | null")]
    pub application_deadline: Option<DateTime<Utc>>,
}

/// ScholarshipSort
///
/// Ordering of the search results. `recent` (newest first) when absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum ScholarshipSort {
    FeeLow,
    FeeHigh,
    #[default]
    Recent,
}

/// ScholarshipQuery
///
/// Accepted query parameters of GET /scholarships/search.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ScholarshipQuery {
    /// Case-insensitive substring of name, university or degree.
    pub search: Option<String>,
    pub country: Option<String>,
    /// Scholarship category (e.g. "Full fund").
    pub category: Option<String>,
    pub degree: Option<String>,
    pub sort: Option<ScholarshipSort>,
    /// 1-based page number.
    pub page: Option<i64>,
    /// Page size, clamped to 1..=100.
    pub limit: Option<i64>,
}

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// ScholarshipSearch
///
/// Normalized form of `ScholarshipQuery` consumed by the repository: blank strings
/// dropped, paging bounded.
#[derive(Debug, Clone, PartialEq)]
pub struct ScholarshipSearch {
    pub text: Option<String>,
    pub country: Option<String>,
    pub category: Option<String>,
    pub degree: Option<String>,
    pub sort: ScholarshipSort,
    pub page: i64,
    pub limit: i64,
}

impl ScholarshipSearch {
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl From<ScholarshipQuery> for ScholarshipSearch {
    fn from(query: ScholarshipQuery) -> Self {
        Self {
            text: non_blank(query.search),
            country: non_blank(query.country),
            category: non_blank(query.category),
            degree: non_blank(query.degree),
            sort: query.sort.unwrap_or_default(),
            page: query.page.unwrap_or(1).max(1),
            limit: query
                .limit
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        }
    }
}

/// ScholarshipPage
///
/// One page of search results plus the total number of matches.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ScholarshipPage {
    pub scholarships: Vec<Scholarship>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

/// CreateApplicationRequest
///
/// Input payload for POST /applications. Status, payment status and the applicant
/// email are never taken from the client.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateApplicationRequest {
    pub scholarship_id: Uuid,
    #[serde(default)]
    pub user_name: Option<String>,
}

/// ApplicationQuery
///
/// Query parameters of the staff listing (GET /applications).
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(rename_all = "camelCase")]
pub struct ApplicationQuery {
    pub status: Option<ApplicationStatus>,
    pub payment_status: Option<PaymentStatus>,
}

/// Repository-level application filter.
#[derive(Debug, Clone, Default)]
pub struct ApplicationFilter {
    pub user_email: Option<String>,
    pub status: Option<ApplicationStatus>,
    pub payment_status: Option<PaymentStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UpdateStatusRequest {
    pub status: ApplicationStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct FeedbackRequest {
    pub feedback: String,
}

/// CreateReviewRequest
///
/// Input payload for POST /reviews/{applicationId}.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateReviewRequest {
    pub rating: i32,
    pub comment: String,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub user_image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateReviewRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// ReviewQuery
///
/// Query parameters of GET /reviews.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(rename_all = "camelCase")]
pub struct ReviewQuery {
    pub scholarship_id: Option<Uuid>,
}

/// Repository-level review filter.
#[derive(Debug, Clone, Default)]
pub struct ReviewFilter {
    pub user_email: Option<String>,
    pub scholarship_id: Option<Uuid>,
}

/// MessageResponse
///
/// Small informational body, e.g. `{"message": "user exists"}`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// --- Payment Schemas ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CheckoutRequest {
    pub application_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CheckoutResponse {
    /// Provider-hosted page the client redirects to.
    pub url: String,
    pub session_id: String,
}

/// SessionQuery
///
/// `?session_id=` appended by the provider to the success and cancel URLs.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct SessionQuery {
    pub session_id: String,
}

/// PaymentReceipt
///
/// Confirmation returned by PATCH /payment-success. `already_processed` is true when
/// the transaction had been recorded by an earlier call.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PaymentReceipt {
    pub success: bool,
    pub already_processed: bool,
    pub transaction_id: String,
    pub application_id: Uuid,
    pub scholarship_name: String,
    pub university_name: String,
    pub amount: f64,
    #[ts(type = "string | null")]
    pub paid_at: Option<DateTime<Utc>>,
}

impl PaymentReceipt {
    pub fn from_application(application: &Application, transaction_id: String, already_processed: bool) -> Self {
        Self {
            success: true,
            already_processed,
            transaction_id,
            application_id: application.id,
            scholarship_name: application.scholarship_name.clone(),
            university_name: application.university_name.clone(),
            amount: application.amount_due(),
            paid_at: application.paid_at,
        }
    }
}

/// PaymentCancelled
///
/// Informational payload of GET /payment-cancelled.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PaymentCancelled {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scholarship_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub university_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_fees: Option<f64>,
}

// --- Dashboard Schemas (Output) ---

/// AdminDashboardStats
///
/// Output schema for GET /admin/stats.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AdminDashboardStats {
    pub total_users: i64,
    pub total_scholarships: i64,
    pub total_applications: i64,
    /// Applications still in `pending`.
    pub pending_applications: i64,
    pub total_reviews: i64,
    /// Sum of fees and service charges over paid applications.
    pub fees_collected: f64,
}
