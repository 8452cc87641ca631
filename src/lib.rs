use axum::{Router, extract::FromRef, http::HeaderName, middleware};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod models;
pub mod payment;
pub mod repository;

// Routers grouped by access gate (Public, Authenticated, Staff, Admin).
pub mod routes;
use auth::{AdminOnly, Staff, auth_middleware, require_role};
use routes::{admin, authenticated, public, staff};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{AppError, Result};
pub use identity::{FirebaseTokenVerifier, HmacTokenVerifier, IdentityState};
pub use payment::{MockPaymentGateway, PaymentState, StripeGateway};
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// OpenAPI document assembled from the `#[utoipa::path]` handlers and the `ToSchema`
/// models. Served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::users::create_user, handlers::users::get_users,
        handlers::users::get_user_role, handlers::users::update_user_role,
        handlers::users::delete_user,
        handlers::scholarships::create_scholarship, handlers::scholarships::get_scholarships,
        handlers::scholarships::search_scholarships, handlers::scholarships::get_scholarship,
        handlers::scholarships::update_scholarship, handlers::scholarships::delete_scholarship,
        handlers::applications::create_application,
        handlers::applications::get_user_applications,
        handlers::applications::get_applications,
        handlers::applications::update_application_status,
        handlers::applications::update_application_feedback,
        handlers::applications::delete_application,
        handlers::payments::create_checkout_session, handlers::payments::confirm_payment,
        handlers::payments::payment_cancelled,
        handlers::reviews::create_review, handlers::reviews::update_review,
        handlers::reviews::get_reviews, handlers::reviews::get_user_reviews,
        handlers::reviews::delete_review,
        handlers::stats::get_admin_stats
    ),
    components(
        schemas(
            models::Role, models::ApplicationStatus, models::PaymentStatus,
            models::User, models::Scholarship, models::Application, models::Review,
            models::CreateUserRequest, models::UpdateRoleRequest, models::RoleResponse,
            models::CreateScholarshipRequest, models::UpdateScholarshipRequest,
            models::ScholarshipSort, models::ScholarshipPage,
            models::CreateApplicationRequest, models::UpdateStatusRequest,
            models::FeedbackRequest, models::CreateReviewRequest, models::UpdateReviewRequest,
            models::MessageResponse, models::CheckoutRequest, models::CheckoutResponse,
            models::PaymentReceipt, models::PaymentCancelled, models::AdminDashboardStats,
        )
    ),
    tags(
        (name = "scholar-stream", description = "Scholarship marketplace API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The shared container of every service a handler may need. Cloned per request;
/// every service field is an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Persistence: Postgres in production, in-memory in tests.
    pub repo: RepositoryState,
    /// Verifies bearer tokens issued by the identity provider.
    pub identity: IdentityState,
    /// Checkout sessions at the payment provider.
    pub payments: PaymentState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// Extractors such as `AuthUser` ask for these pieces instead of the whole AppState.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for IdentityState {
    fn from_ref(app_state: &AppState) -> IdentityState {
        app_state.identity.clone()
    }
}

impl FromRef<AppState> for PaymentState {
    fn from_ref(app_state: &AppState) -> PaymentState {
        app_state.payments.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the route groups, puts each behind its gate and adds the observability
/// layers.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: Serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public Routes: No middleware applied.
        .merge(public::public_routes())
        // Authenticated Routes: 401 unless the bearer token verifies.
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        // Staff Routes: 401 without a token, 403 unless moderator or admin.
        .merge(
            staff::staff_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                require_role::<Staff>,
            )),
        )
        // Admin Routes: 401 without a token, 403 unless admin.
        .merge(
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                require_role::<AdminOnly>,
            )),
        )
        .nest(
            "/admin",
            admin::dashboard_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                require_role::<AdminOnly>,
            )),
        )
        // Apply the Unified State to all routes.
        .with_state(state);

    // 3. Observability and Correlation Layers (Applied outermost/first)
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation: a UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing: one span per request, tagged with the request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation: echo x-request-id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Span factory for `TraceLayer`: method, uri and the `x-request-id` set above, so
/// every log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
