use scholar_stream::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    identity::{FirebaseTokenVerifier, HmacTokenVerifier, IdentityState},
    payment::{PaymentState, StripeGateway},
    repository::{PostgresRepository, RepositoryState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Entry point: configuration, logging, database (with migrations), identity
/// verifier, payment gateway, then the HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    // RUST_LOG wins; otherwise verbose for this crate and request-level for tower_http.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "scholar_stream=debug,tower_http=info".into());

    // 3. Initialize Logging based on Environment
    match config.env {
        Env::Local => {
            // LOCAL: Pretty print output for human readability.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // PROD: JSON lines for the log aggregator.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Database Initialization (Postgres)
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("FATAL: Failed to apply database migrations.");

    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;

    // 5. Identity Verification
    // Shared-secret tokens locally, Firebase ID tokens in production.
    let identity = match config.env {
        Env::Local => Arc::new(HmacTokenVerifier::new(&config.jwt_secret)) as IdentityState,
        Env::Production => Arc::new(
            FirebaseTokenVerifier::new(&config.firebase_project_id)
                .expect("FATAL: Failed to build the identity provider HTTP client."),
        ) as IdentityState,
    };

    // 6. Payment Gateway
    let payments = Arc::new(
        StripeGateway::new(&config.stripe_api_base, &config.stripe_secret_key)
            .expect("FATAL: Failed to build the payment provider HTTP client."),
    ) as PaymentState;

    let port = config.port;

    // 7. Unified State Assembly
    let app_state = AppState {
        repo,
        identity,
        payments,
        config,
    };

    // 8. Router and Server Startup
    let app = create_router(app_state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("FATAL: Failed to bind {}: {}", addr, e));

    tracing::info!("Listening on {}", addr);
    tracing::info!(
        "API Documentation (Swagger UI) available at: http://localhost:{}/swagger-ui",
        port
    );

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}
