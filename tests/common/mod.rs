#![allow(dead_code)]

use jsonwebtoken::{EncodingKey, Header, encode};
use scholar_stream::{
    AppConfig, AppState, create_router,
    identity::{Claims, HmacTokenVerifier, IdentityState},
    models::{CreateScholarshipRequest, NewScholarship, NewUser, Role, Scholarship, User},
    payment::{MockPaymentGateway, PaymentState},
    repository::{InMemoryRepository, Repository, RepositoryState},
};
use std::{sync::Arc, time::SystemTime};
use tokio::net::TcpListener;

pub const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";

pub struct TestApp {
    pub address: String,
    pub repo: Arc<InMemoryRepository>,
    pub payments: Arc<MockPaymentGateway>,
    pub client: reqwest::Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        jwt_secret: TEST_JWT_SECRET.to_string(),
        ..AppConfig::default()
    }
}

pub fn test_state(repo: Arc<InMemoryRepository>, payments: Arc<MockPaymentGateway>) -> AppState {
    AppState {
        repo: repo as RepositoryState,
        identity: Arc::new(HmacTokenVerifier::new(TEST_JWT_SECRET)) as IdentityState,
        payments: payments as PaymentState,
        config: test_config(),
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(MockPaymentGateway::new()).await
}

pub async fn spawn_app_with(gateway: MockPaymentGateway) -> TestApp {
    let repo = Arc::new(InMemoryRepository::new());
    let payments = Arc::new(gateway);
    let router = create_router(test_state(repo.clone(), payments.clone()));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp {
        address,
        repo,
        payments,
        client: reqwest::Client::new(),
    }
}

/// Mints an HS256 token for `email` that expires `exp_offset` seconds from now.
pub fn create_token(email: &str, exp_offset: i64) -> String {
    create_token_with_secret(email, exp_offset, TEST_JWT_SECRET)
}

pub fn create_token_with_secret(email: &str, exp_offset: i64, secret: &str) -> String {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;

    let claims = Claims {
        sub: format!("uid-{}", email),
        email: Some(email.to_string()),
        iat: now as usize,
        exp: (now + exp_offset) as usize,
    };

    let key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), &claims, &key).unwrap()
}

pub fn bearer(email: &str) -> String {
    format!("Bearer {}", create_token(email, 3600))
}

pub async fn seed_user(repo: &InMemoryRepository, email: &str, role: Role) -> User {
    let user = repo
        .create_user(NewUser {
            email: email.to_string(),
            name: Some(email.split('@').next().unwrap_or(email).to_string()),
            photo_url: None,
        })
        .await
        .unwrap()
        .expect("user already seeded");
    if role == Role::Student {
        return user;
    }
    repo.set_user_role(user.id, role).await.unwrap().unwrap()
}

pub async fn seed_scholarship(repo: &InMemoryRepository, name: &str, fees: f64) -> Scholarship {
    repo.create_scholarship(NewScholarship {
        request: CreateScholarshipRequest {
            name: name.to_string(),
            university: format!("{} University", name),
            country: "Germany".to_string(),
            degree: "Masters".to_string(),
            scholarship_category: Some("Full fund".to_string()),
            application_fees: fees,
            service_charge: 10.0,
            ..CreateScholarshipRequest::default()
        },
        posted_by: "admin@scholar.test".to_string(),
    })
    .await
    .unwrap()
}
