use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{AppError, Result};

/// Metadata key carrying the application id through the provider.
pub const APPLICATION_ID_KEY: &str = "applicationId";

/// NewCheckoutSession
///
/// Everything the provider needs to host the payment page for one application fee.
#[derive(Debug, Clone)]
pub struct NewCheckoutSession {
    pub application_id: Uuid,
    pub customer_email: String,
    pub product_name: String,
    pub description: String,
    /// Amount in the currency's minor unit (cents).
    pub amount_minor: i64,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
}

/// SessionPaymentStatus
///
/// The provider's view of whether the money has been collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPaymentStatus {
    Paid,
    Unpaid,
    NoPaymentRequired,
    #[serde(other)]
    Unknown,
}

/// CheckoutSession
///
/// A provider-hosted payment flow, as returned by the Checkout Sessions API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    pub payment_status: SessionPaymentStatus,
    /// Id of the underlying payment; recorded as the application's transaction id.
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub customer_email: Option<String>,
}

impl CheckoutSession {
    pub fn application_id(&self) -> Option<Uuid> {
        self.metadata
            .get(APPLICATION_ID_KEY)
            .and_then(|id| Uuid::parse_str(id).ok())
    }
}

/// Converts a fee in major units to the provider's minor units.
pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

/// Provider session ids are opaque but URL-safe (`cs_test_a1B2...`).
fn is_valid_session_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= 255 && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// PaymentGateway
///
/// The contract of the external payment provider: open a checkout session, and read
/// one back for reconciliation. Session state is taken as reported.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(&self, session: NewCheckoutSession)
    -> Result<CheckoutSession>;

    async fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession>;
}

/// PaymentState
///
/// The concrete type used to share the gateway across the application state.
pub type PaymentState = Arc<dyn PaymentGateway>;

// --- Stripe Checkout ---

/// StripeGateway
///
/// Talks to the Stripe Checkout Sessions REST API with form-encoded requests
/// authenticated by the account's secret key.
#[derive(Clone)]
pub struct StripeGateway {
    http_client: reqwest::Client,
    api_base: String,
    secret_key: String,
}

impl StripeGateway {
    pub fn new(api_base: &str, secret_key: &str) -> std::result::Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http_client,
            api_base: api_base.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
        })
    }

    async fn read_session(response: reqwest::Response) -> Result<CheckoutSession> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound("checkout session not found".to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Payment(format!("{} - {}", status, body)));
        }
        response
            .json::<CheckoutSession>()
            .await
            .map_err(|e| AppError::Payment(format!("Failed to parse session: {}", e)))
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_checkout_session(
        &self,
        session: NewCheckoutSession,
    ) -> Result<CheckoutSession> {
        let form: Vec<(&str, String)> = vec![
            ("mode", "payment".to_string()),
            ("customer_email", session.customer_email),
            ("line_items[0][quantity]", "1".to_string()),
            ("line_items[0][price_data][currency]", session.currency),
            (
                "line_items[0][price_data][unit_amount]",
                session.amount_minor.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]",
                session.product_name,
            ),
            (
                "line_items[0][price_data][product_data][description]",
                session.description,
            ),
            ("metadata[applicationId]", session.application_id.to_string()),
            ("success_url", session.success_url),
            ("cancel_url", session.cancel_url),
        ];

        let response = self
            .http_client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::Payment(format!("Failed to create session: {}", e)))?;

        Self::read_session(response).await
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession> {
        if !is_valid_session_id(session_id) {
            return Err(AppError::BadRequest("invalid session id".to_string()));
        }
        let response = self
            .http_client
            .get(format!("{}/v1/checkout/sessions/{}", self.api_base, session_id))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| AppError::Payment(format!("Failed to retrieve session: {}", e)))?;

        Self::read_session(response).await
    }
}

// --- In-memory gateway (tests) ---

/// MockPaymentGateway
///
/// Keeps sessions in memory so the checkout and reconciliation handlers can be driven
/// without network access. Tests settle a session with `complete_session`.
#[derive(Default)]
pub struct MockPaymentGateway {
    sessions: Mutex<HashMap<String, CheckoutSession>>,
    /// When true, every provider call fails.
    pub should_fail: bool,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Marks a session as paid through the given payment intent. Returns false for an
    /// unknown session.
    pub async fn complete_session(&self, session_id: &str, payment_intent: &str) -> bool {
        let mut sessions = self.sessions.lock().await;
        match sessions.get_mut(session_id) {
            Some(session) => {
                session.payment_status = SessionPaymentStatus::Paid;
                session.payment_intent = Some(payment_intent.to_string());
                true
            }
            None => false,
        }
    }

    fn check_available(&self) -> Result<()> {
        if self.should_fail {
            return Err(AppError::Payment(
                "Mock Payment Error: Simulation requested".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_checkout_session(
        &self,
        session: NewCheckoutSession,
    ) -> Result<CheckoutSession> {
        self.check_available()?;
        let id = format!("cs_test_{}", Uuid::new_v4().simple());
        let created = CheckoutSession {
            url: Some(format!("https://checkout.mock/pay/{}", id)),
            id: id.clone(),
            payment_status: SessionPaymentStatus::Unpaid,
            payment_intent: None,
            metadata: HashMap::from([(
                APPLICATION_ID_KEY.to_string(),
                session.application_id.to_string(),
            )]),
            amount_total: Some(session.amount_minor),
            customer_email: Some(session.customer_email),
        };
        self.sessions.lock().await.insert(id, created.clone());
        Ok(created)
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession> {
        self.check_available()?;
        if !is_valid_session_id(session_id) {
            return Err(AppError::BadRequest("invalid session id".to_string()));
        }
        self.sessions
            .lock()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("checkout session not found".to_string()))
    }
}
