use async_trait::async_trait;
use jsonwebtoken::{
    Algorithm, DecodingKey, Validation, decode, decode_header, errors::ErrorKind, jwk::JwkSet,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

use crate::error::{AppError, Result};
use crate::models::normalize_email;

/// Claims
///
/// The subset of ID token claims the service reads. Firebase tokens carry many more;
/// serde ignores them.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the identity provider's user id.
    pub sub: String,
    /// Verified email of the signed-in user. Tokens without one are rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub exp: usize,
    pub iat: usize,
}

/// VerifiedIdentity
///
/// Output of a successful token verification.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedIdentity {
    pub uid: String,
    pub email: String,
}

impl TryFrom<Claims> for VerifiedIdentity {
    type Error = AppError;

    fn try_from(claims: Claims) -> Result<Self> {
        match claims.email {
            Some(email) if !email.trim().is_empty() => Ok(VerifiedIdentity {
                uid: claims.sub,
                email: normalize_email(&email),
            }),
            _ => Err(AppError::Unauthorized),
        }
    }
}

/// IdentityVerifier
///
/// The contract of the external identity provider. The Auth Gate only needs to turn a
/// bearer token into a verified email; every failure is `AppError::Unauthorized`.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity>;
}

/// IdentityState
///
/// The concrete type used to share the verifier across the application state.
pub type IdentityState = Arc<dyn IdentityVerifier>;

fn reject(e: jsonwebtoken::errors::Error) -> AppError {
    match e.kind() {
        ErrorKind::ExpiredSignature => tracing::debug!("rejected expired token"),
        other => tracing::debug!("rejected token: {:?}", other),
    }
    AppError::Unauthorized
}

// --- Shared-secret verifier (local development and tests) ---

/// HmacTokenVerifier
///
/// Accepts HS256 tokens signed with the configured secret. Never installed in
/// production.
pub struct HmacTokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl HmacTokenVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl IdentityVerifier for HmacTokenVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(reject)?;
        VerifiedIdentity::try_from(data.claims)
    }
}

// --- Firebase ID token verifier (production) ---

const FIREBASE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
const KEY_SET_TTL: Duration = Duration::from_secs(3600);
/// Minimum spacing between two key set fetches triggered by unknown `kid`s.
const REFETCH_COOLDOWN: Duration = Duration::from_secs(60);

struct CachedKeySet {
    keys: JwkSet,
    fetched_at: Instant,
}

/// FirebaseTokenVerifier
///
/// Verifies Firebase Authentication ID tokens: RS256, signed by one of Google's
/// published keys (selected by `kid`), audience = project id, issuer =
/// `https://securetoken.google.com/<project id>`.
///
/// The key set is cached for an hour. An unknown `kid` triggers an early refetch so
/// Google's key rotation becomes visible, at most once per cooldown; within the
/// cooldown such tokens are rejected without contacting the provider.
pub struct FirebaseTokenVerifier {
    project_id: String,
    jwks_url: String,
    http_client: reqwest::Client,
    key_set: RwLock<Option<CachedKeySet>>,
    /// Start of the last fetch attempt, successful or not. Held across the fetch so
    /// concurrent misses wait for one request instead of each sending their own.
    last_fetch: Mutex<Option<Instant>>,
    refetch_cooldown: Duration,
}

impl FirebaseTokenVerifier {
    pub fn new(project_id: &str) -> std::result::Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            project_id: project_id.to_string(),
            jwks_url: FIREBASE_JWKS_URL.to_string(),
            http_client,
            key_set: RwLock::new(None),
            last_fetch: Mutex::new(None),
            refetch_cooldown: REFETCH_COOLDOWN,
        })
    }

    /// Points the verifier at a different key set endpoint.
    pub fn with_jwks_url(mut self, url: impl Into<String>) -> Self {
        self.jwks_url = url.into();
        self
    }

    pub fn with_refetch_cooldown(mut self, cooldown: Duration) -> Self {
        self.refetch_cooldown = cooldown;
        self
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.project_id]);
        validation.set_issuer(&[format!("https://securetoken.google.com/{}", self.project_id)]);
        validation
    }

    async fn cached_key(&self, kid: &str) -> Option<DecodingKey> {
        let guard = self.key_set.read().await;
        let cached = guard.as_ref()?;
        if cached.fetched_at.elapsed() > KEY_SET_TTL {
            return None;
        }
        cached
            .keys
            .find(kid)
            .and_then(|jwk| DecodingKey::from_jwk(jwk).ok())
    }

    async fn refresh_keys(&self) -> Result<()> {
        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                tracing::warn!("Failed to fetch identity provider keys: {}", e);
                AppError::Unauthorized
            })?;
        let keys: JwkSet = response.json().await.map_err(|e| {
            tracing::warn!("Failed to parse identity provider keys: {}", e);
            AppError::Unauthorized
        })?;

        *self.key_set.write().await = Some(CachedKeySet {
            keys,
            fetched_at: Instant::now(),
        });
        Ok(())
    }

    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey> {
        if let Some(key) = self.cached_key(kid).await {
            return Ok(key);
        }

        let mut last_fetch = self.last_fetch.lock().await;
        // A concurrent miss may have refreshed while this one waited for the lock.
        if let Some(key) = self.cached_key(kid).await {
            return Ok(key);
        }
        if last_fetch.is_some_and(|at| at.elapsed() < self.refetch_cooldown) {
            tracing::debug!(kid, "unknown key id within refetch cooldown");
            return Err(AppError::Unauthorized);
        }

        *last_fetch = Some(Instant::now());
        self.refresh_keys().await?;
        drop(last_fetch);
        self.cached_key(kid).await.ok_or(AppError::Unauthorized)
    }
}

#[async_trait]
impl IdentityVerifier for FirebaseTokenVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity> {
        let header = decode_header(token).map_err(reject)?;
        if header.alg != Algorithm::RS256 {
            return Err(AppError::Unauthorized);
        }
        let kid = header.kid.ok_or(AppError::Unauthorized)?;
        let key = self.decoding_key(&kid).await?;

        let data = decode::<Claims>(token, &key, &self.validation()).map_err(reject)?;
        VerifiedIdentity::try_from(data.claims)
    }
}
