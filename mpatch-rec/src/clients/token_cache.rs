//! Catalog access token cache
//!
//! The only process-wide mutable state in the service. The token is acquired
//! lazily on first use, refreshed on a fixed interval by a background task,
//! and dropped when the catalog rejects it. All acquisition happens while
//! holding the cache mutex, so concurrent requests that find the cache empty
//! wait for one in-flight fetch instead of issuing their own.

use crate::error::UpstreamError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// Spotify accounts endpoint (client-credentials grant)
pub const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Background refresh period (tokens live 60 minutes)
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(55 * 60);

/// Delay before the background task retries a failed refresh
pub const REFRESH_RETRY_DELAY: Duration = Duration::from_secs(10);

/// Tokens are treated as expired this long before their stated lifetime
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Attempts for a lazy acquisition on the request path
const ACQUIRE_ATTEMPTS: u32 = 3;

/// First backoff between lazy acquisition attempts (doubles)
const ACQUIRE_BACKOFF: Duration = Duration::from_millis(500);

/// Bearer token with its lifetime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub value: String,
    pub expires_in: Duration,
}

/// Source of fresh access tokens
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn fetch_token(&self) -> Result<AccessToken, UpstreamError>;
}

#[derive(Debug)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Shared, single-flight access token cache
pub struct TokenCache {
    provider: Arc<dyn TokenProvider>,
    cached: Mutex<Option<CachedToken>>,
    acquire_backoff: Duration,
}

impl TokenCache {
    pub fn new(provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            provider,
            cached: Mutex::new(None),
            acquire_backoff: ACQUIRE_BACKOFF,
        }
    }

    /// Override the lazy acquisition backoff (tests use a tiny value)
    pub fn with_acquire_backoff(mut self, backoff: Duration) -> Self {
        self.acquire_backoff = backoff;
        self
    }

    /// Current token, acquiring one if absent or expired
    pub async fn token(&self) -> Result<String, UpstreamError> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if !token.is_expired() {
                return Ok(token.value.clone());
            }
            debug!("Cached catalog token expired, re-acquiring");
        }

        let fresh = self.acquire_with_backoff().await?;
        let value = fresh.value.clone();
        *cached = Some(store(fresh));
        Ok(value)
    }

    /// Drop `stale` after the catalog rejected it
    ///
    /// No-op when another request already replaced it.
    pub async fn invalidate(&self, stale: &str) {
        let mut cached = self.cached.lock().await;
        if cached.as_ref().is_some_and(|t| t.value == stale) {
            info!("Catalog token rejected, invalidating cache");
            *cached = None;
        }
    }

    /// Fetch a new token unconditionally (single attempt)
    pub async fn refresh(&self) -> Result<(), UpstreamError> {
        let mut cached = self.cached.lock().await;
        let fresh = self.provider.fetch_token().await?;
        *cached = Some(store(fresh));
        info!("Catalog token refreshed");
        Ok(())
    }

    /// Spawn the periodic refresh loop
    pub fn spawn_refresh_task(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let delay = match self.refresh().await {
                    Ok(()) => REFRESH_INTERVAL,
                    Err(e) => {
                        warn!(error = %e, "Catalog token refresh failed, retrying in {}s", REFRESH_RETRY_DELAY.as_secs());
                        REFRESH_RETRY_DELAY
                    }
                };
                sleep(delay).await;
            }
        })
    }

    async fn acquire_with_backoff(&self) -> Result<AccessToken, UpstreamError> {
        let mut backoff = self.acquire_backoff;
        let mut attempt = 1;

        loop {
            match self.provider.fetch_token().await {
                Ok(token) => return Ok(token),
                Err(e) if e.is_transient() && attempt < ACQUIRE_ATTEMPTS => {
                    warn!(attempt, error = %e, "Catalog token acquisition failed, backing off");
                    sleep(backoff).await;
                    backoff = backoff.saturating_mul(2);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn store(token: AccessToken) -> CachedToken {
    let lifetime = token.expires_in.saturating_sub(EXPIRY_MARGIN);
    CachedToken {
        value: token.value,
        expires_at: Instant::now() + lifetime,
    }
}

// ============================================================================
// Client-credentials provider
// ============================================================================

/// OAuth client-credentials grant against the catalog's accounts service
pub struct ClientCredentialsProvider {
    http_client: Client,
    client_id: String,
    client_secret: String,
    token_url: String,
}

impl ClientCredentialsProvider {
    pub fn new(http_client: Client, client_id: String, client_secret: String) -> Self {
        Self {
            http_client,
            client_id,
            client_secret,
            token_url: SPOTIFY_TOKEN_URL.to_string(),
        }
    }

    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[async_trait]
impl TokenProvider for ClientCredentialsProvider {
    async fn fetch_token(&self) -> Result<AccessToken, UpstreamError> {
        let response = self
            .http_client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| UpstreamError::from_reqwest("Spotify accounts", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::from_status("Spotify accounts", status));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::Parse(format!("Failed to parse token response: {}", e)))?;

        Ok(AccessToken {
            value: body.access_token,
            expires_in: Duration::from_secs(body.expires_in),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Issues "token-N", optionally failing the first `fail_first` calls
    struct CountingProvider {
        calls: AtomicU32,
        fail_first: u32,
        failure: UpstreamError,
        delay: Duration,
        expires_in: Duration,
    }

    impl CountingProvider {
        fn new() -> Self {
            Self {
                calls: AtomicU32::new(0),
                fail_first: 0,
                failure: UpstreamError::Network("down".into()),
                delay: Duration::ZERO,
                expires_in: Duration::from_secs(3600),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenProvider for CountingProvider {
        async fn fetch_token(&self) -> Result<AccessToken, UpstreamError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            sleep(self.delay).await;
            if n <= self.fail_first {
                return Err(self.failure.clone());
            }
            Ok(AccessToken {
                value: format!("token-{}", n),
                expires_in: self.expires_in,
            })
        }
    }

    #[tokio::test]
    async fn test_lazy_acquisition_and_reuse() {
        let provider = Arc::new(CountingProvider::new());
        let cache = TokenCache::new(provider.clone());

        assert_eq!(cache.token().await.unwrap(), "token-1");
        assert_eq!(cache.token().await.unwrap(), "token-1");
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_fetch() {
        let provider = Arc::new(CountingProvider {
            delay: Duration::from_millis(50),
            ..CountingProvider::new()
        });
        let cache = Arc::new(TokenCache::new(provider.clone()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.token().await })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "token-1");
        }
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_acquisition_retries_with_backoff() {
        let provider = Arc::new(CountingProvider {
            fail_first: 2,
            ..CountingProvider::new()
        });
        let cache = TokenCache::new(provider.clone()).with_acquire_backoff(Duration::from_millis(1));

        assert_eq!(cache.token().await.unwrap(), "token-3");
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn test_acquisition_gives_up_after_bounded_attempts() {
        let provider = Arc::new(CountingProvider {
            fail_first: 10,
            ..CountingProvider::new()
        });
        let cache = TokenCache::new(provider.clone()).with_acquire_backoff(Duration::from_millis(1));

        assert!(cache.token().await.is_err());
        assert_eq!(provider.calls(), ACQUIRE_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_bad_credentials_not_retried() {
        let provider = Arc::new(CountingProvider {
            fail_first: 10,
            failure: UpstreamError::Unauthorized("invalid_client".into()),
            ..CountingProvider::new()
        });
        let cache = TokenCache::new(provider.clone()).with_acquire_backoff(Duration::from_millis(1));

        assert!(matches!(cache.token().await, Err(UpstreamError::Unauthorized(_))));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_only_drops_matching_token() {
        let provider = Arc::new(CountingProvider::new());
        let cache = TokenCache::new(provider.clone());

        let first = cache.token().await.unwrap();
        cache.invalidate("some-other-token").await;
        assert_eq!(cache.token().await.unwrap(), first);

        cache.invalidate(&first).await;
        assert_eq!(cache.token().await.unwrap(), "token-2");
    }

    #[tokio::test]
    async fn test_expired_token_is_replaced() {
        // Lifetime shorter than the safety margin expires immediately
        let provider = Arc::new(CountingProvider {
            expires_in: Duration::from_secs(30),
            ..CountingProvider::new()
        });
        let cache = TokenCache::new(provider.clone());

        assert_eq!(cache.token().await.unwrap(), "token-1");
        assert_eq!(cache.token().await.unwrap(), "token-2");
    }

    #[tokio::test]
    async fn test_refresh_replaces_token() {
        let provider = Arc::new(CountingProvider::new());
        let cache = TokenCache::new(provider.clone());

        assert_eq!(cache.token().await.unwrap(), "token-1");
        cache.refresh().await.unwrap();
        assert_eq!(cache.token().await.unwrap(), "token-2");
    }

    // ========================================
    // Client-credentials grant over HTTP
    // ========================================

    /// "my-id:my-secret" in Basic form
    const EXPECTED_BASIC: &str = "Basic bXktaWQ6bXktc2VjcmV0";

    async fn fake_accounts(
        headers: axum::http::HeaderMap,
        axum::Form(form): axum::Form<std::collections::HashMap<String, String>>,
    ) -> axum::response::Response {
        use axum::response::IntoResponse;

        let authorized = headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            == Some(EXPECTED_BASIC);
        if !authorized {
            return axum::http::StatusCode::UNAUTHORIZED.into_response();
        }
        if form.get("grant_type").map(String::as_str) != Some("client_credentials") || form.len() != 1 {
            return axum::http::StatusCode::BAD_REQUEST.into_response();
        }
        axum::Json(serde_json::json!({
            "access_token": "granted-token",
            "token_type": "Bearer",
            "expires_in": 1800
        }))
        .into_response()
    }

    async fn spawn_accounts_server() -> String {
        let app = axum::Router::new().route("/api/token", axum::routing::post(fake_accounts));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{}/api/token", addr)
    }

    #[tokio::test]
    async fn test_client_credentials_grant_sends_basic_auth_and_form() {
        let token_url = spawn_accounts_server().await;
        let provider = ClientCredentialsProvider::new(Client::new(), "my-id".to_string(), "my-secret".to_string())
            .with_token_url(token_url);

        let token = provider.fetch_token().await.unwrap();

        assert_eq!(
            token,
            AccessToken {
                value: "granted-token".to_string(),
                expires_in: Duration::from_secs(1800),
            }
        );
    }

    #[tokio::test]
    async fn test_client_credentials_wrong_secret_is_unauthorized() {
        let token_url = spawn_accounts_server().await;
        let provider = ClientCredentialsProvider::new(Client::new(), "my-id".to_string(), "wrong".to_string())
            .with_token_url(token_url);

        assert!(matches!(provider.fetch_token().await, Err(UpstreamError::Unauthorized(_))));
    }
}
