//! Shared HTTP client infrastructure for HTTP-based providers
//!
//! One `reqwest::Client` is configured once per process and shared by every
//! backend. Each call is a single attempt: retry policy belongs to the
//! orchestrator, which treats backend failures as fatal to the run.

use dealmemo_utils::error::LlmError;
use dealmemo_utils::redaction::redact_error_message;
use once_cell::sync::OnceCell;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default maximum HTTP timeout (30 minutes); per-call timeouts are clamped to it
const DEFAULT_MAX_HTTP_TIMEOUT: Duration = Duration::from_secs(1800);

/// Default connect timeout (30 seconds)
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

static SHARED: OnceCell<Arc<HttpClient>> = OnceCell::new();

/// Shared HTTP client for providers
#[derive(Debug, Clone)]
pub(crate) struct HttpClient {
    client: Client,
    max_timeout: Duration,
}

impl HttpClient {
    /// Process-wide client, built on first use.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the client cannot be constructed
    pub fn shared() -> Result<Arc<Self>, LlmError> {
        SHARED
            .get_or_try_init(|| Self::with_max_timeout(DEFAULT_MAX_HTTP_TIMEOUT).map(Arc::new))
            .cloned()
    }

    /// Create a new HTTP client with a custom maximum timeout
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the client cannot be constructed
    pub fn with_max_timeout(max_timeout: Duration) -> Result<Self, LlmError> {
        let client = Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| {
                LlmError::Misconfiguration(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            max_timeout,
        })
    }

    /// Start a POST request on the shared connection pool.
    pub fn post(&self, url: &str) -> RequestBuilder {
        self.client.post(url)
    }

    /// Execute an HTTP request exactly once.
    ///
    /// The per-request timeout is `min(request_timeout, max_timeout)`.
    ///
    /// # Errors
    ///
    /// - `LlmError::ProviderAuth` for 401/403
    /// - `LlmError::ProviderQuota` for 429
    /// - `LlmError::Transport` for other 4xx and network errors
    /// - `LlmError::ProviderOutage` for 5xx
    /// - `LlmError::Timeout` when the request exceeds its time bound
    pub async fn execute(
        &self,
        request_builder: RequestBuilder,
        request_timeout: Duration,
        provider_name: &str,
    ) -> Result<Response, LlmError> {
        let effective_timeout = request_timeout.min(self.max_timeout);

        let request = request_builder
            .timeout(effective_timeout)
            .build()
            .map_err(|e| {
                LlmError::Transport(format!(
                    "Failed to build request: {}",
                    redact_error_message(&e.to_string())
                ))
            })?;

        debug!(
            provider = provider_name,
            timeout_secs = effective_timeout.as_secs(),
            "Executing HTTP request"
        );

        match self.client.execute(request).await {
            Ok(response) => {
                let status = response.status();
                if status.is_client_error() || status.is_server_error() {
                    let error = map_status_error(status, provider_name);
                    warn!(
                        provider = provider_name,
                        status = status.as_u16(),
                        "Provider returned error status"
                    );
                    return Err(error);
                }
                Ok(response)
            }
            Err(e) if e.is_timeout() => Err(LlmError::Timeout {
                duration: effective_timeout,
            }),
            Err(e) => {
                let message = redact_error_message(&e.to_string());
                warn!(provider = provider_name, error = %message, "HTTP request failed");
                Err(LlmError::Transport(format!(
                    "{} request failed: {}",
                    provider_name, message
                )))
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn max_timeout(&self) -> Duration {
        self.max_timeout
    }
}

/// Map HTTP error status codes to `LlmError` variants
///
/// - 401/403 → `LlmError::ProviderAuth`
/// - 429 → `LlmError::ProviderQuota`
/// - 5xx → `LlmError::ProviderOutage`
/// - Other 4xx → `LlmError::Transport`
pub(crate) fn map_status_error(status: StatusCode, provider_name: &str) -> LlmError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::ProviderAuth(format!(
            "{} authentication failed: {}",
            provider_name, status
        )),
        StatusCode::TOO_MANY_REQUESTS => {
            LlmError::ProviderQuota(format!("{} rate limit exceeded: {}", provider_name, status))
        }
        s if s.is_server_error() => LlmError::ProviderOutage(format!(
            "{} returned server error: {}",
            provider_name, status
        )),
        _ => LlmError::Transport(format!(
            "{} returned client error: {}",
            provider_name, status
        )),
    }
}

/// Decode a JSON response body, mapping failures to `Transport`.
pub(crate) async fn decode_json<T: serde::de::DeserializeOwned>(
    response: Response,
    provider_name: &str,
) -> Result<T, LlmError> {
    response.json::<T>().await.map_err(|e| {
        LlmError::Transport(format!(
            "Failed to parse {} response: {}",
            provider_name,
            redact_error_message(&e.to_string())
        ))
    })
}
