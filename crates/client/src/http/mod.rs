//! Backend API client with the interceptor chain.
//!
//! Every call goes through [`ApiClient::execute`]:
//!
//! 1. The stored bearer token is read fresh for each attempt and attached.
//! 2. A 401 on a session request tears the session down and returns
//!    [`ClientError::SessionExpired`] carrying a login redirect. Never retried.
//! 3. A missing response or a 5xx is retried with linear backoff.
//! 4. Any other status is returned as [`ClientError::Rejected`].

mod request;
mod retry;
mod transport;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, error, instrument, warn};
use url::Url;

pub use request::{ApiRequest, ApiResponse, Method, RequestAuth, RequestBody};
pub use retry::{Attempt, Disposition, RetryPolicy};
pub use transport::{ReqwestTransport, Transport};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result, add_breadcrumb};
use crate::navigation::{LoginRedirect, Navigator};
use crate::store::SharedState;

/// A failed attempt that may be retried.
struct TransientFailure {
    status: Option<u16>,
    message: String,
    detail: Option<String>,
}

/// Configured API client shared by every manager.
///
/// Cheap to clone.
#[derive(Clone)]
pub struct ApiClient {
    config: Arc<ClientConfig>,
    transport: Arc<dyn Transport>,
    state: Arc<SharedState>,
    navigator: Arc<Navigator>,
    policy: RetryPolicy,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.config.base_url.as_str())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    #[must_use]
    pub fn new(
        config: Arc<ClientConfig>,
        transport: Arc<dyn Transport>,
        state: Arc<SharedState>,
        navigator: Arc<Navigator>,
    ) -> Self {
        let policy = RetryPolicy::from(config.retry);
        Self {
            config,
            transport,
            state,
            navigator,
            policy,
        }
    }

    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Send a request through the interceptor chain.
    ///
    /// # Errors
    ///
    /// - `SessionExpired` on a 401 for a session request
    /// - `Transient` once retries are exhausted
    /// - `Rejected` for any other non-2xx status
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let url = self.url_for(request)?;
        let mut attempt = Attempt::FIRST;

        loop {
            let failure = match self.submit(request, url.clone()).await? {
                Ok(response) => return Ok(response),
                Err(failure) => failure,
            };

            let next = request
                .retry
                .then(|| self.policy.next_retry(attempt))
                .flatten();
            let Some(next) = next else {
                error!(
                    attempts = attempt.number(),
                    status = ?failure.status,
                    error = %failure.message,
                    "Request failed after retries"
                );
                return Err(ClientError::Transient {
                    status: failure.status,
                    attempts: attempt.number(),
                    message: failure.message,
                    detail: failure.detail,
                });
            };

            let delay = self.policy.delay_for(next.retries());
            warn!(
                attempt = attempt.number(),
                retry = next.retries(),
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                status = ?failure.status,
                error = %failure.message,
                "Transient failure, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt = next;
        }
    }

    /// Send a request and decode the JSON body.
    ///
    /// # Errors
    ///
    /// Anything [`Self::execute`] returns, plus `Decode` for an unexpected body.
    pub async fn fetch<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T> {
        let response = self.execute(request).await?;
        Ok(response.decode()?)
    }

    /// Send a request and ignore the body.
    ///
    /// # Errors
    ///
    /// Anything [`Self::execute`] returns.
    pub async fn send(&self, request: &ApiRequest) -> Result<()> {
        self.execute(request).await.map(drop)
    }

    /// One attempt. The outer `Result` is terminal; the inner one separates
    /// success from a retryable failure.
    async fn submit(
        &self,
        request: &ApiRequest,
        url: Url,
    ) -> Result<std::result::Result<ApiResponse, TransientFailure>> {
        let token = match &request.auth {
            RequestAuth::Session => self.state.credentials().token()?,
            RequestAuth::Anonymous => None,
            RequestAuth::Bearer(token) => Some(token.clone()),
        };

        let response = match self.transport.send(request, url, token.as_ref()).await {
            Ok(response) => response,
            Err(e) => {
                return Ok(Err(TransientFailure {
                    status: None,
                    message: e.to_string(),
                    detail: None,
                }));
            }
        };

        match Disposition::of(response.status) {
            Disposition::Success => Ok(Ok(response)),
            Disposition::Unauthorized if request.uses_session() => Err(self.expire_session()),
            Disposition::Unauthorized | Disposition::Rejected => {
                let detail = response.detail();
                debug!(status = response.status, detail = ?detail, "Request rejected");
                Err(ClientError::Rejected {
                    status: response.status,
                    detail,
                })
            }
            Disposition::Retryable => Ok(Err(TransientFailure {
                status: Some(response.status),
                message: format!("HTTP {}", response.status),
                detail: response.detail(),
            })),
        }
    }

    /// Clear the session after a 401 and decide where to send the user.
    fn expire_session(&self) -> ClientError {
        if let Err(e) = self.state.end_session() {
            error!(error = %e, "Failed to clear credentials after 401");
        }
        let redirect = self.navigator.login_redirect();
        let location = redirect.as_ref().map(LoginRedirect::location);
        warn!(redirect = location.as_deref(), "Session expired");
        add_breadcrumb("auth", "Session expired", None);
        ClientError::SessionExpired { redirect }
    }

    fn url_for(&self, request: &ApiRequest) -> Result<Url> {
        let mut url = self.config.endpoint(&request.path)?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }
        Ok(url)
    }
}
