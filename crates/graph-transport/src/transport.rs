//! Retrying executor for single logical requests.

use std::time::Duration;

use tokio::time::Instant;

use crate::client::{HttpClient, ReqwestClient};
use crate::error::{FailureKind, Result, TransportError};
use crate::policy::RetryPolicy;
use crate::request::{BearerToken, HttpRequest, HttpResponse};

/// Per-call overrides.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Replaces the transport's default policy for this call
    pub policy: Option<RetryPolicy>,
    /// Stop retrying, and abandon an in-flight attempt, once this instant passes
    pub deadline: Option<Instant>,
    /// Sent as `client-request-id`; a random id is generated when absent
    pub client_request_id: Option<String>,
}

impl CallOptions {
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Deadline `timeout` from now
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_client_request_id(mut self, id: impl Into<String>) -> Self {
        self.client_request_id = Some(id.into());
        self
    }
}

/// Random 128-bit correlation id, hex encoded.
pub fn new_client_request_id() -> String {
    format!("{:032x}", rand::random::<u128>())
}

/// Executes requests and retries transient failures with backoff.
///
/// Stateless across calls apart from the immutable default policy. For
/// requests marked non-idempotent, only failures that guarantee the request
/// was not applied (`Locked`, `Throttled`) are retried; a server fault or a
/// lost connection is surfaced immediately so the caller can verify the
/// remote state before repeating the request.
#[derive(Debug, Clone)]
pub struct ResilientTransport<C = ReqwestClient> {
    client: C,
    base_url: String,
    policy: RetryPolicy,
}

impl ResilientTransport<ReqwestClient> {
    /// Transport over a fresh `reqwest` client.
    pub fn new(
        base_url: impl Into<String>,
        policy: RetryPolicy,
        request_timeout: Duration,
    ) -> Result<Self> {
        Ok(Self::with_client(
            ReqwestClient::new(request_timeout)?,
            base_url,
            policy,
        ))
    }
}

impl<C: HttpClient> ResilientTransport<C> {
    pub fn with_client(client: C, base_url: impl Into<String>, policy: RetryPolicy) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            policy,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a path relative to the API base.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Execute one logical request, retrying transient failures per policy.
    pub async fn execute(
        &self,
        mut request: HttpRequest,
        token: &BearerToken,
        options: &CallOptions,
    ) -> Result<HttpResponse> {
        let policy = options.policy.as_ref().unwrap_or(&self.policy);
        let max_attempts = policy.attempts();

        let client_request_id = options
            .client_request_id
            .clone()
            .unwrap_or_else(new_client_request_id);
        request
            .headers
            .push(("client-request-id".into(), client_request_id.clone()));
        request
            .headers
            .push(("return-client-request-id".into(), "true".into()));

        let mut attempt: u32 = 0;
        let mut last_kind: Option<FailureKind> = None;
        let mut last_request_id: Option<String> = None;

        loop {
            attempt += 1;

            let sent = match options.deadline {
                Some(deadline) => {
                    match tokio::time::timeout_at(deadline, self.client.send(&request, token)).await
                    {
                        Ok(sent) => sent,
                        Err(_) => {
                            tracing::warn!(
                                method = %request.method,
                                url = %request.url,
                                attempt,
                                %client_request_id,
                                "deadline exceeded while request was in flight"
                            );
                            return Err(TransportError::Timeout {
                                attempts: attempt,
                                last_kind,
                                request_id: last_request_id,
                            });
                        }
                    }
                }
                None => self.client.send(&request, token).await,
            };

            let (kind, status, message, retry_after) = match sent {
                Ok(response) => {
                    if let Some(id) = response.request_id() {
                        last_request_id = Some(id);
                    }
                    match FailureKind::classify_status(response.status) {
                        None => {
                            tracing::debug!(
                                method = %request.method,
                                url = %request.url,
                                status = response.status,
                                attempt,
                                "request succeeded"
                            );
                            return Ok(response);
                        }
                        Some(kind) => (
                            kind,
                            Some(response.status),
                            response.error_summary(),
                            response.retry_after(),
                        ),
                    }
                }
                Err(err) => (FailureKind::NetworkFault, None, err.to_string(), None),
            };
            last_kind = Some(kind);

            let retryable =
                policy.should_retry(kind) && (request.idempotent || !kind.outcome_unknown());

            if !retryable || attempt >= max_attempts {
                tracing::warn!(
                    method = %request.method,
                    url = %request.url,
                    %kind,
                    attempt,
                    request_id = last_request_id.as_deref().unwrap_or("-"),
                    %client_request_id,
                    "{message}"
                );
                return Err(TransportError::Remote {
                    kind,
                    status,
                    message,
                    request_id: last_request_id,
                    attempts: attempt,
                });
            }

            let hint = if policy.honor_retry_after { retry_after } else { None };
            let delay = policy.delay_before_retry(attempt, hint);

            if let Some(deadline) = options.deadline {
                if Instant::now() + delay >= deadline {
                    tracing::warn!(
                        method = %request.method,
                        url = %request.url,
                        %kind,
                        attempt,
                        ?delay,
                        "next retry would pass the deadline"
                    );
                    return Err(TransportError::Timeout {
                        attempts: attempt,
                        last_kind,
                        request_id: last_request_id,
                    });
                }
            }

            tracing::info!(
                method = %request.method,
                url = %request.url,
                %kind,
                attempt,
                ?delay,
                "retrying after transient failure"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Execute and decode a JSON response body.
    pub async fn execute_json<T: serde::de::DeserializeOwned>(
        &self,
        request: HttpRequest,
        token: &BearerToken,
        options: &CallOptions,
    ) -> Result<T> {
        self.execute(request, token, options).await?.json()
    }
}
