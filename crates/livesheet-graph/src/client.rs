//! Graph workbook client: configuration, per-call context and request plumbing.

use std::time::Duration;

use graph_transport::{
    BearerToken, CallOptions, HttpClient, HttpRequest, HttpResponse, ReqwestClient,
    ResilientTransport, RetryPolicy,
};
use livesheet_core::RangeAddress;
use serde::de::DeserializeOwned;
use tokio::time::Instant;

use crate::error::Result;

/// Default Graph API root
pub const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// Configuration for a [`GraphClient`].
#[derive(Debug, Clone)]
pub struct GraphConfig {
    /// API root, without a trailing slash. Default: Graph v1.0.
    pub base_url: String,
    /// Timeout for one HTTP attempt. Default: 60 seconds.
    pub request_timeout: Duration,
    /// Default retry policy for every call
    pub retry: RetryPolicy,
    /// Bounded window scanned for markers instead of the used range
    pub scan_window: Option<RangeAddress>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            base_url: GRAPH_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
            scan_window: None,
        }
    }
}

/// Per-call settings: the caller's bearer token plus transport overrides.
///
/// One context is normally used for one logical operation, so every request
/// it issues shares the same `client-request-id`.
#[derive(Debug, Clone)]
pub struct CallContext {
    pub token: BearerToken,
    pub options: CallOptions,
}

impl CallContext {
    pub fn new(token: impl Into<BearerToken>) -> Self {
        Self {
            token: token.into(),
            options: CallOptions::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.options.policy = Some(policy);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.options.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_client_request_id(mut self, id: impl Into<String>) -> Self {
        self.options.client_request_id = Some(id.into());
        self
    }
}

/// Handle for editing workbooks through the Graph API.
///
/// Holds no per-document state: every operation takes the document or
/// worksheet it acts on and re-reads whatever it needs from the live file.
#[derive(Debug, Clone)]
pub struct GraphClient<C = ReqwestClient> {
    transport: ResilientTransport<C>,
    config: GraphConfig,
}

impl GraphClient<ReqwestClient> {
    /// Create a client over HTTPS.
    pub fn new(config: GraphConfig) -> Result<Self> {
        let transport = ResilientTransport::new(
            config.base_url.clone(),
            config.retry.clone(),
            config.request_timeout,
        )?;
        Ok(Self { transport, config })
    }
}

impl<C: HttpClient> GraphClient<C> {
    /// Create a client over a custom [`HttpClient`].
    pub fn with_http_client(client: C, config: GraphConfig) -> Self {
        let transport =
            ResilientTransport::with_client(client, config.base_url.clone(), config.retry.clone());
        Self { transport, config }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn transport(&self) -> &ResilientTransport<C> {
        &self.transport
    }

    pub(crate) fn url(&self, path: &str) -> String {
        self.transport.url(path)
    }

    pub(crate) async fn send(&self, ctx: &CallContext, request: HttpRequest) -> Result<HttpResponse> {
        tracing::debug!(method = %request.method, url = %request.url, "graph call");
        Ok(self
            .transport
            .execute(request, &ctx.token, &ctx.options)
            .await?)
    }

    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        ctx: &CallContext,
        request: HttpRequest,
    ) -> Result<T> {
        Ok(self.send(ctx, request).await?.json()?)
    }
}
