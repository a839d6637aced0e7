//! Resilient HTTP transport for the Microsoft Graph workbook API.
//!
//! Every remote call made by `livesheet` goes through a
//! [`ResilientTransport`]. It classifies failures into a small taxonomy
//! ([`FailureKind`]) and retries the transient ones with bounded
//! exponential backoff, honoring `Retry-After` when the service sends it.
//!
//! # Architecture
//!
//! ```text
//! livesheet-graph
//!     └── ResilientTransport (this crate)
//!           └── HttpClient (ReqwestClient, or a test double)
//!                 └── HTTPS to graph.microsoft.com
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use graph_transport::{BearerToken, CallOptions, HttpRequest, ResilientTransport, RetryPolicy};
//!
//! # async fn example() -> graph_transport::Result<()> {
//! let transport = ResilientTransport::new(
//!     "https://graph.microsoft.com/v1.0",
//!     RetryPolicy::default(),
//!     Duration::from_secs(60),
//! )?;
//!
//! let token = BearerToken::new("eyJ0eXAi...");
//! let request = HttpRequest::get(transport.url("/me/drive"));
//! let response = transport
//!     .execute(request, &token, &CallOptions::default().with_timeout(Duration::from_secs(120)))
//!     .await?;
//! println!("{}", response.status);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod policy;
pub mod request;
pub mod transport;

pub use client::{HttpClient, ReqwestClient};
pub use error::{FailureKind, NetworkError, Result, TransportError};
pub use policy::RetryPolicy;
pub use request::{BearerToken, HttpRequest, HttpResponse, Method, RequestBody};
pub use transport::{new_client_request_id, CallOptions, ResilientTransport};
