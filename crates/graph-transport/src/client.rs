//! The HTTP seam: one request in, one raw response out.

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;

use crate::error::{NetworkError, Result, TransportError};
use crate::request::{BearerToken, HttpRequest, HttpResponse, Method, RequestBody};

/// Sends a single HTTP request. Implementations do not retry.
///
/// Any HTTP status, success or not, is an `Ok` response; `Err` is reserved
/// for failures where no response was received.
pub trait HttpClient: Send + Sync {
    fn send(
        &self,
        request: &HttpRequest,
        token: &BearerToken,
    ) -> impl Future<Output = std::result::Result<HttpResponse, NetworkError>> + Send;
}

/// [`HttpClient`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    inner: reqwest::Client,
}

impl ReqwestClient {
    /// Build a client with a per-request timeout.
    pub fn new(request_timeout: Duration) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| TransportError::InvalidRequest(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { inner })
    }

    /// Wrap an existing `reqwest` client.
    pub fn from_client(inner: reqwest::Client) -> Self {
        Self { inner }
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Patch => reqwest::Method::PATCH,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn network_error(e: reqwest::Error) -> NetworkError {
    NetworkError {
        message: e.to_string(),
        timed_out: e.is_timeout(),
    }
}

impl HttpClient for ReqwestClient {
    async fn send(
        &self,
        request: &HttpRequest,
        token: &BearerToken,
    ) -> std::result::Result<HttpResponse, NetworkError> {
        let mut builder = self
            .inner
            .request(to_reqwest_method(request.method), request.url.as_str())
            .bearer_auth(token.as_str());

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match &request.body {
            Some(RequestBody::Json(value)) => builder.json(value),
            Some(RequestBody::Bytes { content_type, data }) => builder
                .header(reqwest::header::CONTENT_TYPE, content_type.as_str())
                .body(data.clone()),
            // The workbook API rejects bodiless POSTs without a length.
            None if request.method == Method::Post => {
                builder.header(reqwest::header::CONTENT_LENGTH, "0")
            }
            None => builder,
        };

        tracing::trace!(method = %request.method, url = %request.url, "sending request");
        let response = builder.send().await.map_err(network_error)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body: Bytes = response.bytes().await.map_err(network_error)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Accept one connection, read the request head, reply with `raw`.
    async fn serve_once(listener: TcpListener, raw: &'static str) -> String {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            buf.extend_from_slice(&chunk[..n]);
            if n == 0 || buf.windows(4).any(|w| w == b"\r\n\r\n") {
                break;
            }
        }
        stream.write_all(raw.as_bytes()).await.unwrap();
        stream.shutdown().await.unwrap();
        String::from_utf8_lossy(&buf).into_owned()
    }

    #[tokio::test]
    async fn test_send_reports_status_and_headers() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(serve_once(
            listener,
            "HTTP/1.1 429 Too Many Requests\r\nRetry-After: 7\r\nrequest-id: abc-123\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{}",
        ));

        let client = ReqwestClient::new(Duration::from_secs(5)).unwrap();
        let request = HttpRequest::get(format!("http://{addr}/v1.0/me/drive"))
            .header("client-request-id", "cid-1");
        let response = client
            .send(&request, &BearerToken::new("tok"))
            .await
            .unwrap();

        assert_eq!(response.status, 429);
        assert_eq!(response.retry_after(), Some(Duration::from_secs(7)));
        assert_eq!(response.request_id().as_deref(), Some("abc-123"));
        assert_eq!(response.body.as_ref(), b"{}");

        let head = server.await.unwrap().to_ascii_lowercase();
        assert!(head.starts_with("get /v1.0/me/drive"));
        assert!(head.contains("authorization: bearer tok"));
        assert!(head.contains("client-request-id: cid-1"));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = ReqwestClient::new(Duration::from_secs(5)).unwrap();
        let result = client
            .send(
                &HttpRequest::get(format!("http://{addr}/")),
                &BearerToken::new("tok"),
            )
            .await;
        assert!(result.is_err());
    }
}
