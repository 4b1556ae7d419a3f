//! HTTP transport for the catalog API.

use reqwest::{Client, Method};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::error::TransportError;

/// A fully built request, relative to the transport's base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
  pub method: Method,
  pub path: String,
  pub body: Option<Value>,
}

/// Executes one request and returns the parsed JSON body.
///
/// The query client only depends on this trait, so tests can swap in an
/// in-memory implementation.
pub trait Transport: Send + Sync + 'static {
  fn execute(&self, request: &Request)
    -> impl Future<Output = Result<Value, TransportError>> + Send;
}

/// reqwest-backed transport rooted at a fixed base URL.
#[derive(Clone, Debug)]
pub struct HttpTransport {
  client: Client,
  base_url: Url,
}

impl HttpTransport {
  pub fn new(base_url: Url, timeout: Duration) -> reqwest::Result<Self> {
    let client = Client::builder().timeout(timeout).build()?;
    Ok(Self::with_client(client, base_url))
  }

  pub fn with_client(client: Client, base_url: Url) -> Self {
    Self { client, base_url }
  }

  /// Join a request path (which may carry a query string) onto the base URL.
  fn url_for(&self, path: &str) -> String {
    format!(
      "{}/{}",
      self.base_url.as_str().trim_end_matches('/'),
      path.trim_start_matches('/')
    )
  }
}

impl Transport for HttpTransport {
  async fn execute(&self, request: &Request) -> Result<Value, TransportError> {
    let url = self.url_for(&request.path);
    debug!("{} {}", request.method, url);

    let mut builder = self.client.request(request.method.clone(), &url);
    if let Some(body) = &request.body {
      builder = builder.json(body);
    }

    let response = builder.send().await.map_err(|e| {
      warn!("{} {} failed: {}", request.method, url, e);
      if e.is_timeout() {
        TransportError::timeout()
      } else {
        TransportError::network()
      }
    })?;

    let status = response.status();
    let text = response.text().await.map_err(|e| {
      warn!("Failed to read response body from {}: {}", url, e);
      if e.is_timeout() {
        TransportError::timeout()
      } else {
        TransportError::network()
      }
    })?;

    debug!("{} {} -> {}", request.method, url, status.as_u16());

    if !status.is_success() {
      return Err(TransportError::from_response(status.as_u16(), text));
    }

    if text.trim().is_empty() {
      return Ok(Value::Null);
    }

    serde_json::from_str(&text).map_err(|e| {
      warn!("Invalid JSON from {}: {}", url, e);
      TransportError {
        status: Some(status.as_u16()),
        message: "invalid response body".to_string(),
        raw_body: Some(text),
      }
    })
  }
}
