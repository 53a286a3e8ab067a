// HTTP client for the KubeCloud REST API.
//
// Wraps `reqwest::Client` with base-URL joining, JSON bodies, and
// structured error extraction. Deadlines are applied by the caller.

use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::request::{RawResponse, Request};
use crate::transport::TransportConfig;

/// Error body shape: `{"message": "..."}` (other fields ignored).
#[derive(serde::Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Raw HTTP client for the cluster API.
///
/// Endpoints are appended verbatim to the base URL, so a base of
/// `https://host/api` and an endpoint of `/clusters` yield
/// `https://host/api/clusters`.
pub struct HttpClient {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpClient {
    /// Build a client from a base URL and transport settings.
    pub fn new(base_url: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let base_url = Url::parse(base_url)?;
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Wrap a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let endpoint = endpoint.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{endpoint}"))?)
    }

    /// Send a request and return the decoded JSON body.
    ///
    /// Non-2xx responses become [`Error::Http`]; the message is taken from
    /// the body's `message` field when the server provides one.
    pub async fn send(&self, request: &Request) -> Result<RawResponse, Error> {
        let url = self.url(&request.endpoint)?;
        debug!("{} {url}", request.method);

        let mut builder = self.http.request(request.method.as_reqwest(), url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        trace!(status = status.as_u16(), "response received");

        if !status.is_success() {
            return Err(Self::parse_error(status, resp).await);
        }

        let text = resp.text().await?;
        let body = if text.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&text).map_err(|e| {
                let preview: String = text.chars().take(200).collect();
                Error::Deserialization {
                    message: format!("Invalid JSON response: {e} (body preview: {preview:?})"),
                    body: text.clone(),
                }
            })?
        };

        Ok(RawResponse {
            status: status.as_u16(),
            body,
        })
    }

    async fn parse_error(status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        let raw = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&raw)
            .ok()
            .and_then(|b| b.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| {
                format!(
                    "HTTP {}: {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown Status")
                )
            });

        Error::Http {
            status: status.as_u16(),
            message,
        }
    }
}
