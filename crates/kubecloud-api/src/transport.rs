// Shared transport configuration for building the reqwest client.

use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};

/// Settings applied to every HTTP request.
///
/// Request deadlines are enforced per call by [`crate::Deadline`]; the
/// timeout here only bounds connection establishment.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub connect_timeout: Duration,
    pub user_agent: String,
    pub default_headers: Vec<(String, String)>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            user_agent: concat!("kubecloud/", env!("CARGO_PKG_VERSION")).into(),
            default_headers: Vec::new(),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` that sends and accepts JSON by default.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        for (name, value) in &self.default_headers {
            let name = reqwest::header::HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| crate::Error::Client(format!("invalid header name {name:?}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| crate::Error::Client(format!("invalid header value: {e}")))?;
            headers.insert(name, value);
        }

        reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .user_agent(&self.user_agent)
            .default_headers(headers)
            .build()
            .map_err(|e| crate::Error::Client(e.to_string()))
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }
}
