// ── Request / response value types ──
//
// Backend-agnostic descriptions of a call and its outcome. Both the
// HTTP client and the simulated backend consume `Request` and produce
// `RawResponse`; the service layer decodes the body into typed payloads.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// HTTP verb for a request. Defaults to `GET`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub(crate) fn as_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Patch => reqwest::Method::PATCH,
            Self::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A single call against the API surface.
///
/// `endpoint` is relative to the backend's base (e.g. `/clusters/cluster-1`).
#[derive(Debug, Clone, Default)]
pub struct Request {
    pub method: Method,
    pub endpoint: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl Request {
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// A successful response, before typed decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    /// Decoded JSON body; `Null` when the server sent an empty body.
    pub body: serde_json::Value,
}

impl RawResponse {
    /// Decode the body into `T`, keeping the raw text for diagnostics.
    pub fn decode<T: DeserializeOwned>(self) -> Result<(u16, T), crate::Error> {
        let status = self.status;
        serde_json::from_value(self.body.clone())
            .map(|data| (status, data))
            .map_err(|e| crate::Error::Deserialization {
                message: format!("Invalid response payload: {e}"),
                body: self.body.to_string(),
            })
    }
}

/// Success outcome returned to callers: `{ data, status, message }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
    pub status: u16,
    pub message: String,
}

/// The server-side envelope wrapping every REST payload:
/// `{ "data": ..., "status": 200, "message": "Success" }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> ApiResponse<Envelope<T>> {
    /// Strip both the client and server envelopes, returning the payload.
    pub fn into_payload(self) -> T {
        self.data.data
    }
}
