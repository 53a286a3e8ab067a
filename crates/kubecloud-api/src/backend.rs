// Dispatch seam between the real HTTP API and the simulated backend.
//
// Selected once at startup from configuration; callers never branch on
// mock mode themselves.

use crate::error::Error;
use crate::http::HttpClient;
use crate::mock::MockBackend;
use crate::request::{RawResponse, Request};

/// Where requests go.
pub enum Backend {
    Http(HttpClient),
    Mock(MockBackend),
}

impl Backend {
    /// Perform one round trip. No deadline is applied here.
    pub async fn dispatch(&self, request: &Request) -> Result<RawResponse, Error> {
        match self {
            Self::Http(client) => client.send(request).await,
            Self::Mock(mock) => mock.handle(request).await,
        }
    }

    pub fn is_mock(&self) -> bool {
        matches!(self, Self::Mock(_))
    }
}

impl From<HttpClient> for Backend {
    fn from(client: HttpClient) -> Self {
        Self::Http(client)
    }
}

impl From<MockBackend> for Backend {
    fn from(mock: MockBackend) -> Self {
        Self::Mock(mock)
    }
}
