//! The outbound side of the proxy
//!
//! Handlers hand a fully built upstream request to a [`HttpClient`] and get the upstream's
//! response back, unread. Production uses a hyper client over TLS; tests plug in a recorder.
use async_trait::async_trait;
use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use hyper_tls::HttpsConnector;
use hyper_util::client::legacy::{Client, connect::HttpConnector};
use hyper_util::rt::TokioExecutor;

/// Any failure to get a response out of the upstream at all.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type HyperClient = Client<HttpsConnector<HttpConnector>, axum::body::Body>;

#[async_trait]
pub trait HttpClient: std::fmt::Debug {
    /// Sends one request upstream. Upstream error statuses are `Ok`; only transport failures
    /// are `Err`.
    async fn send(&self, req: Request) -> Result<Response, BoxError>;
}

#[async_trait]
impl HttpClient for HyperClient {
    async fn send(&self, req: Request) -> Result<Response, BoxError> {
        let response = self.request(req).await?;
        Ok(response.into_response())
    }
}

/// Builds the upstream client. Plain `http` upstreams are allowed alongside `https` so the proxy
/// can be pointed at a local stand-in; idle connections are reused with hyper's defaults.
pub fn create_hyper_client() -> HyperClient {
    let mut http = HttpConnector::new();
    http.enforce_http(false);
    http.set_nodelay(true);
    tracing::debug!("Creating upstream client (tcp nodelay, http and https)");

    Client::builder(TokioExecutor::new()).build(HttpsConnector::new_with_connector(http))
}
