/// Response bodies produced by the proxy itself. Upstream bodies are never modelled: they are
/// relayed opaquely.
use serde::{Deserialize, Serialize};

/// The body of the health route.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HealthResponse {
    pub ok: bool,
    pub message: String,
    /// The upstream base URL requests are forwarded to.
    pub upstream: String,
}

impl HealthResponse {
    pub fn running(upstream: &str) -> Self {
        HealthResponse {
            ok: true,
            message: "Render backend proxy is running".into(),
            upstream: upstream.to_owned(),
        }
    }
}

/// The body of every error the proxy generates on its own account.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorBody {
    pub error: String,
}
