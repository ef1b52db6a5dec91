//! Keyrelay - a credential-injecting forwarding proxy
//!
//! Requests to `/v1/models` and `/v1/chat/completions` are forwarded to a single upstream with a
//! server-held bearer credential attached. The upstream's status and body are relayed back to the
//! caller, re-encoded as JSON when the body parses as JSON and passed through raw otherwise.

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{Method, header};
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, instrument};

pub mod client;
pub mod credential;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod upstream;

use client::{HttpClient, HyperClient};
use handlers::{CHAT_COMPLETIONS_PATH, MODELS_PATH, chat_completions, health, list_models};
use upstream::Upstream;

/// Largest inbound request body accepted, 2 MiB.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// The application state containing the HTTP client and the upstream to forward to
#[derive(Clone, Debug)]
pub struct AppState<T: HttpClient> {
    pub http_client: T,
    pub upstream: Upstream,
}

impl AppState<HyperClient> {
    /// Create a new AppState with the default Hyper client
    pub fn new(upstream: Upstream) -> Self {
        let http_client = client::create_hyper_client();
        Self {
            http_client,
            upstream,
        }
    }
}

impl<T: HttpClient> AppState<T> {
    /// Create a new AppState with a custom HTTP client (useful for testing)
    pub fn with_client(upstream: Upstream, http_client: T) -> Self {
        Self {
            http_client,
            upstream,
        }
    }
}

/// Any origin may call the proxy, with the methods and headers an OpenAI client sends.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Build the main router for the proxy
/// This creates routes for:
/// - `/` - Health check
/// - `/v1/models` - Forwarded to the upstream as a GET
/// - `/v1/chat/completions` - Forwarded to the upstream as a POST
#[instrument(skip(state))]
pub fn build_router<T: HttpClient + Clone + Send + Sync + 'static>(state: AppState<T>) -> Router {
    info!("Building router for upstream {}", state.upstream.display_url());
    Router::new()
        .route("/", get(health))
        .route(MODELS_PATH, get(list_models))
        .route(CHAT_COMPLETIONS_PATH, post(chat_completions))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors_layer())
        .with_state(state)
}
