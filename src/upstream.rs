/// The single API host that requests are forwarded to, together with where its credential comes
/// from.
use crate::credential::{CredentialSource, EnvCredential};
use bon::Builder;
use std::sync::Arc;
use url::Url;

/// The upstream used when none is configured.
pub const DEFAULT_UPSTREAM: &str = "https://api.chatanywhere.tech";

/// An upstream is a base URL plus a credential source.
///
/// Paths are joined onto the base URL, so a base of `https://host/prefix/` forwards
/// `/v1/models` to `https://host/prefix/v1/models`.
#[derive(Debug, Clone, Builder)]
pub struct Upstream {
    pub url: Url,
    #[builder(default = Arc::new(EnvCredential::default()) as Arc<dyn CredentialSource>)]
    pub credentials: Arc<dyn CredentialSource>,
}

impl Upstream {
    /// The outbound URL for a local route path such as `/v1/models`.
    pub fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        self.url.join(path.strip_prefix('/').unwrap_or(path))
    }

    /// The base URL as reported by the health route, without the trailing slash `Url` adds.
    pub fn display_url(&self) -> &str {
        self.url.as_str().trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::StaticCredential;
    use rstest::rstest;

    #[test]
    fn test_default_upstream() {
        let upstream = Upstream::builder()
            .url(DEFAULT_UPSTREAM.parse().unwrap())
            .build();
        assert_eq!(upstream.display_url(), "https://api.chatanywhere.tech");
        assert_eq!(
            upstream.endpoint("/v1/chat/completions").unwrap().as_str(),
            "https://api.chatanywhere.tech/v1/chat/completions"
        );
    }

    #[rstest]
    #[case("https://api.example.com", "/v1/models", "https://api.example.com/v1/models")]
    #[case("https://api.example.com/", "/v1/models", "https://api.example.com/v1/models")]
    #[case(
        "http://127.0.0.1:8080/openai/",
        "/v1/chat/completions",
        "http://127.0.0.1:8080/openai/v1/chat/completions"
    )]
    fn test_endpoint_joins_paths(#[case] base: &str, #[case] path: &str, #[case] expected: &str) {
        let upstream = Upstream::builder()
            .url(base.parse().unwrap())
            .credentials(Arc::new(StaticCredential::missing()))
            .build();
        assert_eq!(upstream.endpoint(path).unwrap().as_str(), expected);
    }
}
