/// The server-held secret that is attached to every outbound request.
///
/// Credentials are looked up on every request rather than cached at startup, so rotating the
/// environment of a running process (or a test substituting its own source) takes effect
/// immediately.
use std::fmt;

/// Environment variable holding the upstream API key.
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

/// A non-empty, trimmed bearer secret. The `Debug` impl never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Trims `raw` and returns `None` if nothing is left.
    pub fn from_raw(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_owned()))
        }
    }

    /// The value for an `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Somewhere a credential can be read from at request time.
pub trait CredentialSource: fmt::Debug + Send + Sync {
    fn credential(&self) -> Option<Credential>;
}

/// Reads the credential from a process environment variable on every call.
#[derive(Debug, Clone)]
pub struct EnvCredential {
    var: String,
}

impl EnvCredential {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    pub fn var(&self) -> &str {
        &self.var
    }
}

impl Default for EnvCredential {
    fn default() -> Self {
        Self::new(API_KEY_VAR)
    }
}

impl CredentialSource for EnvCredential {
    fn credential(&self) -> Option<Credential> {
        std::env::var(&self.var)
            .ok()
            .and_then(|raw| Credential::from_raw(&raw))
    }
}

/// A fixed credential, or none at all. Mostly useful in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticCredential(Option<Credential>);

impl StaticCredential {
    pub fn new(raw: &str) -> Self {
        Self(Credential::from_raw(raw))
    }

    pub fn missing() -> Self {
        Self(None)
    }
}

impl CredentialSource for StaticCredential {
    fn credential(&self) -> Option<Credential> {
        self.0.clone()
    }
}
