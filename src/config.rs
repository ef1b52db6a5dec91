//! Configuration parsing and validation for the proxy server
//!
//! Settings come from command-line arguments, falling back to environment variables. The
//! upstream credential is deliberately not part of this: it is read from the environment on
//! every request.
use anyhow::anyhow;
use clap::Parser;
use keyrelay::upstream::DEFAULT_UPSTREAM;
use url::Url;

#[derive(Debug, Clone, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// The port on which the proxy server will listen.
    #[arg(short = 'p', long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// The base URL requests are forwarded to.
    #[arg(short = 'u', long, env = "UPSTREAM_URL", default_value = DEFAULT_UPSTREAM)]
    pub upstream: Url,
}

impl Config {
    pub fn validate(self) -> Result<Self, anyhow::Error> {
        if !matches!(self.upstream.scheme(), "http" | "https") {
            return Err(anyhow!(
                "Upstream '{}' must use http or https",
                self.upstream
            ));
        }
        if self.upstream.host_str().is_none() {
            return Err(anyhow!("Upstream '{}' has no host", self.upstream));
        }
        Ok(self)
    }
}
