//! Configuration for docusign-gate
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

/// docusign-gate - DocuSign consent gate and e-signature client
#[derive(Parser, Debug, Clone)]
#[command(name = "docusign-gate")]
#[command(about = "DocuSign consent gate and e-signature sidecar")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// DocuSign configuration
    #[command(flatten)]
    pub docusign: DocuSignArgs,

    /// Public base URL of the host application (used in OAuth and view return URLs)
    #[arg(long, env = "DOMAIN")]
    pub domain: String,

    /// Front-end origin allowed to frame embedded signing views
    #[arg(long, env = "FRONTEND_ORIGIN")]
    pub frontend_origin: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Outbound request timeout in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "30000")]
    pub request_timeout_ms: u64,
}

/// DocuSign OAuth client configuration
#[derive(Parser, Debug, Clone)]
pub struct DocuSignArgs {
    /// DocuSign account server URL (e.g. https://account-d.docusign.com)
    #[arg(long = "docusign-url", env = "DOCUSIGN_URL")]
    pub url: String,

    /// Integration key (OAuth client id)
    #[arg(long = "docusign-integration-key", env = "DOCUSIGN_INTEGRATION_KEY")]
    pub integration_key: String,

    /// Secret key (OAuth client secret)
    #[arg(long = "docusign-secret-key", env = "DOCUSIGN_SECRET_KEY", hide_env_values = true)]
    pub secret_key: String,
}

/// Everything the DocuSign client needs, passed in at construction.
#[derive(Debug, Clone)]
pub struct DocuSignConfig {
    /// Account server base URL, without trailing slash
    pub url: String,
    pub integration_key: String,
    pub secret_key: String,
    /// Host application's public base URL, without trailing slash
    pub domain: String,
    /// Origin allowed to embed signing views in a frame
    pub frontend_origin: String,
    pub request_timeout: Duration,
}

impl DocuSignConfig {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Build a config with the default request timeout. Trailing slashes are trimmed.
    pub fn new(
        url: impl Into<String>,
        integration_key: impl Into<String>,
        secret_key: impl Into<String>,
        domain: impl Into<String>,
        frontend_origin: impl Into<String>,
    ) -> Self {
        Self {
            url: trim_slash(url.into()),
            integration_key: integration_key.into(),
            secret_key: secret_key.into(),
            domain: trim_slash(domain.into()),
            frontend_origin: frontend_origin.into(),
            request_timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

fn trim_slash(mut s: String) -> String {
    while s.ends_with('/') {
        s.pop();
    }
    s
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

impl Args {
    /// Client configuration derived from the CLI/env arguments
    pub fn docusign_config(&self) -> DocuSignConfig {
        DocuSignConfig::new(
            self.docusign.url.clone(),
            self.docusign.integration_key.clone(),
            self.docusign.secret_key.clone(),
            self.domain.clone(),
            self.frontend_origin.clone(),
        )
        .with_timeout(Duration::from_millis(self.request_timeout_ms))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !is_http_url(&self.docusign.url) {
            return Err("DOCUSIGN_URL must be an http(s) URL".to_string());
        }
        if self.docusign.integration_key.trim().is_empty() {
            return Err("DOCUSIGN_INTEGRATION_KEY must not be empty".to_string());
        }
        if self.docusign.secret_key.trim().is_empty() {
            return Err("DOCUSIGN_SECRET_KEY must not be empty".to_string());
        }
        if !is_http_url(&self.domain) {
            return Err("DOMAIN must be an http(s) URL".to_string());
        }
        if !is_http_url(&self.frontend_origin) {
            return Err("FRONTEND_ORIGIN must be an http(s) URL".to_string());
        }
        if self.request_timeout_ms == 0 {
            return Err("REQUEST_TIMEOUT_MS must be greater than zero".to_string());
        }

        Ok(())
    }
}
