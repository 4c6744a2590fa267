use anyhow::{bail, Result};
use std::path::PathBuf;
use std::time::Duration;

use crate::dispatch::Limits;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Dataset file served at startup and re-read on admin reload.
    pub data_path: PathBuf,
    /// Bearer token required on tool endpoints when set.
    pub api_token: Option<String>,
    /// Token for admin endpoints; admin endpoints refuse everything when unset.
    pub admin_token: Option<String>,
    pub request_timeout: Duration,
    pub limits: Limits,
    /// Comma-separated CORS origins; any origin when unset.
    pub cors_allow_origin: Option<String>,
}

impl ServerConfig {
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            api_token: None,
            admin_token: None,
            request_timeout: Duration::from_millis(2_000),
            limits: Limits { default_limit: 20, max_limit: 100 },
            cors_allow_origin: None,
        }
    }

    /// Reject settings that could only fail later, at query time.
    pub fn validate(&self) -> Result<()> {
        if !self.data_path.is_file() {
            bail!("dataset file {} does not exist", self.data_path.display());
        }
        if self.request_timeout.is_zero() {
            bail!("request timeout must be positive");
        }
        if self.limits.default_limit == 0 || self.limits.max_limit < self.limits.default_limit {
            bail!(
                "limits must satisfy 1 <= default ({}) <= max ({})",
                self.limits.default_limit,
                self.limits.max_limit
            );
        }
        for (name, token) in [("api token", &self.api_token), ("admin token", &self.admin_token)] {
            if token.as_deref().is_some_and(|t| t.trim().is_empty()) {
                bail!("{name} is set but empty");
            }
        }
        Ok(())
    }
}
