//! Client configuration.

use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::{CloudError, Result};

/// Default server address (the service listens on port 5000).
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Absolute per-file upload cap in MB, independent of quota.
pub const DEFAULT_MAX_UPLOAD_MB: f64 = 100.0;

/// Settings shared by the HTTP layer and the session controller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    /// Root URL of the service
    pub base_url: String,
    /// Optional proxy URL (e.g. "http://proxy:8080" or "socks5://proxy:1080")
    pub proxy: Option<String>,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Background listing refresh period while the dashboard is shown
    pub refresh_interval: Duration,
    /// Pause between a successful confirmation and the switch to the login view
    pub redirect_delay: Duration,
    /// Pause between a successful upload and the data reload
    pub upload_refresh_delay: Duration,
    /// How long a notification stays visible
    pub notice_ttl: Duration,
    /// Absolute upload cap in MB
    pub max_upload_mb: f64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            proxy: None,
            request_timeout: Duration::from_secs(20),
            refresh_interval: Duration::from_secs(30),
            redirect_delay: Duration::from_millis(1_500),
            upload_refresh_delay: Duration::from_millis(1_000),
            notice_ttl: Duration::from_secs(5),
            max_upload_mb: DEFAULT_MAX_UPLOAD_MB,
        }
    }
}

impl ClientConfig {
    /// Default configuration overlaid with `NICKCLOUD_BASE_URL`,
    /// `NICKCLOUD_PROXY` and `NICKCLOUD_TIMEOUT_SECS` when set.
    pub fn from_env() -> Result<Self> {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(url) = lookup("NICKCLOUD_BASE_URL") {
            self.base_url = url;
        }
        if let Some(proxy) = lookup("NICKCLOUD_PROXY").filter(|p| !p.is_empty()) {
            self.proxy = Some(proxy);
        }
        if let Some(secs) = lookup("NICKCLOUD_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                CloudError::Custom(format!("Invalid NICKCLOUD_TIMEOUT_SECS: {}", secs))
            })?;
            self.request_timeout = Duration::from_secs(secs);
        }
        Ok(self)
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Zero out the cosmetic display delays (useful for scripts and tests).
    pub fn without_delays(mut self) -> Self {
        self.redirect_delay = Duration::ZERO;
        self.upload_refresh_delay = Duration::ZERO;
        self
    }

    /// Parse `base_url`, making sure it can carry path segments.
    pub fn parsed_base_url(&self) -> Result<Url> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| CloudError::Custom(format!("Invalid base URL {}: {}", self.base_url, e)))?;
        if url.cannot_be_a_base() {
            return Err(CloudError::Custom(format!(
                "Invalid base URL {}: cannot be a base",
                self.base_url
            )));
        }
        Ok(url)
    }
}
