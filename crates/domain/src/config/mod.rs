mod account;
mod logging;
mod portal;
mod smtp;
mod store;
mod watch;

pub use account::*;
pub use logging::*;
pub use portal::*;
pub use smtp::*;
pub use store::*;
pub use watch::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub portal: PortalConfig,
    #[serde(default)]
    pub account: AccountConfig,
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub smtp: SmtpConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Environment variable overriding `watch.recipient`.
pub const RECIPIENT_ENV: &str = "BW_RECIPIENT";
/// Environment variable overriding `watch.keywords` (comma-separated).
pub const KEYWORDS_ENV: &str = "BW_KEYWORDS";

impl Config {
    /// Apply `BW_RECIPIENT` / `BW_KEYWORDS` from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides through `lookup` (env var name → value).  Empty
    /// values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(recipient) = lookup(RECIPIENT_ENV).filter(|v| !v.trim().is_empty()) {
            self.watch.recipient = recipient.trim().to_owned();
        }
        if let Some(raw) = lookup(KEYWORDS_ENV).filter(|v| !v.trim().is_empty()) {
            self.watch.keywords = raw
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_owned)
                .collect();
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl ConfigIssue {
    fn error(field: &str, message: &str) -> Self {
        Self {
            severity: ConfigSeverity::Error,
            field: field.into(),
            message: message.into(),
        }
    }

    fn warning(field: &str, message: &str) -> Self {
        Self {
            severity: ConfigSeverity::Warning,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        let base = self.portal.base_url.trim();
        if base.is_empty() {
            issues.push(ConfigIssue::error("portal.base_url", "base_url must not be empty"));
        } else if !(base.starts_with("https://") || base.starts_with("http://")) {
            issues.push(ConfigIssue::error(
                "portal.base_url",
                "base_url must start with http:// or https://",
            ));
        }

        if self.portal.cookie_domain.trim().is_empty() {
            issues.push(ConfigIssue::error(
                "portal.cookie_domain",
                "cookie_domain must not be empty",
            ));
        }

        if self.portal.max_redirects == 0 {
            issues.push(ConfigIssue::error(
                "portal.max_redirects",
                "max_redirects must be greater than 0",
            ));
        }

        match (&self.portal.verify_url, &self.portal.verify_marker) {
            (Some(_), None) => issues.push(ConfigIssue::error(
                "portal.verify_marker",
                "verify_url is set but verify_marker is missing",
            )),
            (None, Some(_)) => issues.push(ConfigIssue::warning(
                "portal.verify_url",
                "verify_marker is set without verify_url and will be ignored",
            )),
            _ => {}
        }

        if self.watch.recipient.trim().is_empty() {
            issues.push(ConfigIssue::error(
                "watch.recipient",
                "no recipient configured (set watch.recipient or BW_RECIPIENT)",
            ));
        }

        if self.watch.keywords.iter().all(|k| k.is_empty()) {
            issues.push(ConfigIssue::warning(
                "watch.keywords",
                "no keywords configured; no post will ever match",
            ));
        }

        if self.smtp.port == 0 {
            issues.push(ConfigIssue::error("smtp.port", "port must be greater than 0"));
        }

        if self.smtp.host.trim().is_empty() {
            issues.push(ConfigIssue::error("smtp.host", "host must not be empty"));
        }

        issues
    }
}
