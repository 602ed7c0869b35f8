use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Portal
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Scheme + host of the portal, without a trailing slash.
    #[serde(default = "d_base_url")]
    pub base_url: String,
    /// Domain the `kut_login_type` cookie is scoped to.  Redirect targets
    /// must stay on this domain or one of its subdomains.
    #[serde(default = "d_cookie_domain")]
    pub cookie_domain: String,
    /// Bulletin board id (`b` query parameter of the listing page).
    #[serde(default = "d_board_id")]
    pub board_id: u32,
    /// Upper bound on manually followed redirects after the SSO assertion.
    #[serde(default = "d_max_redirects")]
    pub max_redirects: usize,
    #[serde(default = "d_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "d_user_agent")]
    pub user_agent: String,
    /// Authenticated-only page fetched after the handshake.  When set
    /// together with `verify_marker`, the body must contain the marker or
    /// authentication fails.
    #[serde(default)]
    pub verify_url: Option<String>,
    #[serde(default)]
    pub verify_marker: Option<String>,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: d_base_url(),
            cookie_domain: d_cookie_domain(),
            board_id: d_board_id(),
            max_redirects: d_max_redirects(),
            timeout_secs: d_timeout_secs(),
            user_agent: d_user_agent(),
            verify_url: None,
            verify_marker: None,
        }
    }
}

impl PortalConfig {
    /// Absolute URL for a portal path such as `/sso/sso_login.jsp`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// First page of the configured bulletin board.
    pub fn listing_url(&self) -> String {
        format!("{}?b={}", self.endpoint("/ctt/bb/bulletin"), self.board_id)
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_base_url() -> String {
    "https://portal.koreatech.ac.kr".into()
}
fn d_cookie_domain() -> String {
    "koreatech.ac.kr".into()
}
fn d_board_id() -> u32 {
    21
}
fn d_max_redirects() -> usize {
    10
}
fn d_timeout_secs() -> u64 {
    30
}
fn d_user_agent() -> String {
    concat!("bulletin-watch/", env!("CARGO_PKG_VERSION")).into()
}
