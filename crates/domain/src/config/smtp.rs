use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// SMTP submission (trusted local relay, no auth)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    #[serde(default = "d_host")]
    pub host: String,
    #[serde(default = "d_port")]
    pub port: u16,
    #[serde(default = "d_sender")]
    pub sender: String,
    /// Name announced in `EHLO`.
    #[serde(default = "d_host")]
    pub helo: String,
    #[serde(default = "d_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: d_host(),
            port: d_port(),
            sender: d_sender(),
            helo: d_host(),
            timeout_secs: d_timeout_secs(),
        }
    }
}

fn d_host() -> String {
    "localhost".into()
}
fn d_port() -> u16 {
    25
}
fn d_sender() -> String {
    "no-reply@jollywit.ch".into()
}
fn d_timeout_secs() -> u64 {
    30
}
