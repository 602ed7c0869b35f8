use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Watch
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Title substrings of interest (case-sensitive, any-of).
    #[serde(default = "d_keywords")]
    pub keywords: Vec<String>,
    #[serde(default = "d_subject")]
    pub subject: String,
    #[serde(default)]
    pub recipient: String,
    #[serde(default)]
    pub mark_seen: MarkSeen,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            keywords: d_keywords(),
            subject: d_subject(),
            recipient: String::new(),
            mark_seen: MarkSeen::default(),
        }
    }
}

/// When newly seen identities are committed to the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkSeen {
    /// Commit before delivery.  A failed delivery is never retried.
    #[default]
    BeforeDelivery,
    /// Stage, then commit only once the notification is out (or there was
    /// nothing to send).  A failed delivery is retried on the next run.
    AfterDelivery,
}

fn d_keywords() -> Vec<String> {
    vec!["알바".into(), "아르바이트".into()]
}
fn d_subject() -> String {
    "새 게시글 알림".into()
}
