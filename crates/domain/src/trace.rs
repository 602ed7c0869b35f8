use serde::Serialize;

/// Structured trace events emitted across all bulletin-watch crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    AuthStepCompleted {
        step: String,
        status: u16,
    },
    RedirectFollowed {
        hop: usize,
        location: String,
        status: u16,
    },
    AuthCompleted {
        final_status: u16,
        final_url: String,
        redirects: usize,
        verified: bool,
    },
    ListingParsed {
        rows: usize,
        posts: usize,
    },
    NewPostsDetected {
        listed: usize,
        new: usize,
        committed: bool,
    },
    NotificationDelivered {
        recipient: String,
        posts: usize,
    },
    StoreCommitted {
        path: String,
        added: usize,
        total: usize,
    },
    RunFinished {
        listed: usize,
        new: usize,
        matched: usize,
        notified: bool,
        dry_run: bool,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "bw_event");
    }
}
