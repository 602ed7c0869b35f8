//! Minimal RFC 5322 / MIME message builder for plain-text UTF-8 mail.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Local};

use bw_domain::Notification;

/// Longest raw chunk per encoded word: 45 bytes → 60 base64 chars, which
/// keeps `=?UTF-8?B?…?=` within the 75-char limit.
const WORD_CHUNK: usize = 45;
const BODY_LINE: usize = 76;

/// Everything besides the notification that goes into the headers.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub from: String,
    pub date: DateTime<Local>,
    pub message_id: String,
}

impl Envelope {
    /// Current time and a fresh `<uuid@sender-domain>` message id.
    pub fn now(from: &str) -> Self {
        let domain = from.rsplit_once('@').map(|(_, d)| d).unwrap_or("localhost");
        Self {
            from: from.to_owned(),
            date: Local::now(),
            message_id: format!("<{}@{}>", uuid::Uuid::new_v4(), domain),
        }
    }
}

/// Render the full message with CRLF line endings, ready for `DATA`.
pub fn build_message(envelope: &Envelope, notification: &Notification) -> String {
    let headers = [
        ("From", envelope.from.clone()),
        ("To", notification.recipient.clone()),
        ("Subject", encode_header(&notification.subject)),
        ("Date", envelope.date.to_rfc2822()),
        ("Message-ID", envelope.message_id.clone()),
        ("MIME-Version", "1.0".to_owned()),
        ("Content-Type", "text/plain; charset=UTF-8".to_owned()),
        ("Content-Transfer-Encoding", "base64".to_owned()),
    ];

    let mut out = String::new();
    for (name, value) in headers {
        out.push_str(name);
        out.push_str(": ");
        out.push_str(&value);
        out.push_str("\r\n");
    }
    out.push_str("\r\n");
    out.push_str(&encode_body(&notification.body));
    out
}

/// Printable ASCII passes through; anything else becomes one or more
/// `=?UTF-8?B?…?=` encoded words folded onto continuation lines.
pub fn encode_header(value: &str) -> String {
    let plain = value.bytes().all(|b| (0x20..0x7f).contains(&b)) && !value.contains("=?");
    if plain {
        return value.to_owned();
    }

    let mut words = Vec::new();
    let mut start = 0;
    while start < value.len() {
        let mut end = (start + WORD_CHUNK).min(value.len());
        while !value.is_char_boundary(end) {
            end -= 1;
        }
        words.push(format!("=?UTF-8?B?{}?=", STANDARD.encode(&value[start..end])));
        start = end;
    }
    words.join("\r\n ")
}

/// Base64 of the CRLF-normalised body, wrapped at 76 columns.
pub fn encode_body(body: &str) -> String {
    let canonical = body.replace("\r\n", "\n").replace('\n', "\r\n");
    let encoded = STANDARD.encode(canonical.as_bytes());

    let mut out = String::with_capacity(encoded.len() + encoded.len() / BODY_LINE * 2 + 2);
    for line in encoded.as_bytes().chunks(BODY_LINE) {
        // base64 output is ASCII.
        out.push_str(std::str::from_utf8(line).unwrap_or_default());
        out.push_str("\r\n");
    }
    out
}
