//! Notification delivery.
//!
//! [`Notifier`] is the seam the orchestrator talks to.  [`SmtpNotifier`]
//! submits to a local relay; [`StdoutNotifier`] prints instead (dry runs).

pub mod mime;
pub mod smtp;

use bw_domain::error::Result;
use bw_domain::Notification;

pub use smtp::SmtpNotifier;

/// Deliver one notification.  Failures are reported, never retried here.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<()>;
}

/// Prints the notification to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutNotifier;

impl StdoutNotifier {
    pub fn render(notification: &Notification) -> String {
        format!(
            "To: {}\nSubject: {}\n\n{}\n",
            notification.recipient, notification.subject, notification.body
        )
    }
}

#[async_trait::async_trait]
impl Notifier for StdoutNotifier {
    async fn deliver(&self, notification: &Notification) -> Result<()> {
        print!("{}", Self::render(notification));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stdout_render_shows_headers_and_body() {
        let n = Notification {
            subject: "새 게시글 알림".into(),
            body: "1001 : 알바 공고".into(),
            recipient: "me@example.com".into(),
        };
        assert_eq!(
            StdoutNotifier::render(&n),
            "To: me@example.com\nSubject: 새 게시글 알림\n\n1001 : 알바 공고\n"
        );
    }
}
