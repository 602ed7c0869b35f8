//! Plain SMTP submission to a trusted relay (no TLS, no AUTH).

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use bw_domain::config::SmtpConfig;
use bw_domain::error::{Error, Result};
use bw_domain::Notification;

use crate::mime::{build_message, Envelope};
use crate::Notifier;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Notifier
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct SmtpNotifier {
    config: SmtpConfig,
}

impl SmtpNotifier {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    async fn submit(&self, message: &str, recipient: &str) -> Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let stream = TcpStream::connect(&addr)
            .await
            .map_err(|e| Error::Delivery(format!("connect to {addr}: {e}")))?;
        let mut conn = Connection::new(stream);

        conn.expect(&[220]).await?;
        conn.command(&format!("EHLO {}", self.config.helo), &[250])
            .await?;
        conn.command(&format!("MAIL FROM:<{}>", self.config.sender), &[250])
            .await?;
        conn.command(&format!("RCPT TO:<{recipient}>"), &[250, 251])
            .await?;
        conn.command("DATA", &[354]).await?;
        conn.data(message).await?;

        // The message is accepted at this point; a failed QUIT is not worth
        // reporting as a delivery failure.
        if let Err(e) = conn.command("QUIT", &[221]).await {
            tracing::warn!(error = %e, "SMTP QUIT failed after message was accepted");
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Notifier for SmtpNotifier {
    async fn deliver(&self, notification: &Notification) -> Result<()> {
        check_address("sender", &self.config.sender)?;
        check_address("recipient", &notification.recipient)?;

        let message = build_message(&Envelope::now(&self.config.sender), notification);
        let limit = Duration::from_secs(self.config.timeout_secs);
        tokio::time::timeout(limit, self.submit(&message, &notification.recipient))
            .await
            .map_err(|_| {
                Error::Delivery(format!(
                    "SMTP exchange with {}:{} timed out after {}s",
                    self.config.host, self.config.port, self.config.timeout_secs
                ))
            })??;

        tracing::info!(
            recipient = %notification.recipient,
            relay = %format!("{}:{}", self.config.host, self.config.port),
            "notification submitted"
        );
        Ok(())
    }
}

fn check_address(what: &str, addr: &str) -> Result<()> {
    let bad = addr.is_empty()
        || !addr.contains('@')
        || addr.chars().any(|c| c.is_control() || c == '<' || c == '>');
    if bad {
        return Err(Error::Delivery(format!("invalid {what} address {addr:?}")));
    }
    Ok(())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Wire protocol
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug)]
struct Reply {
    code: u16,
    text: String,
}

struct Connection {
    stream: BufReader<TcpStream>,
}

impl Connection {
    fn new(stream: TcpStream) -> Self {
        Self {
            stream: BufReader::new(stream),
        }
    }

    /// Read one (possibly multi-line) reply.
    async fn reply(&mut self) -> Result<Reply> {
        let mut text = Vec::new();
        loop {
            let mut line = String::new();
            let n = self
                .stream
                .read_line(&mut line)
                .await
                .map_err(|e| Error::Delivery(format!("reading SMTP reply: {e}")))?;
            if n == 0 {
                return Err(Error::Delivery("SMTP server closed the connection".into()));
            }
            let line = line.trim_end_matches(['\r', '\n']);
            let code = line
                .get(..3)
                .and_then(|c| c.parse::<u16>().ok())
                .ok_or_else(|| Error::Delivery(format!("malformed SMTP reply {line:?}")))?;
            text.push(line.get(4..).unwrap_or("").to_owned());

            // "250-..." continues, "250 ..." (or bare "250") ends the reply.
            if line.as_bytes().get(3) != Some(&b'-') {
                return Ok(Reply {
                    code,
                    text: text.join(" "),
                });
            }
        }
    }

    async fn expect(&mut self, accepted: &[u16]) -> Result<Reply> {
        let reply = self.reply().await?;
        if !accepted.contains(&reply.code) {
            return Err(Error::Delivery(format!(
                "SMTP server replied {} {}",
                reply.code, reply.text
            )));
        }
        Ok(reply)
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let stream = self.stream.get_mut();
        stream
            .write_all(bytes)
            .await
            .and(stream.flush().await)
            .map_err(|e| Error::Delivery(format!("writing to SMTP server: {e}")))
    }

    async fn command(&mut self, line: &str, accepted: &[u16]) -> Result<Reply> {
        let verb = line.split_whitespace().next().unwrap_or(line);
        tracing::debug!(verb, "smtp >");
        self.write(format!("{line}\r\n").as_bytes()).await?;
        self.expect(accepted).await.map_err(|e| match e {
            Error::Delivery(msg) => Error::Delivery(format!("{verb}: {msg}")),
            other => other,
        })
    }

    /// Send the message body and the terminating `.` line.
    async fn data(&mut self, message: &str) -> Result<Reply> {
        self.write(dot_stuff(message).as_bytes()).await?;
        self.expect(&[250]).await.map_err(|e| match e {
            Error::Delivery(msg) => Error::Delivery(format!("DATA: {msg}")),
            other => other,
        })
    }
}

/// Escape leading dots and append the end-of-data marker.
fn dot_stuff(message: &str) -> String {
    let mut out = String::with_capacity(message.len() + 8);
    for line in message.split_terminator("\r\n") {
        if line.starts_with('.') {
            out.push('.');
        }
        out.push_str(line);
        out.push_str("\r\n");
    }
    out.push_str(".\r\n");
    out
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Replies for MAIL and RCPT; everything else is fixed.
    struct Script {
        mail: &'static str,
        rcpt: &'static str,
    }

    const ACCEPT_ALL: Script = Script {
        mail: "250 2.1.0 Ok",
        rcpt: "250 2.1.5 Ok",
    };

    /// One-connection fake relay.  Returns the port and a handle yielding
    /// every line the client sent.
    async fn fake_relay(script: Script) -> (u16, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let handle = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut socket = BufReader::new(socket);
            let mut seen = Vec::new();
            let mut in_data = false;

            socket
                .get_mut()
                .write_all(b"220 fake.relay ESMTP\r\n")
                .await
                .unwrap();

            loop {
                let mut line = String::new();
                if socket.read_line(&mut line).await.unwrap() == 0 {
                    break;
                }
                let line = line.trim_end_matches(['\r', '\n']).to_owned();
                seen.push(line.clone());

                let reply: &str = if in_data {
                    if line == "." {
                        in_data = false;
                        "250 2.0.0 queued\r\n"
                    } else {
                        continue;
                    }
                } else if line.starts_with("EHLO") {
                    "250-fake.relay\r\n250-8BITMIME\r\n250 SIZE 1000000\r\n"
                } else if line.starts_with("MAIL FROM") {
                    script.mail
                } else if line.starts_with("RCPT TO") {
                    script.rcpt
                } else if line == "DATA" {
                    in_data = true;
                    "354 End data with <CR><LF>.<CR><LF>\r\n"
                } else if line == "QUIT" {
                    socket.get_mut().write_all(b"221 2.0.0 Bye\r\n").await.unwrap();
                    break;
                } else {
                    "500 unknown\r\n"
                };

                let reply = if reply.ends_with("\r\n") {
                    reply.to_owned()
                } else {
                    format!("{reply}\r\n")
                };
                if socket.get_mut().write_all(reply.as_bytes()).await.is_err() {
                    break;
                }
            }
            seen
        });

        (port, handle)
    }

    fn notifier(port: u16) -> SmtpNotifier {
        SmtpNotifier::new(SmtpConfig {
            host: "127.0.0.1".into(),
            port,
            sender: "watch@example.com".into(),
            helo: "watcher.local".into(),
            timeout_secs: 5,
        })
    }

    fn notification() -> Notification {
        Notification {
            subject: "새 게시글 알림".into(),
            body: "1001 : 알바 공고".into(),
            recipient: "me@example.com".into(),
        }
    }

    #[tokio::test]
    async fn submits_full_transaction() {
        let (port, relay) = fake_relay(ACCEPT_ALL).await;
        notifier(port).deliver(&notification()).await.unwrap();

        let seen = relay.await.unwrap();
        assert_eq!(seen[0], "EHLO watcher.local");
        assert_eq!(seen[1], "MAIL FROM:<watch@example.com>");
        assert_eq!(seen[2], "RCPT TO:<me@example.com>");
        assert_eq!(seen[3], "DATA");
        assert!(seen.contains(&"To: me@example.com".to_string()));
        assert!(seen.iter().any(|l| l.starts_with("Subject: =?UTF-8?B?")));
        let dot = seen.iter().position(|l| l == ".").unwrap();
        assert_eq!(seen[dot + 1], "QUIT");
    }

    #[tokio::test]
    async fn rejected_recipient_is_delivery_error() {
        let (port, _relay) = fake_relay(Script {
            mail: "250 Ok",
            rcpt: "550 5.1.1 mailbox unavailable",
        })
        .await;

        let err = notifier(port).deliver(&notification()).await.unwrap_err();
        match err {
            Error::Delivery(msg) => {
                assert!(msg.starts_with("RCPT"), "{msg}");
                assert!(msg.contains("550"), "{msg}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_relay_is_delivery_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = notifier(port).deliver(&notification()).await.unwrap_err();
        assert!(matches!(err, Error::Delivery(ref m) if m.contains("connect")));
    }

    #[tokio::test]
    async fn header_injection_in_recipient_is_refused() {
        let mut n = notification();
        n.recipient = "me@example.com>\r\nRCPT TO:<other@example.com".into();
        let err = notifier(1).deliver(&n).await.unwrap_err();
        assert!(matches!(err, Error::Delivery(ref m) if m.contains("recipient")));
    }

    #[test]
    fn leading_dots_are_doubled() {
        let stuffed = dot_stuff("a\r\n.b\r\n..c\r\n");
        assert_eq!(stuffed, "a\r\n..b\r\n...c\r\n.\r\n");
    }
}
