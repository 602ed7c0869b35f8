//! Scripted [`Transport`] for exercising the handshake without a network.
//!
//! Responses are handed out in the order they were queued, one per
//! `post_form`/`get`; every call (and every cookie) is recorded so tests can
//! assert on the exact request sequence.  Clones share state.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use bw_domain::error::{Error, Result};

use crate::transport::{Cookie, FormPost, HttpResponse, Redirects, Transport};

/// One observed interaction with the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Post(FormPost),
    Get { url: String, redirects: Redirects },
    Cookie(Cookie),
}

impl Recorded {
    pub fn url(&self) -> Option<&str> {
        match self {
            Recorded::Post(req) => Some(&req.url),
            Recorded::Get { url, .. } => Some(url),
            Recorded::Cookie(_) => None,
        }
    }
}

enum Scripted {
    Respond(HttpResponse),
    Fail(String),
}

#[derive(Default)]
struct State {
    queue: VecDeque<Scripted>,
    log: Vec<Recorded>,
}

#[derive(Clone, Default)]
pub struct ScriptedTransport {
    state: Arc<Mutex<State>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue the next response.
    pub fn respond(&self, resp: HttpResponse) -> &Self {
        self.state().queue.push_back(Scripted::Respond(resp));
        self
    }

    /// Queue a transport-level failure for the next request.
    pub fn fail(&self, message: impl Into<String>) -> &Self {
        self.state().queue.push_back(Scripted::Fail(message.into()));
        self
    }

    /// Queue plain 200s for the three pre-assertion POSTs.
    pub fn respond_pre_assert(&self) -> &Self {
        for _ in 0..3 {
            self.respond(HttpResponse::ok(""));
        }
        self
    }

    pub fn log(&self) -> Vec<Recorded> {
        self.state().log.clone()
    }

    pub fn posts(&self) -> Vec<FormPost> {
        self.log()
            .into_iter()
            .filter_map(|r| match r {
                Recorded::Post(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    pub fn gets(&self) -> Vec<(String, Redirects)> {
        self.log()
            .into_iter()
            .filter_map(|r| match r {
                Recorded::Get { url, redirects } => Some((url, redirects)),
                _ => None,
            })
            .collect()
    }

    pub fn cookies(&self) -> Vec<Cookie> {
        self.log()
            .into_iter()
            .filter_map(|r| match r {
                Recorded::Cookie(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    pub fn remaining(&self) -> usize {
        self.state().queue.len()
    }

    fn next(&self, url: &str, entry: Recorded) -> Result<HttpResponse> {
        let mut state = self.state();
        state.log.push(entry);
        match state.queue.pop_front() {
            Some(Scripted::Respond(mut resp)) => {
                if resp.url.is_empty() {
                    resp.url = url.to_owned();
                }
                Ok(resp)
            }
            Some(Scripted::Fail(message)) => Err(Error::Transport(message)),
            None => Err(Error::Transport(format!("unscripted request to {url}"))),
        }
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn post_form(&self, req: &FormPost) -> Result<HttpResponse> {
        self.next(&req.url, Recorded::Post(req.clone()))
    }

    async fn get(&self, url: &str, redirects: Redirects) -> Result<HttpResponse> {
        self.next(
            url,
            Recorded::Get {
                url: url.to_owned(),
                redirects,
            },
        )
    }

    fn add_cookie(&self, cookie: &Cookie) -> Result<()> {
        self.state().log.push(Recorded::Cookie(cookie.clone()));
        Ok(())
    }
}
