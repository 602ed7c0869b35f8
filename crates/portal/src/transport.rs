//! HTTP seam between the handshake logic and the network.
//!
//! The authenticator only ever talks to a [`Transport`]; the production
//! implementation is [`ReqwestTransport`], which keeps one cookie jar shared
//! by two clients (automatic and manual redirect handling).

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::redirect::Policy;
use reqwest::Url;

use bw_domain::config::PortalConfig;
use bw_domain::error::{Error, Result};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request / Response types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Whether the transport follows 3xx responses itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redirects {
    Follow,
    Manual,
}

/// A form-url-encoded POST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormPost {
    pub url: String,
    pub fields: Vec<(String, String)>,
    /// Explicit `Content-Type` header; the transport default is used when `None`.
    pub content_type: Option<String>,
    pub redirects: Redirects,
}

impl FormPost {
    pub fn new(url: impl Into<String>, fields: &[(&str, &str)], redirects: Redirects) -> Self {
        Self {
            url: url.into(),
            fields: fields
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
            content_type: None,
            redirects,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// A cookie to place in the session jar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
}

/// The parts of a response the handshake and listing fetch look at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Final URL of the exchange (after any automatic redirects).
    pub url: String,
    pub location: Option<String>,
    pub body: String,
}

impl HttpResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            url: String::new(),
            location: None,
            body: body.into(),
        }
    }

    pub fn redirect(status: u16, location: impl Into<String>) -> Self {
        Self {
            status,
            url: String::new(),
            location: Some(location.into()),
            body: String::new(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self.status, 301 | 302 | 303 | 307 | 308)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Transport trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A cookie-keeping HTTP client.
///
/// Every response, whatever its status, is returned as `Ok`; `Err` means
/// the exchange itself failed (DNS, connect, TLS, timeout, body read).
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn post_form(&self, req: &FormPost) -> Result<HttpResponse>;

    async fn get(&self, url: &str, redirects: Redirects) -> Result<HttpResponse>;

    fn add_cookie(&self, cookie: &Cookie) -> Result<()>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// reqwest implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct ReqwestTransport {
    follow: reqwest::Client,
    manual: reqwest::Client,
    jar: Arc<Jar>,
}

impl ReqwestTransport {
    pub fn new(config: &PortalConfig) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        let build = |policy: Policy| {
            reqwest::Client::builder()
                .cookie_provider(jar.clone())
                .redirect(policy)
                .timeout(Duration::from_secs(config.timeout_secs))
                .user_agent(&config.user_agent)
                .build()
                .map_err(|e| Error::Transport(format!("failed to build HTTP client: {e}")))
        };

        Ok(Self {
            follow: build(Policy::limited(10))?,
            manual: build(Policy::none())?,
            jar,
        })
    }

    fn client(&self, redirects: Redirects) -> &reqwest::Client {
        match redirects {
            Redirects::Follow => &self.follow,
            Redirects::Manual => &self.manual,
        }
    }

    async fn read(resp: reqwest::Response) -> Result<HttpResponse> {
        let status = resp.status().as_u16();
        let url = resp.url().to_string();
        let location = resp
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = resp
            .text()
            .await
            .map_err(|e| Error::Transport(format!("failed to read response body from {url}: {e}")))?;
        Ok(HttpResponse {
            status,
            url,
            location,
            body,
        })
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn post_form(&self, req: &FormPost) -> Result<HttpResponse> {
        let mut builder = self.client(req.redirects).post(&req.url);
        // Set before `form()`, which only fills in a missing Content-Type.
        if let Some(ct) = &req.content_type {
            builder = builder.header(CONTENT_TYPE, ct);
        }
        let resp = builder
            .form(&req.fields)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("POST {} failed: {e}", req.url)))?;
        Self::read(resp).await
    }

    async fn get(&self, url: &str, redirects: Redirects) -> Result<HttpResponse> {
        let resp = self
            .client(redirects)
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("GET {url} failed: {e}")))?;
        Self::read(resp).await
    }

    fn add_cookie(&self, cookie: &Cookie) -> Result<()> {
        let origin = format!("https://{}{}", cookie.domain, cookie.path);
        let url = Url::parse(&origin)
            .map_err(|e| Error::Transport(format!("invalid cookie origin {origin}: {e}")))?;
        self.jar.add_cookie_str(
            &format!(
                "{}={}; Domain={}; Path={}",
                cookie.name, cookie.value, cookie.domain, cookie.path
            ),
            &url,
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_statuses() {
        for status in [301, 302, 303, 307, 308] {
            assert!(HttpResponse::redirect(status, "/x").is_redirect());
        }
        for status in [200, 304, 305, 400, 500] {
            assert!(!HttpResponse::ok("").with_status(status).is_redirect());
        }
    }

    #[test]
    fn form_post_field_lookup() {
        let post = FormPost::new("https://p/x", &[("a", "1"), ("b", "")], Redirects::Manual)
            .with_content_type("application/x-www-form-urlencoded; charset=UTF-8");
        assert_eq!(post.field("a"), Some("1"));
        assert_eq!(post.field("b"), Some(""));
        assert_eq!(post.field("c"), None);
        assert!(post.content_type.as_deref().unwrap().contains("charset=UTF-8"));
    }

    #[test]
    fn reqwest_transport_builds_and_accepts_cookie() {
        let transport = ReqwestTransport::new(&PortalConfig::default()).unwrap();
        let cookie = Cookie {
            name: "kut_login_type".into(),
            value: "id".into(),
            domain: "koreatech.ac.kr".into(),
            path: "/".into(),
        };
        transport.add_cookie(&cookie).unwrap();

        use reqwest::cookie::CookieStore;
        let url = Url::parse("https://portal.koreatech.ac.kr/index.jsp").unwrap();
        let header = transport.jar.cookies(&url).unwrap();
        assert_eq!(header.to_str().unwrap(), "kut_login_type=id");
    }
}
