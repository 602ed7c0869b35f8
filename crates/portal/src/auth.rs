//! Portal SSO handshake.
//!
//! The handshake is an ordered list of [`AuthStep`]s run over one
//! [`SessionContext`].  Each step may set cookies the later steps depend on,
//! so the order is fixed.  HTTP status codes returned along the way are
//! recorded but never abort the sequence; only transport failures and
//! redirect-policy violations do.

use reqwest::Url;

use bw_domain::config::PortalConfig;
use bw_domain::credentials::Credentials;
use bw_domain::error::{Error, Result};
use bw_domain::trace::TraceEvent;

use crate::transport::{Cookie, FormPost, HttpResponse, Redirects, Transport};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Constants
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub const LOGIN_PATH: &str = "/sso/sso_login.jsp";
pub const CHECK_LOGIN_ID_PATH: &str = "/ktp/login/checkLoginId.do";
pub const CHECK_SECOND_CERT_PATH: &str = "/ktp/login/checkSecondLoginCert.do";
pub const ASSERT_PATH: &str = "/exsignon/sso/sso_assert.jsp";

pub const LOGIN_TYPE_COOKIE: &str = "kut_login_type";
pub const LOGIN_TYPE_VALUE: &str = "id";

const RELAY_STATE: &str = "/index.jsp";
const LOGIN_TARGET: &str = "PORTAL";
const FORM_UTF8: &str = "application/x-www-form-urlencoded; charset=UTF-8";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Steps
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStep {
    Login,
    CheckLoginId,
    CheckSecondCert,
    InjectLoginType,
    Assert,
    FollowRedirects,
}

impl AuthStep {
    /// The handshake, in the only order the portal accepts.
    pub const SEQUENCE: [AuthStep; 6] = [
        AuthStep::Login,
        AuthStep::CheckLoginId,
        AuthStep::CheckSecondCert,
        AuthStep::InjectLoginType,
        AuthStep::Assert,
        AuthStep::FollowRedirects,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AuthStep::Login => "login",
            AuthStep::CheckLoginId => "check_login_id",
            AuthStep::CheckSecondCert => "check_second_cert",
            AuthStep::InjectLoginType => "inject_login_type",
            AuthStep::Assert => "assert",
            AuthStep::FollowRedirects => "follow_redirects",
        }
    }
}

impl std::fmt::Display for AuthStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Re-tag a transport failure with the step it happened in.
fn step_failed(step: &str, err: Error) -> Error {
    match err {
        Error::AuthFlow { .. } => err,
        Error::Transport(message) => Error::auth(step, message),
        other => Error::auth(step, other.to_string()),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session context
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Cookie-carrying transport plus what the handshake left behind.
///
/// Built per run and dropped at the end of it; nothing here is persisted.
pub struct SessionContext<T> {
    transport: T,
    last_response: Option<HttpResponse>,
    redirects_followed: usize,
    verified: bool,
}

impl<T: Transport> SessionContext<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            last_response: None,
            redirects_followed: 0,
            verified: false,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The response that ended the handshake (normally the last redirect
    /// target).
    pub fn last_response(&self) -> Option<&HttpResponse> {
        self.last_response.as_ref()
    }

    pub fn redirects_followed(&self) -> usize {
        self.redirects_followed
    }

    /// `true` only when post-login verification was configured and passed.
    pub fn verified(&self) -> bool {
        self.verified
    }

    /// GET with the session's cookies, letting the transport follow redirects.
    pub async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.transport.get(url, Redirects::Follow).await
    }

    pub fn into_transport(self) -> T {
        self.transport
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Authenticator
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct Authenticator {
    portal: PortalConfig,
}

impl Authenticator {
    pub fn new(portal: PortalConfig) -> Self {
        Self { portal }
    }

    pub fn portal(&self) -> &PortalConfig {
        &self.portal
    }

    /// Run the full handshake and hand back the authenticated session.
    ///
    /// Completing every step counts as success regardless of the final
    /// status code, unless `verify_url` + `verify_marker` are configured.
    pub async fn authenticate<T: Transport>(
        &self,
        transport: T,
        credentials: &Credentials,
    ) -> Result<SessionContext<T>> {
        let mut session = SessionContext::new(transport);
        for step in AuthStep::SEQUENCE {
            self.run_step(step, &mut session, credentials).await?;
        }
        self.verify(&mut session).await?;

        let (final_status, final_url) = session
            .last_response
            .as_ref()
            .map(|r| (r.status, r.url.clone()))
            .unwrap_or_default();
        TraceEvent::AuthCompleted {
            final_status,
            final_url,
            redirects: session.redirects_followed,
            verified: session.verified,
        }
        .emit();

        Ok(session)
    }

    /// Execute a single handshake step against `session`.
    pub async fn run_step<T: Transport>(
        &self,
        step: AuthStep,
        session: &mut SessionContext<T>,
        credentials: &Credentials,
    ) -> Result<()> {
        let user_id = credentials.user_id.as_str();
        let password = credentials.user_password.as_str();

        let request = match step {
            AuthStep::Login => FormPost::new(
                self.portal.endpoint(LOGIN_PATH),
                &[
                    ("user_id", user_id),
                    ("user_pwd", password),
                    ("RelayState", RELAY_STATE),
                    ("id", LOGIN_TARGET),
                    ("targetId", LOGIN_TARGET),
                    ("user_password", password),
                ],
                Redirects::Follow,
            ),
            AuthStep::CheckLoginId => FormPost::new(
                self.portal.endpoint(CHECK_LOGIN_ID_PATH),
                &[
                    ("login_id", user_id),
                    ("login_pwd", password),
                    ("login_type", ""),
                    ("login_empno", ""),
                    ("login_certDn", ""),
                    ("login_certChannel", ""),
                ],
                Redirects::Follow,
            )
            .with_content_type(FORM_UTF8),
            AuthStep::CheckSecondCert => FormPost::new(
                self.portal.endpoint(CHECK_SECOND_CERT_PATH),
                &[("login_id", user_id)],
                Redirects::Follow,
            ),
            AuthStep::Assert => FormPost::new(
                self.portal.endpoint(ASSERT_PATH),
                &[
                    ("certUserId", ""),
                    ("certLoginId", ""),
                    ("certEmpNo", ""),
                    ("certType", ""),
                    ("secondCert", ""),
                    ("langKo", ""),
                    ("langEn", ""),
                ],
                Redirects::Manual,
            ),
            AuthStep::InjectLoginType => {
                // The portal does not reliably set this itself, and the
                // post-assertion redirects depend on it.
                let cookie = Cookie {
                    name: LOGIN_TYPE_COOKIE.into(),
                    value: LOGIN_TYPE_VALUE.into(),
                    domain: self.portal.cookie_domain.clone(),
                    path: "/".into(),
                };
                session
                    .transport
                    .add_cookie(&cookie)
                    .map_err(|e| step_failed(step.name(), e))?;
                tracing::debug!(step = %step, domain = %cookie.domain, "login-type cookie set");
                return Ok(());
            }
            AuthStep::FollowRedirects => return self.follow_redirects(session).await,
        };

        let resp = session
            .transport
            .post_form(&request)
            .await
            .map_err(|e| step_failed(step.name(), e))?;

        if !resp.is_success() && !resp.is_redirect() {
            tracing::warn!(step = %step, status = resp.status, "non-success status during handshake");
        }
        TraceEvent::AuthStepCompleted {
            step: step.name().into(),
            status: resp.status,
        }
        .emit();

        session.last_response = Some(resp);
        Ok(())
    }

    /// Walk the redirect chain left by the assertion step, one manual GET
    /// per hop, until a non-redirect or a redirect without `Location`.
    async fn follow_redirects<T: Transport>(&self, session: &mut SessionContext<T>) -> Result<()> {
        let step = AuthStep::FollowRedirects.name();
        let base = Url::parse(&self.portal.base_url)
            .map_err(|e| Error::auth(step, format!("invalid portal base_url: {e}")))?;

        let mut hops = 0usize;
        loop {
            let location = match session.last_response.as_ref() {
                Some(resp) if resp.is_redirect() => match resp.location.as_deref() {
                    Some(loc) => loc.to_owned(),
                    None => break,
                },
                _ => break,
            };

            if hops >= self.portal.max_redirects {
                return Err(Error::auth(
                    step,
                    format!(
                        "redirect chain exceeded {} hops (next: {location})",
                        self.portal.max_redirects
                    ),
                ));
            }

            let next = resolve_location(&base, &location, &self.portal.cookie_domain)?;
            let resp = session
                .transport
                .get(next.as_str(), Redirects::Manual)
                .await
                .map_err(|e| step_failed(step, e))?;
            hops += 1;

            TraceEvent::RedirectFollowed {
                hop: hops,
                location: next.to_string(),
                status: resp.status,
            }
            .emit();
            session.last_response = Some(resp);
        }

        session.redirects_followed = hops;
        Ok(())
    }

    /// Optional positive check that the session is really logged in.
    async fn verify<T: Transport>(&self, session: &mut SessionContext<T>) -> Result<()> {
        let (Some(url), Some(marker)) = (&self.portal.verify_url, &self.portal.verify_marker)
        else {
            return Ok(());
        };

        let resp = session
            .transport
            .get(url, Redirects::Follow)
            .await
            .map_err(|e| step_failed("verify", e))?;

        if !resp.body.contains(marker.as_str()) {
            return Err(Error::auth(
                "verify",
                format!(
                    "authenticated marker not found at {url} (HTTP {}); login probably failed",
                    resp.status
                ),
            ));
        }

        session.verified = true;
        Ok(())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Redirect resolution
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Resolve a `Location` header against the portal base URL and make sure
/// it stays on `allowed_domain` (or a subdomain of it).
pub fn resolve_location(base: &Url, location: &str, allowed_domain: &str) -> Result<Url> {
    let step = AuthStep::FollowRedirects.name();
    let url = base
        .join(location.trim())
        .map_err(|e| Error::auth(step, format!("invalid redirect location {location:?}: {e}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::auth(
            step,
            format!("redirect to unsupported scheme: {url}"),
        ));
    }

    let host = url.host_str().unwrap_or("").to_ascii_lowercase();
    let domain = allowed_domain.trim_start_matches('.').to_ascii_lowercase();
    let on_domain = host == domain || host.ends_with(&format!(".{domain}"));
    if !on_domain {
        return Err(Error::auth(
            step,
            format!("redirect left {domain}: {url}"),
        ));
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://portal.koreatech.ac.kr").unwrap()
    }

    #[test]
    fn sequence_order_is_fixed() {
        let names: Vec<&str> = AuthStep::SEQUENCE.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec![
                "login",
                "check_login_id",
                "check_second_cert",
                "inject_login_type",
                "assert",
                "follow_redirects"
            ]
        );
    }

    #[test]
    fn absolute_path_resolves_against_portal() {
        let url = resolve_location(&base(), "/index.jsp?x=1", "koreatech.ac.kr").unwrap();
        assert_eq!(url.as_str(), "https://portal.koreatech.ac.kr/index.jsp?x=1");
    }

    #[test]
    fn bare_relative_path_resolves_against_portal_root() {
        let url = resolve_location(&base(), "main.do", "koreatech.ac.kr").unwrap();
        assert_eq!(url.as_str(), "https://portal.koreatech.ac.kr/main.do");
    }

    #[test]
    fn sibling_subdomain_is_allowed() {
        let url = resolve_location(
            &base(),
            "https://sso.koreatech.ac.kr/exsignon/x",
            "koreatech.ac.kr",
        )
        .unwrap();
        assert_eq!(url.host_str(), Some("sso.koreatech.ac.kr"));
    }

    #[test]
    fn foreign_host_is_rejected() {
        let err = resolve_location(&base(), "https://evil.example.com/", "koreatech.ac.kr")
            .unwrap_err();
        assert!(matches!(err, Error::AuthFlow { ref step, .. } if step == "follow_redirects"));
    }

    #[test]
    fn lookalike_suffix_is_rejected() {
        assert!(
            resolve_location(&base(), "https://notkoreatech.ac.kr/", "koreatech.ac.kr").is_err()
        );
    }

    #[test]
    fn non_http_scheme_is_rejected() {
        assert!(resolve_location(&base(), "javascript:alert(1)", "koreatech.ac.kr").is_err());
    }

    #[test]
    fn step_failed_wraps_transport_errors() {
        let err = step_failed("login", Error::Transport("connection refused".into()));
        match err {
            Error::AuthFlow { step, message } => {
                assert_eq!(step, "login");
                assert_eq!(message, "connection refused");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
