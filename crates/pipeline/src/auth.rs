//! SSO sign-in through a real browser.
//!
//! The portal only hands out sessions through the forum's SSO handshake, so
//! the flow has to happen in a browser: load the SSO endpoint, read the
//! forum redirect it renders, plant the caller's forum session cookie on the
//! forum origin, then follow the redirect back to the portal. The browser's
//! cookie jar at that point is the session the upload client reuses.

use reqwest::Url;
use reupload_browser::{Browser, WaitPolicy};
use reupload_protocol::{Cookie, PortalEndpoints, SsoResponse, cookie_header};
use tracing::{debug, info};

use crate::error::PipelineError;
use crate::types::{AuthPhase, AuthSession, Phase};

/// Reads the rendered SSO body as text.
pub(crate) const BODY_TEXT: &str = "document.body.innerText";

/// Touches the cookie store so the freshly set cookie is materialized
/// before the redirect is followed.
pub(crate) const TOUCH_COOKIES: &str = "void document.cookie";

/// Drives one browser through the SSO handshake.
pub struct AuthenticationBridge<'a> {
    browser: &'a mut dyn Browser,
    endpoints: &'a PortalEndpoints,
    phase: AuthPhase,
}

impl<'a> AuthenticationBridge<'a> {
    pub fn new(browser: &'a mut dyn Browser, endpoints: &'a PortalEndpoints) -> Self {
        Self {
            browser,
            endpoints,
            phase: AuthPhase::Start,
        }
    }

    pub fn phase(&self) -> AuthPhase {
        self.phase
    }

    /// Signs in with the forum session cookie `session_cookie`.
    ///
    /// Fails with [`PipelineError::AuthenticationFailure`] when the redirect
    /// does not end on the portal host, which means the cookie is invalid or
    /// expired.
    pub async fn authenticate(
        &mut self,
        sso_url: &str,
        session_cookie: &str,
    ) -> Result<AuthSession, PipelineError> {
        let session = self.sign_in(sso_url, session_cookie).await?;
        if !session.verified {
            return Err(PipelineError::AuthenticationFailure {
                location: session.location,
            });
        }
        Ok(session)
    }

    /// Runs the handshake and reports where it landed.
    ///
    /// A redirect that misses the portal host is not an error here: the
    /// session comes back with `verified: false` and no cookie header.
    pub async fn sign_in(
        &mut self,
        sso_url: &str,
        session_cookie: &str,
    ) -> Result<AuthSession, PipelineError> {
        let result = self.run(sso_url, session_cookie).await;
        let verified = result.as_ref().is_ok_and(|session| session.verified);
        if !verified && !self.phase.is_terminal() {
            self.phase = AuthPhase::Failed;
        }
        result
    }

    async fn run(
        &mut self,
        sso_url: &str,
        session_cookie: &str,
    ) -> Result<AuthSession, PipelineError> {
        info!("Navigating to SSO URL ...");
        self.browser
            .navigate(sso_url, WaitPolicy::NetworkIdle)
            .await?;
        self.phase.advance(AuthPhase::SsoNavigated)?;

        info!("Navigated to SSO URL. Parsing response body ...");
        let body = self.browser.evaluate(BODY_TEXT).await?;
        let redirect = parse_sso_body(&body)?;
        debug!("Parsed response body.");
        let origin = redirect_origin(&redirect.url)?;
        self.phase.advance(AuthPhase::RedirectParsed)?;

        self.browser.navigate(&origin, WaitPolicy::Load).await?;
        info!("Redirected to Forum Origin ...");

        info!("Setting cookies ...");
        let cookie = Cookie::forum_session(session_cookie, &self.endpoints.forum_domain);
        self.browser.set_cookie(&cookie).await?;
        self.browser.evaluate(TOUCH_COOKIES).await?;
        self.phase.advance(AuthPhase::CookieSet)?;

        info!("Cookies set. Following redirect ...");
        self.browser
            .navigate(&redirect.url, WaitPolicy::NetworkIdle)
            .await?;
        self.phase.advance(AuthPhase::RedirectFollowed)?;

        let location = self.browser.current_url().await?;
        if !self.lands_on_portal(&location) {
            debug!(%location, "redirect did not reach the portal");
            return Ok(AuthSession {
                cookie_header: String::new(),
                verified: false,
                location,
            });
        }
        self.phase.advance(AuthPhase::PortalVerified)?;

        let jar = self.browser.cookies().await?;
        debug!(cookies = jar.len(), "read cookie jar");
        Ok(AuthSession {
            cookie_header: cookie_header(&jar),
            verified: true,
            location,
        })
    }

    fn lands_on_portal(&self, location: &str) -> bool {
        Url::parse(location)
            .ok()
            .and_then(|url| url.host_str().map(|h| self.endpoints.is_portal_host(h)))
            .unwrap_or(false)
    }
}

/// Parses the text the SSO endpoint renders into its redirect target.
fn parse_sso_body(body: &serde_json::Value) -> Result<SsoResponse, PipelineError> {
    let text = body.as_str().ok_or_else(|| {
        PipelineError::ProtocolViolation(format!("page body is not text: {body}"))
    })?;
    serde_json::from_str(text)
        .map_err(|e| PipelineError::ProtocolViolation(format!("invalid SSO body: {e}")))
}

/// `scheme://host[:port]` of `url`.
fn redirect_origin(url: &str) -> Result<String, PipelineError> {
    let parsed = Url::parse(url)
        .map_err(|e| PipelineError::ProtocolViolation(format!("invalid redirect URL {url:?}: {e}")))?;
    let origin = parsed.origin();
    if !origin.is_tuple() {
        return Err(PipelineError::ProtocolViolation(format!(
            "redirect URL {url:?} has no origin"
        )));
    }
    Ok(origin.ascii_serialization())
}
