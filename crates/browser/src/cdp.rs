//! DevTools protocol session attached to a single page target.
//!
//! Commands are correlated by id; every frame read along the way is fed to
//! a [`NetworkIdleTracker`] so navigations can wait for the page to settle.

use std::collections::HashSet;
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use futures_util::{SinkExt, StreamExt};
use reupload_protocol::Cookie;
use reupload_protocol::constants::NETWORK_IDLE_WINDOW;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use tokio::net::TcpStream;
use tokio::process::Child;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace, warn};

use crate::{Browser, BrowserError, WaitPolicy};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Timeout for the WebSocket handshake.
const WS_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Grace period for Chrome to exit after `Browser.close` before it is killed.
const PROCESS_EXIT_GRACE: Duration = Duration::from_secs(2);

/// CDP message sent to the browser.
#[derive(Serialize)]
struct CdpCommand<'a> {
    id: u64,
    method: &'a str,
    params: serde_json::Value,
}

/// Any frame received from the browser: a command reply or an event.
#[derive(Debug, Deserialize)]
struct CdpFrame {
    id: Option<u64>,
    method: Option<String>,
    #[serde(default)]
    params: serde_json::Value,
    result: Option<serde_json::Value>,
    error: Option<CdpErrorBody>,
}

#[derive(Debug, Deserialize)]
struct CdpErrorBody {
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NavigateResult {
    #[serde(default)]
    error_text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EvalResult {
    #[serde(default)]
    result: RemoteObject,
    exception_details: Option<ExceptionDetails>,
}

#[derive(Default, Deserialize)]
struct RemoteObject {
    #[serde(default)]
    value: serde_json::Value,
}

#[derive(Deserialize)]
struct ExceptionDetails {
    #[serde(default)]
    text: String,
    exception: Option<ExceptionObject>,
}

#[derive(Deserialize)]
struct ExceptionObject {
    #[serde(default)]
    description: String,
}

#[derive(Deserialize)]
struct CookiesResult {
    #[serde(default)]
    cookies: Vec<Cookie>,
}

// ---------------------------------------------------------------------------
// NetworkIdleTracker
// ---------------------------------------------------------------------------

/// Tracks the load event and in-flight requests of the current navigation.
#[derive(Debug, Default)]
pub struct NetworkIdleTracker {
    inflight: HashSet<String>,
    load_fired: bool,
}

impl NetworkIdleTracker {
    /// Forgets everything seen so far (start of a new navigation).
    pub fn reset(&mut self) {
        self.inflight.clear();
        self.load_fired = false;
    }

    /// Feeds one CDP event into the tracker.
    pub fn observe(&mut self, method: &str, params: &serde_json::Value) {
        let request_id = params.get("requestId").and_then(serde_json::Value::as_str);
        match method {
            "Network.requestWillBeSent" => {
                if let Some(id) = request_id {
                    self.inflight.insert(id.to_string());
                }
            }
            "Network.loadingFinished" | "Network.loadingFailed" => {
                if let Some(id) = request_id {
                    self.inflight.remove(id);
                }
            }
            "Page.loadEventFired" => self.load_fired = true,
            _ => {}
        }
    }

    /// Whether the page's `load` event fired since the last reset.
    pub fn load_fired(&self) -> bool {
        self.load_fired
    }

    /// Number of requests started but not yet finished or failed.
    pub fn inflight(&self) -> usize {
        self.inflight.len()
    }
}

// ---------------------------------------------------------------------------
// CdpBrowser
// ---------------------------------------------------------------------------

/// A page target driven over a DevTools WebSocket.
///
/// When created by [`ChromeLauncher`](crate::ChromeLauncher) it also owns
/// the Chrome process and its throwaway profile directory.
pub struct CdpBrowser {
    ws: Option<WsStream>,
    next_id: u64,
    timeout: Duration,
    network: NetworkIdleTracker,
    process: Option<Child>,
    profile_dir: Option<TempDir>,
}

impl CdpBrowser {
    /// Connects to a page target's WebSocket debugger URL and enables the
    /// `Page` and `Network` domains.
    ///
    /// `timeout` bounds every command round trip and every navigation.
    pub async fn connect(ws_url: &str, timeout: Duration) -> Result<Self, BrowserError> {
        let (ws, _) = tokio::time::timeout(
            WS_HANDSHAKE_TIMEOUT,
            tokio_tungstenite::connect_async(ws_url),
        )
        .await
        .map_err(|_| BrowserError::Timeout("DevTools WebSocket handshake".into()))??;

        let mut browser = Self {
            ws: Some(ws),
            next_id: 1,
            timeout,
            network: NetworkIdleTracker::default(),
            process: None,
            profile_dir: None,
        };

        browser.call("Page.enable", serde_json::json!({})).await?;
        browser.call("Network.enable", serde_json::json!({})).await?;

        debug!(ws_url, "attached to page target");
        Ok(browser)
    }

    /// Hands ownership of the Chrome process and profile to this session.
    pub(crate) fn with_process(mut self, process: Child, profile_dir: TempDir) -> Self {
        self.process = Some(process);
        self.profile_dir = Some(profile_dir);
        self
    }

    /// Sends a command and waits for the reply with the same id.
    async fn call(
        &mut self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, BrowserError> {
        let id = self.next_id;
        self.next_id += 1;

        let json = serde_json::to_string(&CdpCommand { id, method, params })?;
        let deadline = Instant::now() + self.timeout;
        let timed_out = || BrowserError::Timeout(format!("reply to {method}"));

        let ws = self.ws.as_mut().ok_or(BrowserError::Closed)?;
        tokio::time::timeout_at(deadline, ws.send(WsMessage::Text(json.into())))
            .await
            .map_err(|_| timed_out())??;

        loop {
            let frame = tokio::time::timeout_at(deadline, self.read_frame())
                .await
                .map_err(|_| timed_out())??;

            if frame.id != Some(id) {
                continue;
            }
            if let Some(err) = frame.error {
                return Err(BrowserError::Protocol {
                    code: err.code,
                    message: err.message,
                });
            }
            return Ok(frame.result.unwrap_or(serde_json::Value::Null));
        }
    }

    /// Reads the next JSON frame, feeding events to the network tracker.
    async fn read_frame(&mut self) -> Result<CdpFrame, BrowserError> {
        let ws = self.ws.as_mut().ok_or(BrowserError::Closed)?;
        loop {
            let msg = match ws.next().await {
                Some(msg) => msg?,
                None => return Err(BrowserError::Closed),
            };
            let text = match msg {
                WsMessage::Text(t) => t,
                WsMessage::Close(_) => return Err(BrowserError::Closed),
                _ => continue,
            };
            let frame: CdpFrame = match serde_json::from_str(&text) {
                Ok(f) => f,
                Err(e) => {
                    trace!(error = %e, "skipping unparsable DevTools frame");
                    continue;
                }
            };
            if let Some(method) = frame.method.as_deref() {
                self.network.observe(method, &frame.params);
            }
            return Ok(frame);
        }
    }

    async fn navigate_page(&mut self, url: &str, wait: WaitPolicy) -> Result<(), BrowserError> {
        self.network.reset();

        let result = self
            .call("Page.navigate", serde_json::json!({ "url": url }))
            .await?;
        let nav: NavigateResult = serde_json::from_value(result)?;
        if let Some(reason) = nav.error_text.filter(|e| !e.is_empty()) {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                reason,
            });
        }

        let deadline = Instant::now() + self.timeout;
        let timed_out = || BrowserError::Timeout(format!("navigation to {url}"));

        while !self.network.load_fired() {
            tokio::time::timeout_at(deadline, self.read_frame())
                .await
                .map_err(|_| timed_out())??;
        }

        if wait == WaitPolicy::NetworkIdle {
            // Only request activity restarts the quiet window; other events
            // (console, websocket frames) are read and ignored.
            let mut quiet_since = Instant::now();
            loop {
                let idle = self.network.inflight() == 0;
                let now = Instant::now();
                if idle && now >= quiet_since + NETWORK_IDLE_WINDOW {
                    break;
                }
                if now >= deadline {
                    return Err(timed_out());
                }

                let wake = if idle {
                    (quiet_since + NETWORK_IDLE_WINDOW).min(deadline)
                } else {
                    deadline
                };
                if let Ok(frame) = tokio::time::timeout_at(wake, self.read_frame()).await {
                    frame?;
                    if !idle || self.network.inflight() > 0 {
                        quiet_since = Instant::now();
                    }
                }
            }
        }

        debug!(url, ?wait, "navigation settled");
        Ok(())
    }

    async fn evaluate_expression(
        &mut self,
        expression: &str,
    ) -> Result<serde_json::Value, BrowserError> {
        let result = self
            .call(
                "Runtime.evaluate",
                serde_json::json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                }),
            )
            .await?;

        let eval: EvalResult = serde_json::from_value(result)?;
        if let Some(details) = eval.exception_details {
            let message = details
                .exception
                .map(|e| e.description)
                .filter(|d| !d.is_empty())
                .unwrap_or(details.text);
            return Err(BrowserError::Evaluation(message));
        }
        Ok(eval.result.value)
    }

    async fn add_cookie(&mut self, cookie: &Cookie) -> Result<(), BrowserError> {
        let mut params = serde_json::json!({
            "name": cookie.name,
            "value": cookie.value,
            "domain": cookie.domain,
            "path": cookie.path,
            "secure": cookie.secure,
            "httpOnly": cookie.http_only,
        });
        // Omitting `expires` keeps the cookie without an expiry.
        if cookie.expires >= 0.0 {
            params["expires"] = serde_json::json!(cookie.expires);
        }

        let result = self.call("Network.setCookie", params).await?;
        if result.get("success").and_then(serde_json::Value::as_bool) == Some(false) {
            return Err(BrowserError::CookieRejected(cookie.name.clone()));
        }
        Ok(())
    }

    async fn location(&mut self) -> Result<String, BrowserError> {
        let value = self.evaluate_expression("window.location.href").await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| BrowserError::Evaluation(format!("location is not a string: {value}")))
    }

    async fn all_cookies(&mut self) -> Result<Vec<Cookie>, BrowserError> {
        let result = self
            .call("Network.getAllCookies", serde_json::json!({}))
            .await?;
        let jar: CookiesResult = serde_json::from_value(result)?;
        Ok(jar.cookies)
    }

    async fn shutdown(&mut self) -> Result<(), BrowserError> {
        if let Some(mut ws) = self.ws.take() {
            let id = self.next_id;
            self.next_id += 1;
            let cmd = serde_json::to_string(&CdpCommand {
                id,
                method: "Browser.close",
                params: serde_json::json!({}),
            })?;
            // The socket may drop before Chrome replies.
            if let Err(e) = ws.send(WsMessage::Text(cmd.into())).await {
                debug!(error = %e, "Browser.close not delivered");
            }
            let _ = ws.close(None).await;
        }

        if let Some(mut child) = self.process.take() {
            if tokio::time::timeout(PROCESS_EXIT_GRACE, child.wait())
                .await
                .is_err()
            {
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "failed to kill browser process");
                }
            }
        }

        if let Some(dir) = self.profile_dir.take() {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                warn!(path = %path.display(), error = %e, "failed to remove browser profile");
            }
        }

        Ok(())
    }
}

impl Browser for CdpBrowser {
    fn navigate<'a>(
        &'a mut self,
        url: &'a str,
        wait: WaitPolicy,
    ) -> BoxFuture<'a, Result<(), BrowserError>> {
        self.navigate_page(url, wait).boxed()
    }

    fn evaluate<'a>(
        &'a mut self,
        expression: &'a str,
    ) -> BoxFuture<'a, Result<serde_json::Value, BrowserError>> {
        self.evaluate_expression(expression).boxed()
    }

    fn set_cookie<'a>(&'a mut self, cookie: &'a Cookie) -> BoxFuture<'a, Result<(), BrowserError>> {
        self.add_cookie(cookie).boxed()
    }

    fn current_url(&mut self) -> BoxFuture<'_, Result<String, BrowserError>> {
        self.location().boxed()
    }

    fn cookies(&mut self) -> BoxFuture<'_, Result<Vec<Cookie>, BrowserError>> {
        self.all_cookies().boxed()
    }

    fn close(&mut self) -> BoxFuture<'_, Result<(), BrowserError>> {
        self.shutdown().boxed()
    }
}
