//! Browser automation behind a narrow, object-safe interface.
//!
//! The authentication flow only needs to navigate, evaluate script in the
//! page, set and read cookies, ask for the current location and close the
//! browser. [`Browser`] exposes exactly that; [`CdpBrowser`] implements it
//! on top of the Chrome DevTools Protocol and [`ChromeLauncher`] starts a
//! local headless Chrome to drive.

mod cdp;
mod launch;

use futures_util::future::BoxFuture;
use reupload_protocol::Cookie;
use tokio_tungstenite::tungstenite;

pub use cdp::{CdpBrowser, NetworkIdleTracker};
pub use launch::{ChromeLauncher, LaunchOptions, find_on_path};

/// How long a navigation waits before it is considered finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPolicy {
    /// The page's `load` event fired.
    Load,
    /// `load` fired and no request has been in flight for a short quiet
    /// period (puppeteer's `networkidle0`).
    NetworkIdle,
}

/// Errors produced by the browser layer.
#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WebSocket error: {0}")]
    Ws(#[from] tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("timed out waiting for {0}")]
    Timeout(String),

    #[error("DevTools connection closed")]
    Closed,

    #[error("DevTools error {code}: {message}")]
    Protocol { code: i64, message: String },

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("script evaluation failed: {0}")]
    Evaluation(String),

    #[error("cookie rejected: {0}")]
    CookieRejected(String),
}

/// A single browser page plus its cookie jar.
///
/// Implementations own the underlying browser process or connection;
/// [`close`](Browser::close) releases it and must tolerate repeated calls.
pub trait Browser: Send {
    /// Navigates the page to `url` and waits according to `wait`.
    fn navigate<'a>(
        &'a mut self,
        url: &'a str,
        wait: WaitPolicy,
    ) -> BoxFuture<'a, Result<(), BrowserError>>;

    /// Evaluates a script expression in the page and returns its JSON value.
    fn evaluate<'a>(
        &'a mut self,
        expression: &'a str,
    ) -> BoxFuture<'a, Result<serde_json::Value, BrowserError>>;

    /// Adds `cookie` to the browser's cookie jar.
    fn set_cookie<'a>(&'a mut self, cookie: &'a Cookie) -> BoxFuture<'a, Result<(), BrowserError>>;

    /// Returns the page's current location.
    fn current_url(&mut self) -> BoxFuture<'_, Result<String, BrowserError>>;

    /// Returns every cookie in the jar, in browser enumeration order.
    fn cookies(&mut self) -> BoxFuture<'_, Result<Vec<Cookie>, BrowserError>>;

    /// Shuts the browser down.
    fn close(&mut self) -> BoxFuture<'_, Result<(), BrowserError>>;
}

/// Acquires a fresh [`Browser`] for one run.
pub trait BrowserLauncher: Send + Sync {
    fn launch(&self) -> BoxFuture<'_, Result<Box<dyn Browser>, BrowserError>>;
}
