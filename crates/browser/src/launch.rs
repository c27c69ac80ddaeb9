//! Starts a local headless Chrome and attaches to its first page.
//!
//! Chrome is started with `--remote-debugging-port=0`; the chosen port is
//! read from the `DevTools listening on ws://...` line on stderr, then the
//! page list is fetched from the debugger's `/json/list` endpoint.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use reupload_protocol::constants::DEFAULT_NAVIGATION_TIMEOUT;
use serde::Deserialize;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStderr, Command};
use tracing::{debug, info, trace};

use crate::cdp::CdpBrowser;
use crate::{Browser, BrowserError, BrowserLauncher};

/// Timeout for Chrome to print its DevTools endpoint.
const STARTUP_TIMEOUT: Duration = Duration::from_secs(20);

/// Timeout for the HTTP target discovery request.
const HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// Executable names searched on `PATH`, most specific first.
const CHROME_CANDIDATES: &[&str] = &[
    "google-chrome-stable",
    "google-chrome",
    "chromium",
    "chromium-browser",
    "chrome",
];

/// Fallback executable name when setup is skipped and none is configured.
const FALLBACK_EXECUTABLE: &str = "chromium";

/// Name prefix of the throwaway profile directories.
const PROFILE_DIR_PREFIX: &str = "reupload-chrome-";

/// Prefix of the stderr line announcing the browser endpoint.
const DEVTOOLS_LINE_PREFIX: &str = "DevTools listening on ";

/// How to start the browser.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Explicit Chrome/Chromium binary.
    pub executable: Option<PathBuf>,
    pub headless: bool,
    /// Extra command-line switches.
    pub args: Vec<String>,
    /// Bound on each navigation and DevTools round trip.
    pub navigation_timeout: Duration,
    /// Skip locating and checking the browser binary.
    pub skip_setup: bool,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            executable: None,
            headless: true,
            args: vec!["--no-sandbox".into(), "--disable-setuid-sandbox".into()],
            navigation_timeout: DEFAULT_NAVIGATION_TIMEOUT,
            skip_setup: false,
        }
    }
}

/// A debuggable target listed by `/json/list`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TargetInfo {
    #[serde(rename = "type")]
    target_type: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    web_socket_debugger_url: String,
}

/// Launches headless Chrome processes.
#[derive(Debug, Clone, Default)]
pub struct ChromeLauncher {
    options: LaunchOptions,
}

impl ChromeLauncher {
    pub fn new(options: LaunchOptions) -> Self {
        Self { options }
    }

    /// Picks the browser binary to run.
    pub fn resolve_executable(&self) -> Result<PathBuf, BrowserError> {
        let path_var = std::env::var_os("PATH").unwrap_or_default();
        resolve_executable(&self.options, &path_var)
    }

    async fn start(&self) -> Result<CdpBrowser, BrowserError> {
        self.start_in(&std::env::temp_dir()).await
    }

    /// Launches with a fresh profile under `profile_root`. The profile is
    /// removed when the returned session, or any early error, drops it.
    async fn start_in(&self, profile_root: &Path) -> Result<CdpBrowser, BrowserError> {
        let executable = self.resolve_executable()?;
        let profile = tempfile::Builder::new()
            .prefix(PROFILE_DIR_PREFIX)
            .tempdir_in(profile_root)?;

        let mut cmd = Command::new(&executable);
        cmd.args(chrome_args(&self.options, profile.path()))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        info!(executable = %executable.display(), "launching browser");
        let mut child = cmd.spawn().map_err(|e| {
            BrowserError::Launch(format!("failed to start {}: {e}", executable.display()))
        })?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| BrowserError::Launch("browser stderr not captured".into()))?;

        let browser_ws = tokio::time::timeout(STARTUP_TIMEOUT, read_devtools_endpoint(stderr))
            .await
            .map_err(|_| BrowserError::Timeout("browser DevTools endpoint".into()))??;

        let addr = debugger_http_addr(&browser_ws)
            .ok_or_else(|| BrowserError::Launch(format!("unexpected endpoint: {browser_ws}")))?;
        let raw = http_get_json(&addr, "/json/list").await?;
        let targets: Vec<TargetInfo> = serde_json::from_str(&raw)?;
        let page = find_page_target(&targets)?;
        debug!(url = %page.url, "found page target");

        let browser = CdpBrowser::connect(&page.web_socket_debugger_url, self.options.navigation_timeout)
            .await?
            .with_process(child, profile);
        Ok(browser)
    }
}

impl BrowserLauncher for ChromeLauncher {
    fn launch(&self) -> BoxFuture<'_, Result<Box<dyn Browser>, BrowserError>> {
        async move {
            let browser = self.start().await?;
            Ok(Box::new(browser) as Box<dyn Browser>)
        }
        .boxed()
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn resolve_executable(options: &LaunchOptions, path_var: &OsStr) -> Result<PathBuf, BrowserError> {
    if let Some(exe) = &options.executable {
        if !options.skip_setup && !exe.is_file() {
            return Err(BrowserError::Launch(format!(
                "browser executable not found: {}",
                exe.display()
            )));
        }
        return Ok(exe.clone());
    }

    if options.skip_setup {
        return Ok(PathBuf::from(FALLBACK_EXECUTABLE));
    }

    find_on_path(CHROME_CANDIDATES, path_var).ok_or_else(|| {
        BrowserError::Launch(
            "no Chrome or Chromium executable found on PATH; set browser.executable".into(),
        )
    })
}

/// Returns the first `candidates` entry found as a file in `path_var`.
pub fn find_on_path(candidates: &[&str], path_var: &OsStr) -> Option<PathBuf> {
    let dirs: Vec<PathBuf> = std::env::split_paths(path_var).collect();
    candidates.iter().find_map(|name| {
        dirs.iter()
            .map(|dir| dir.join(name))
            .find(|path| path.is_file())
    })
}

fn chrome_args(options: &LaunchOptions, profile_dir: &Path) -> Vec<String> {
    let mut args = vec![
        "--remote-debugging-port=0".to_string(),
        format!("--user-data-dir={}", profile_dir.display()),
        "--no-first-run".into(),
        "--no-default-browser-check".into(),
    ];
    if options.headless {
        args.push("--headless=new".into());
    }
    args.extend(options.args.iter().cloned());
    args.push("about:blank".into());
    args
}

/// Reads stderr until the DevTools endpoint line, then keeps draining it in
/// the background so Chrome never blocks on a full pipe.
async fn read_devtools_endpoint(stderr: ChildStderr) -> Result<String, BrowserError> {
    let mut lines = BufReader::new(stderr).lines();
    while let Some(line) = lines.next_line().await? {
        if let Some(url) = parse_devtools_line(&line) {
            tokio::spawn(async move {
                while let Ok(Some(line)) = lines.next_line().await {
                    trace!(target: "reupload::chrome", "{line}");
                }
            });
            return Ok(url);
        }
        trace!(target: "reupload::chrome", "{line}");
    }
    Err(BrowserError::Launch(
        "browser exited before announcing its DevTools endpoint".into(),
    ))
}

fn parse_devtools_line(line: &str) -> Option<String> {
    let url = line.trim().strip_prefix(DEVTOOLS_LINE_PREFIX)?.trim();
    url.starts_with("ws://").then(|| url.to_string())
}

/// Extracts `host:port` from `ws://host:port/devtools/browser/<id>`.
fn debugger_http_addr(ws_url: &str) -> Option<String> {
    let rest = ws_url.strip_prefix("ws://")?;
    let addr = rest.split('/').next()?;
    (!addr.is_empty()).then(|| addr.to_string())
}

fn find_page_target(targets: &[TargetInfo]) -> Result<&TargetInfo, BrowserError> {
    targets
        .iter()
        .find(|t| t.target_type == "page" && !t.web_socket_debugger_url.is_empty())
        .ok_or_else(|| BrowserError::Launch("browser exposes no page target".into()))
}

/// Minimal HTTP GET against the local debugger endpoint.
async fn http_get_json(addr: &str, path: &str) -> Result<String, BrowserError> {
    let mut stream = tokio::time::timeout(HTTP_TIMEOUT, tokio::net::TcpStream::connect(addr))
        .await
        .map_err(|_| BrowserError::Timeout("DevTools HTTP connection".into()))??;

    let request = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await?;

    let mut response = Vec::new();
    tokio::time::timeout(HTTP_TIMEOUT, stream.read_to_end(&mut response))
        .await
        .map_err(|_| BrowserError::Timeout("DevTools HTTP response".into()))??;

    let response = String::from_utf8_lossy(&response);
    let body_start = response
        .find("\r\n\r\n")
        .map(|i| i + 4)
        .ok_or_else(|| BrowserError::Launch("invalid HTTP response from DevTools".into()))?;

    Ok(response[body_start..].to_string())
}
