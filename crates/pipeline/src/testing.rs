//! Scripted browser and portal doubles shared by the pipeline tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use reupload_browser::{Browser, BrowserError, BrowserLauncher, WaitPolicy};
use reupload_portal_api::{ApiError, PortalApi};
use reupload_protocol::{Cookie, PortalEndpoints, ReUploadRequest, ReUploadResponse};

use crate::auth::BODY_TEXT;
use crate::controller::ApiConnector;

pub(crate) fn forum_redirect() -> String {
    "https://forum.cfx.re/session/sso_provider?sso=payload&sig=abc".to_string()
}

pub(crate) fn sso_body(url: &str) -> String {
    serde_json::json!({ "url": url }).to_string()
}

// ---------------------------------------------------------------------------
// Browser
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub(crate) struct BrowserScript {
    body: String,
    redirects: HashMap<String, String>,
    jar: Vec<Cookie>,
    fail_navigation: Option<String>,
}

impl BrowserScript {
    pub(crate) fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            ..Default::default()
        }
    }

    /// Navigating to `from` leaves the page on `to`.
    pub(crate) fn redirect(mut self, from: &str, to: &str) -> Self {
        self.redirects.insert(from.to_string(), to.to_string());
        self
    }

    pub(crate) fn jar(mut self, jar: Vec<Cookie>) -> Self {
        self.jar = jar;
        self
    }

    pub(crate) fn fail_navigation(mut self, url: &str) -> Self {
        self.fail_navigation = Some(url.to_string());
        self
    }
}

#[derive(Debug, Default)]
pub(crate) struct BrowserLog {
    pub launches: usize,
    pub calls: Vec<String>,
    pub cookies_set: Vec<Cookie>,
    pub closes: usize,
}

pub(crate) struct ScriptedBrowser {
    script: BrowserScript,
    location: String,
    log: Arc<Mutex<BrowserLog>>,
}

impl ScriptedBrowser {
    pub(crate) fn new(script: BrowserScript) -> (Self, Arc<Mutex<BrowserLog>>) {
        let log = Arc::new(Mutex::new(BrowserLog::default()));
        (Self::with_log(script, Arc::clone(&log)), log)
    }

    fn with_log(script: BrowserScript, log: Arc<Mutex<BrowserLog>>) -> Self {
        Self {
            script,
            location: "about:blank".to_string(),
            log,
        }
    }

    fn record(&self, call: String) {
        self.log.lock().unwrap().calls.push(call);
    }
}

impl Browser for ScriptedBrowser {
    fn navigate<'a>(
        &'a mut self,
        url: &'a str,
        wait: WaitPolicy,
    ) -> BoxFuture<'a, Result<(), BrowserError>> {
        self.record(format!("navigate {url} {wait:?}"));
        let result = if self.script.fail_navigation.as_deref() == Some(url) {
            Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: "net::ERR_CONNECTION_RESET".to_string(),
            })
        } else {
            self.location = self
                .script
                .redirects
                .get(url)
                .cloned()
                .unwrap_or_else(|| url.to_string());
            Ok(())
        };
        async move { result }.boxed()
    }

    fn evaluate<'a>(
        &'a mut self,
        expression: &'a str,
    ) -> BoxFuture<'a, Result<serde_json::Value, BrowserError>> {
        self.record(format!("evaluate {expression}"));
        let value = if expression == BODY_TEXT {
            serde_json::Value::String(self.script.body.clone())
        } else {
            serde_json::Value::Null
        };
        async move { Ok(value) }.boxed()
    }

    fn set_cookie<'a>(&'a mut self, cookie: &'a Cookie) -> BoxFuture<'a, Result<(), BrowserError>> {
        self.record(format!("set_cookie {}", cookie.name));
        self.log.lock().unwrap().cookies_set.push(cookie.clone());
        async move { Ok(()) }.boxed()
    }

    fn current_url(&mut self) -> BoxFuture<'_, Result<String, BrowserError>> {
        self.record("current_url".to_string());
        let location = self.location.clone();
        async move { Ok(location) }.boxed()
    }

    fn cookies(&mut self) -> BoxFuture<'_, Result<Vec<Cookie>, BrowserError>> {
        self.record("cookies".to_string());
        let jar = self.script.jar.clone();
        async move { Ok(jar) }.boxed()
    }

    fn close(&mut self) -> BoxFuture<'_, Result<(), BrowserError>> {
        self.record("close".to_string());
        self.log.lock().unwrap().closes += 1;
        async move { Ok(()) }.boxed()
    }
}

pub(crate) struct ScriptedLauncher {
    script: BrowserScript,
    log: Arc<Mutex<BrowserLog>>,
    fail: bool,
}

impl ScriptedLauncher {
    pub(crate) fn new(script: BrowserScript) -> (Self, Arc<Mutex<BrowserLog>>) {
        let log = Arc::new(Mutex::new(BrowserLog::default()));
        let launcher = Self {
            script,
            log: Arc::clone(&log),
            fail: false,
        };
        (launcher, log)
    }

    pub(crate) fn failing() -> (Self, Arc<Mutex<BrowserLog>>) {
        let (mut launcher, log) = Self::new(BrowserScript::default());
        launcher.fail = true;
        (launcher, log)
    }
}

impl BrowserLauncher for ScriptedLauncher {
    fn launch(&self) -> BoxFuture<'_, Result<Box<dyn Browser>, BrowserError>> {
        self.log.lock().unwrap().launches += 1;
        let result: Result<Box<dyn Browser>, BrowserError> = if self.fail {
            Err(BrowserError::Launch("no Chrome executable found".to_string()))
        } else {
            Ok(Box::new(ScriptedBrowser::with_log(
                self.script.clone(),
                Arc::clone(&self.log),
            )))
        };
        async move { result }.boxed()
    }
}

// ---------------------------------------------------------------------------
// Portal API
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ApiCall {
    ReUpload {
        asset_id: String,
        request: ReUploadRequest,
    },
    Chunk {
        asset_id: String,
        chunk_id: u64,
        data: Vec<u8>,
    },
    Complete {
        asset_id: String,
    },
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ApiScript {
    /// `errors` value returned by the initiation call.
    pub errors: serde_json::Value,
    /// Leaves the `errors` key out of the initiation response.
    pub omit_errors: bool,
    pub fail_initiation: bool,
    pub fail_chunk: Option<u64>,
    pub fail_complete: bool,
}

fn scripted_failure(status: u16) -> ApiError {
    ApiError::Api {
        status,
        body: "scripted failure".to_string(),
    }
}

pub(crate) struct ScriptedApi {
    script: ApiScript,
    calls: Arc<Mutex<Vec<ApiCall>>>,
}

impl ScriptedApi {
    pub(crate) fn new(script: ApiScript) -> (Self, Arc<Mutex<Vec<ApiCall>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let api = Self {
            script,
            calls: Arc::clone(&calls),
        };
        (api, calls)
    }

    fn record(&self, call: ApiCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl PortalApi for ScriptedApi {
    fn re_upload<'a>(
        &'a self,
        asset_id: &'a str,
        request: &'a ReUploadRequest,
    ) -> BoxFuture<'a, Result<ReUploadResponse, ApiError>> {
        self.record(ApiCall::ReUpload {
            asset_id: asset_id.to_string(),
            request: request.clone(),
        });
        let result = if self.script.fail_initiation {
            Err(scripted_failure(503))
        } else {
            Ok(ReUploadResponse {
                asset_id: serde_json::json!(asset_id),
                errors: (!self.script.omit_errors).then(|| self.script.errors.clone()),
            })
        };
        async move { result }.boxed()
    }

    fn upload_chunk<'a>(
        &'a self,
        asset_id: &'a str,
        chunk_id: u64,
        data: Vec<u8>,
    ) -> BoxFuture<'a, Result<(), ApiError>> {
        self.record(ApiCall::Chunk {
            asset_id: asset_id.to_string(),
            chunk_id,
            data,
        });
        let result = if self.script.fail_chunk == Some(chunk_id) {
            Err(scripted_failure(500))
        } else {
            Ok(())
        };
        async move { result }.boxed()
    }

    fn complete_upload<'a>(&'a self, asset_id: &'a str) -> BoxFuture<'a, Result<(), ApiError>> {
        self.record(ApiCall::Complete {
            asset_id: asset_id.to_string(),
        });
        let result = if self.script.fail_complete {
            Err(scripted_failure(500))
        } else {
            Ok(())
        };
        async move { result }.boxed()
    }
}

/// Hands out [`ScriptedApi`]s that share one call log.
pub(crate) struct ScriptedConnector {
    script: ApiScript,
    calls: Arc<Mutex<Vec<ApiCall>>>,
    pub cookie_headers: Arc<Mutex<Vec<String>>>,
}

impl ScriptedConnector {
    pub(crate) fn new(script: ApiScript) -> (Self, Arc<Mutex<Vec<ApiCall>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let connector = Self {
            script,
            calls: Arc::clone(&calls),
            cookie_headers: Arc::new(Mutex::new(Vec::new())),
        };
        (connector, calls)
    }
}

impl ApiConnector for ScriptedConnector {
    fn connect(
        &self,
        _endpoints: &PortalEndpoints,
        cookie_header: &str,
    ) -> Result<Box<dyn PortalApi>, ApiError> {
        self.cookie_headers
            .lock()
            .unwrap()
            .push(cookie_header.to_string());
        Ok(Box::new(ScriptedApi {
            script: self.script.clone(),
            calls: Arc::clone(&self.calls),
        }))
    }
}
