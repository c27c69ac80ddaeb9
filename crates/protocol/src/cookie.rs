//! Browser cookies and the `Cookie` request header codec.

use serde::{Deserialize, Serialize};

use crate::constants::{COOKIE_NO_EXPIRY, SESSION_COOKIE_NAME};

/// A cookie as held by the browser's cookie jar.
///
/// Field names follow the DevTools protocol so jar entries deserialize
/// directly from `Network.getAllCookies`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default = "default_path")]
    pub path: String,
    /// Seconds since the epoch; negative means "do not expire".
    #[serde(default = "default_expires")]
    pub expires: f64,
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub session: bool,
}

fn default_path() -> String {
    "/".into()
}

fn default_expires() -> f64 {
    COOKIE_NO_EXPIRY
}

impl Cookie {
    /// Builds the forum session cookie (`_t`) scoped to `domain`.
    ///
    /// Path `/`, HTTP-only, secure, persistent with no expiry.
    pub fn forum_session(value: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: SESSION_COOKIE_NAME.into(),
            value: value.into(),
            domain: domain.into(),
            path: default_path(),
            expires: COOKIE_NO_EXPIRY,
            size: 1,
            http_only: true,
            secure: true,
            session: false,
        }
    }

    /// Returns `true` if the cookie carries no expiry.
    pub fn is_persistent_without_expiry(&self) -> bool {
        !self.session && self.expires < 0.0
    }
}

/// Renders a cookie jar as a `Cookie` header value.
///
/// Pairs are emitted as `name=value` in jar order, joined by `"; "`.
pub fn cookie_header(cookies: &[Cookie]) -> String {
    cookies
        .iter()
        .map(|c| format!("{}={}", c.name, c.value))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Splits a `Cookie` header value back into `(name, value)` pairs.
///
/// Empty segments and segments without `=` are skipped. Values keep any
/// embedded `=` characters.
pub fn parse_cookie_header(header: &str) -> Vec<(String, String)> {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().to_string()))
        })
        .collect()
}
