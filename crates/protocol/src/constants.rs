use std::time::Duration;

/// Host the portal and forum live under unless configured otherwise.
pub const DEFAULT_HOST: &str = "cfx.re";

/// Name of the forum session cookie injected into the browser.
pub const SESSION_COOKIE_NAME: &str = "_t";

/// Sentinel `expires` value meaning "do not expire".
pub const COOKIE_NO_EXPIRY: f64 = -1.0;

/// File name sent with every chunk part.
pub const CHUNK_FILE_NAME: &str = "blob";

/// Content type of every chunk part.
pub const CHUNK_CONTENT_TYPE: &str = "application/octet-stream";

/// Quiet period with no in-flight requests before a page counts as idle.
pub const NETWORK_IDLE_WINDOW: Duration = Duration::from_millis(500);

/// Default bound on a single navigation or CDP round trip.
pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);
