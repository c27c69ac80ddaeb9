pub mod constants;
pub mod cookie;
pub mod endpoints;
pub mod messages;

// Re-export primary types for convenience.
pub use cookie::{Cookie, cookie_header, parse_cookie_header};
pub use endpoints::PortalEndpoints;
pub use messages::{ReUploadRequest, ReUploadResponse, SsoResponse};
