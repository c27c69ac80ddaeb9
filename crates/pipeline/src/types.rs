//! Phase machines and events for the upload flow.

use std::fmt;

/// Rejected phase transition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid phase transition: {from} -> {to}")]
pub struct PhaseError {
    pub from: String,
    pub to: String,
}

/// A forward-only state machine. Completed and failed phases are terminal;
/// any other phase may move to failed, and other moves must be allowed by
/// [`Phase::can_advance`].
pub trait Phase: Clone + fmt::Debug + PartialEq {
    fn is_failed(&self) -> bool;

    fn is_completed(&self) -> bool;

    fn is_terminal(&self) -> bool {
        self.is_failed() || self.is_completed()
    }

    /// Whether `next` is a legal forward move from `self`.
    fn can_advance(&self, next: &Self) -> bool;

    fn advance(&mut self, next: Self) -> Result<(), PhaseError> {
        let allowed = !self.is_terminal() && (next.is_failed() || self.can_advance(&next));
        if !allowed {
            return Err(PhaseError {
                from: format!("{self:?}"),
                to: format!("{next:?}"),
            });
        }
        *self = next;
        Ok(())
    }
}

/// Progress of the SSO sign-in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthPhase {
    #[default]
    Start,
    SsoNavigated,
    RedirectParsed,
    CookieSet,
    RedirectFollowed,
    PortalVerified,
    Failed,
}

impl AuthPhase {
    fn ordinal(self) -> u8 {
        match self {
            Self::Start => 0,
            Self::SsoNavigated => 1,
            Self::RedirectParsed => 2,
            Self::CookieSet => 3,
            Self::RedirectFollowed => 4,
            Self::PortalVerified => 5,
            Self::Failed => u8::MAX,
        }
    }
}

impl Phase for AuthPhase {
    fn is_failed(&self) -> bool {
        *self == Self::Failed
    }

    fn is_completed(&self) -> bool {
        *self == Self::PortalVerified
    }

    fn can_advance(&self, next: &Self) -> bool {
        next.ordinal() == self.ordinal() + 1
    }
}

/// Progress of the chunked transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum UploadPhase {
    #[default]
    Idle,
    Initiated,
    /// Chunk `n` is being sent; every chunk below `n` succeeded.
    Uploading(u64),
    Completed,
    Failed(String),
}

impl Phase for UploadPhase {
    fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    fn is_completed(&self) -> bool {
        *self == Self::Completed
    }

    fn can_advance(&self, next: &Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Initiated)
                | (Self::Initiated, Self::Uploading(0))
                | (Self::Uploading(_), Self::Completed)
        ) || matches!((self, next), (Self::Uploading(a), Self::Uploading(b)) if *b == a + 1)
    }
}

/// Progress of a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PipelinePhase {
    #[default]
    Start,
    InputValidation,
    Authenticating,
    PortalCheck,
    Uploading,
    Completed,
    Failed,
}

impl PipelinePhase {
    fn ordinal(self) -> u8 {
        match self {
            Self::Start => 0,
            Self::InputValidation => 1,
            Self::Authenticating => 2,
            Self::PortalCheck => 3,
            Self::Uploading => 4,
            Self::Completed => 5,
            Self::Failed => u8::MAX,
        }
    }
}

impl Phase for PipelinePhase {
    fn is_failed(&self) -> bool {
        *self == Self::Failed
    }

    fn is_completed(&self) -> bool {
        *self == Self::Completed
    }

    fn can_advance(&self, next: &Self) -> bool {
        next.ordinal() == self.ordinal() + 1
    }
}

/// Outcome of the SSO handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    /// The browser's cookie jar as a `Cookie` header value.
    pub cookie_header: String,
    /// Whether the final location was on the portal host.
    pub verified: bool,
    /// Location the authenticated redirect ended on.
    pub location: String,
}

/// Progress event emitted during an upload.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    /// The portal accepted the chunk layout.
    Initiated { chunk_count: u64 },
    /// Chunk `index` (zero-based) of `total` was accepted.
    ChunkUploaded {
        index: u64,
        total: u64,
        bytes_sent: u64,
        total_bytes: u64,
    },
    /// The completion request succeeded.
    Completed,
    /// The upload stopped.
    Failed { error: String },
}
