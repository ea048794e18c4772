use thiserror::Error;

use crate::crypto::CryptoError;
use crate::session::SessionId;

/// Error classes. Callers decide retry policy per class; the core never retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad algorithm, bad key length, nothing requested. No session created.
    Configuration,
    /// Unknown session id. A caller logic error, not transient.
    Lookup,
    /// Bad request contents. Output of the failed call must not be trusted.
    Data,
    /// Allocation failure or id space exhaustion.
    Resource,
    /// The transform itself failed mid-stream.
    Transform,
}

/// Unified error covering session management, request validation and transforms.
/// - Ergonomic `From<CryptoError>` enables `?` across the engine.
/// - Messages aim to be stable and contextual for logs.
#[derive(Debug, Error)]
pub enum CryptodevError {
    #[error("both 'cipher' and 'mac' unset")]
    NothingRequested,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Transform could not be set up at session creation.
    #[error("session setup failed: {0}")]
    Setup(#[source] CryptoError),

    #[error("session with sid=0x{0:08X} not found")]
    SessionNotFound(SessionId),

    #[error("no free session id after {attempts} draws")]
    SessionIdExhausted { attempts: usize },

    #[error("invalid operation op={0}")]
    InvalidOperation(u16),

    #[error("segment {segment}: no flags set")]
    EmptySegmentFlags { segment: usize },

    #[error("segment {segment}: cipher requested but session has no cipher")]
    MissingCipher { segment: usize },

    #[error("segment {segment}: hash requested but session has no hash")]
    MissingHash { segment: usize },

    #[error("segment {segment}: data size ({len}) isn't a multiple of block size ({block_size})")]
    Misaligned { segment: usize, len: usize, block_size: usize },

    #[error("invalid iv length: expected={expected}, actual={actual}")]
    InvalidIv { expected: usize, actual: usize },

    #[error("failed to allocate {size}-byte staging buffer")]
    StagingAlloc { size: usize },

    /// Transform-internal failure while streaming.
    #[error("CryptoAPI failure: {0}")]
    Transform(#[from] CryptoError),
}

impl CryptodevError {
    pub fn kind(&self) -> ErrorKind {
        use CryptodevError::*;
        match self {
            NothingRequested | InvalidConfig(_) | Setup(_) => ErrorKind::Configuration,
            SessionNotFound(_) => ErrorKind::Lookup,
            InvalidOperation(_)
            | EmptySegmentFlags { .. }
            | MissingCipher { .. }
            | MissingHash { .. }
            | Misaligned { .. }
            | InvalidIv { .. } => ErrorKind::Data,
            SessionIdExhausted { .. } | StagingAlloc { .. } => ErrorKind::Resource,
            Transform(_) => ErrorKind::Transform,
        }
    }
}

pub type Result<T, E = CryptodevError> = std::result::Result<T, E>;
