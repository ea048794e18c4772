//! cryptodev-core
//!
//! Session table and vectored cipher/hash execution engine.
//! No transport, no FFI; whatever copies buffers in and out sits on top.

#![forbid(unsafe_code)]

// Shared and top level
pub mod constants;
pub mod types;
pub mod utils;
pub mod config;

// Transforms
pub mod crypto;
pub mod telemetry;

// Sessions and execution
pub mod session;
pub mod engine;
pub mod device;

// -----------------------------------------------------------------------------
// Prelude (Rust users)
// -----------------------------------------------------------------------------
pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::crypto::{CipherAlg, HashAlg, SoftwareProvider, TransformProvider};
    pub use crate::device::{Command, CryptoContext, CryptoDevice, Reply, SingleCrypt};
    pub use crate::engine::{CryptOp, CryptOutput, CryptRequest, Segment, SegmentFlags};
    pub use crate::session::{SessionId, SessionOp};
    pub use crate::telemetry::StatsSnapshot;
    pub use crate::types::{CryptodevError, ErrorKind, Result};
}
