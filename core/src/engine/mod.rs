//! Crypto execution engine.
//!
//! Stateless orchestration over a locked session: the engine owns nothing
//! between calls except its sizing configuration.

pub mod types;
pub mod run;

pub use types::{CryptOp, CryptOutput, CryptRequest, Segment, SegmentFlags};
pub use run::CryptoEngine;
