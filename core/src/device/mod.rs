//! In-process device surface: one explicit device handle, per-caller contexts,
//! and request dispatch. Copying buffers across a trust boundary is left to
//! whatever transport embeds this.

pub mod command;
pub mod context;

pub use command::{Command, Reply, SingleCrypt};
pub use context::{CryptoContext, CryptoDevice};
