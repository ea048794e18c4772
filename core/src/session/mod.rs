//! Sessions and the per-context session table.
//!
//! A session binds at most one cipher and at most one hash transform under a
//! random 32-bit id. The table owns sessions; callers borrow them through
//! [`LockedSession`] guards for the duration of one engine run.

pub mod types;
pub mod lock;
pub mod table;

pub use types::{IdSource, RandomIds, SessionId, SessionOp};
pub use lock::{LockedSession, Session, SessionState};
pub use table::SessionTable;
