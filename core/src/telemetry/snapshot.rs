//! telemetry/snapshot.rs
//!
//! Immutable view of a session's counters, with the derived average.

use std::fmt;
use serde::Serialize;

use crate::session::SessionId;
use crate::telemetry::counters::SessionCounters;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub session_id: SessionId,
    pub bytes_encrypted: u64,
    pub bytes_decrypted: u64,
    pub max_request: u64,
    pub op_count: u64,
    /// Bytes per segment, 0 when nothing ran.
    pub avg_request: u64,
}

impl StatsSnapshot {
    pub fn from(session_id: SessionId, counters: &SessionCounters) -> Self {
        let avg_request = if counters.op_count > 0 {
            counters.total_bytes() / counters.op_count
        } else {
            0
        };

        Self {
            session_id,
            bytes_encrypted: counters.bytes_encrypted,
            bytes_decrypted: counters.bytes_decrypted,
            max_request: counters.max_request,
            op_count: counters.op_count,
            avg_request,
        }
    }

    pub fn to_json(&self) -> String {
        // Plain integers only, serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Usage in Bytes: enc={}, dec={}, max={}, avg={}, cnt={}",
            self.bytes_encrypted, self.bytes_decrypted, self.max_request, self.avg_request, self.op_count
        )
    }
}
