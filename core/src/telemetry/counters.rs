// ### `src/telemetry/counters.rs`

//! telemetry/counters.rs
//! Per-session usage counters.
//!
//! Summary: byte totals per direction, largest single segment, segment count.
//! Diagnostic only; nothing in the engine reads them back.
use std::ops::AddAssign;
use serde::{Serialize, Deserialize};

use crate::engine::CryptOp;

#[derive(Default, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCounters {
    pub bytes_encrypted: u64,
    pub bytes_decrypted: u64,
    /// Largest single segment seen.
    pub max_request: u64,
    /// Segments processed.
    pub op_count: u64,
}

impl SessionCounters {
    /// Record one processed segment of `len` bytes.
    pub fn add(&mut self, op: CryptOp, len: usize) {
        let len = len as u64;
        match op {
            CryptOp::Encrypt => self.bytes_encrypted += len,
            CryptOp::Decrypt => self.bytes_decrypted += len,
        }
        self.max_request = self.max_request.max(len);
        self.op_count += 1;
    }

    pub fn total_bytes(&self) -> u64 {
        self.bytes_encrypted + self.bytes_decrypted
    }

    pub fn merge(&mut self, other: &SessionCounters) {
        self.bytes_encrypted += other.bytes_encrypted;
        self.bytes_decrypted += other.bytes_decrypted;
        self.max_request = self.max_request.max(other.max_request);
        self.op_count += other.op_count;
    }
}

impl AddAssign for SessionCounters {
    fn add_assign(&mut self, rhs: Self) {
        self.merge(&rhs);
    }
}
