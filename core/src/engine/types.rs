use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

use crate::constants::op_codes;
use crate::session::SessionId;
use crate::types::{CryptodevError, Result};

/// Direction of one request.
#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, TryFromPrimitive, Serialize, Deserialize)]
pub enum CryptOp {
    Encrypt = op_codes::COP_ENCRYPT,
    Decrypt = op_codes::COP_DECRYPT,
}

impl CryptOp {
    /// Convert a raw op code, rejecting anything but encrypt/decrypt.
    pub fn from_raw(raw: u16) -> Result<Self> {
        Self::try_from(raw).map_err(|_| {
            log::debug!("invalid operation op={}", raw);
            CryptodevError::InvalidOperation(raw)
        })
    }
}

bitflags::bitflags! {
    /// Per-segment processing flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SegmentFlags: u16 {
        /// Run the segment through the cipher and append it to the output.
        const CIPHER = 0b0000_0001;

        /// Feed the segment's plaintext to the hash.
        const HASH   = 0b0000_0010;

        const BOTH = Self::CIPHER.bits() | Self::HASH.bits();
    }
}

/// One source buffer of a vectored request.
#[derive(Debug, Clone, Copy)]
pub struct Segment<'a> {
    pub src: &'a [u8],
    pub flags: SegmentFlags,
}

impl<'a> Segment<'a> {
    pub fn new(src: &'a [u8], flags: SegmentFlags) -> Self {
        Self { src, flags }
    }

    pub fn cipher(src: &'a [u8]) -> Self {
        Self::new(src, SegmentFlags::CIPHER)
    }

    pub fn hash(src: &'a [u8]) -> Self {
        Self::new(src, SegmentFlags::HASH)
    }

    pub fn both(src: &'a [u8]) -> Self {
        Self::new(src, SegmentFlags::BOTH)
    }

    pub fn len(&self) -> usize {
        self.src.len()
    }

    pub fn is_empty(&self) -> bool {
        self.src.is_empty()
    }
}

/// A vectored request. A single-buffer request is one segment.
#[derive(Debug, Clone)]
pub struct CryptRequest<'a> {
    pub op: CryptOp,
    pub session_id: SessionId,
    /// Re-primes the cipher IV when present; otherwise the chain continues.
    pub iv: Option<&'a [u8]>,
    pub segments: Vec<Segment<'a>>,
}

impl<'a> CryptRequest<'a> {
    pub fn new(op: CryptOp, session_id: SessionId) -> Self {
        Self { op, session_id, iv: None, segments: Vec::new() }
    }

    pub fn encrypt(session_id: SessionId) -> Self {
        Self::new(CryptOp::Encrypt, session_id)
    }

    pub fn decrypt(session_id: SessionId) -> Self {
        Self::new(CryptOp::Decrypt, session_id)
    }

    pub fn with_iv(mut self, iv: &'a [u8]) -> Self {
        self.iv = Some(iv);
        self
    }

    pub fn segment(mut self, segment: Segment<'a>) -> Self {
        self.segments.push(segment);
        self
    }

    /// Bytes the destination receives on success.
    pub fn output_len(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| s.flags.contains(SegmentFlags::CIPHER))
            .map(Segment::len)
            .sum()
    }

    pub fn total_len(&self) -> usize {
        self.segments.iter().map(Segment::len).sum()
    }
}

/// Destination surface of a run.
///
/// After a failed run `dst` holds whatever was written before the failure and
/// must not be trusted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CryptOutput {
    /// Cipher-processed bytes, in segment order.
    pub dst: Vec<u8>,
    /// Finalized digest; empty when the session has no hash.
    pub mac: Vec<u8>,
}

impl CryptOutput {
    pub fn with_capacity(dst: usize) -> Self {
        Self { dst: Vec::with_capacity(dst), mac: Vec::new() }
    }
}
