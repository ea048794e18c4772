//! Vectored crypto execution.
//!
//! Per request:
//! 1. restart the hash;
//! 2. re-prime the cipher IV if one was supplied;
//! 3. stream each segment through one bounded staging buffer;
//! 4. finalize the MAC.
//!
//! The hash always sees plaintext: on encrypt it is updated before the cipher
//! runs, on decrypt after. Flags only select which transforms run per segment.

use crate::config::EngineConfig;
use crate::constants::HASH_MAX_LEN;
use crate::crypto::{CipherHandle, CryptoError, HashHandle};
use crate::engine::types::{CryptOp, CryptOutput, CryptRequest, Segment, SegmentFlags};
use crate::session::{LockedSession, SessionId, SessionState};
use crate::types::{CryptodevError, Result};

/// Fixed-size scratch space for one run. Zeroed on drop so plaintext does not
/// linger in freed memory.
struct StagingBuffer {
    data: Vec<u8>,
}

impl StagingBuffer {
    fn alloc(size: usize) -> Result<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(size)
            .map_err(|_| CryptodevError::StagingAlloc { size })?;
        data.resize(size, 0);
        Ok(Self { data })
    }

    fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Copy `chunk` in and hand back the filled prefix.
    fn stage(&mut self, chunk: &[u8]) -> &mut [u8] {
        let buf = &mut self.data[..chunk.len()];
        buf.copy_from_slice(chunk);
        buf
    }
}

impl Drop for StagingBuffer {
    fn drop(&mut self) {
        self.data.fill(0);
    }
}

/// Stateless driver; borrows a locked session for one call at a time.
#[derive(Debug, Clone)]
pub struct CryptoEngine {
    staging_size: usize,
    collect_stats: bool,
}

impl Default for CryptoEngine {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl CryptoEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            staging_size: config.staging_size,
            collect_stats: config.collect_stats,
        }
    }

    pub fn staging_size(&self) -> usize {
        self.staging_size
    }

    /// Run `req` against an already locked session, appending cipher output
    /// to `out.dst` and writing the digest to `out.mac`.
    ///
    /// The first error aborts the remaining segments. Bytes already appended,
    /// counters already bumped and the cipher's running IV are not rolled back.
    pub fn run(
        &self,
        session: &mut LockedSession,
        req: &CryptRequest<'_>,
        out: &mut CryptOutput,
    ) -> Result<()> {
        let sid = session.id();
        let SessionState { cipher, hash, stats } = session.state_mut();

        // 1️⃣ Fresh digest state for this call
        if let Some(h) = hash.as_deref_mut() {
            h.init().map_err(|e| transform_failure(sid, e))?;
        }

        // 2️⃣ IV: override when supplied, otherwise keep the running chain
        if let (Some(c), Some(iv)) = (cipher.as_deref_mut(), req.iv) {
            if iv.len() != c.iv_size() {
                return Err(CryptodevError::InvalidIv { expected: c.iv_size(), actual: iv.len() });
            }
            c.set_iv(iv).map_err(|e| transform_failure(sid, e))?;
        }

        // Never larger than the biggest segment needs, never smaller than one
        // cipher block.
        let block_size = cipher.as_deref().map_or(1, |c| c.block_size().max(1));
        let largest = req.segments.iter().map(Segment::len).max().unwrap_or(0);
        let mut staging = StagingBuffer::alloc(self.staging_size.min(largest).max(block_size))?;

        // 3️⃣ Segments, in order
        for (index, segment) in req.segments.iter().enumerate() {
            let apply_cipher = segment.flags.contains(SegmentFlags::CIPHER);
            let apply_hash = segment.flags.contains(SegmentFlags::HASH);

            if !apply_cipher && !apply_hash {
                return Err(CryptodevError::EmptySegmentFlags { segment: index });
            }

            let mut seg_cipher = match (apply_cipher, cipher.as_deref_mut()) {
                (false, _) => None,
                (true, Some(c)) => Some(c),
                (true, None) => return Err(CryptodevError::MissingCipher { segment: index }),
            };
            let mut seg_hash = match (apply_hash, hash.as_deref_mut()) {
                (false, _) => None,
                (true, Some(h)) => Some(h),
                (true, None) => return Err(CryptodevError::MissingHash { segment: index }),
            };

            let mut step = staging.capacity();
            if let Some(c) = seg_cipher.as_deref() {
                let block_size = c.block_size().max(1);
                if segment.len() % block_size != 0 {
                    log::error!(
                        "data size ({}) isn't a multiple of block size ({})",
                        segment.len(), block_size
                    );
                    return Err(CryptodevError::Misaligned {
                        segment: index,
                        len: segment.len(),
                        block_size,
                    });
                }
                // Whole blocks only; the capacity need not be a multiple.
                step -= step % block_size;
            }

            for chunk in segment.src.chunks(step) {
                let buf = staging.stage(chunk);
                process_chunk(req.op, buf, seg_cipher.as_deref_mut(), seg_hash.as_deref_mut(), out)
                    .map_err(|e| transform_failure(sid, e))?;
            }

            if self.collect_stats {
                stats.add(req.op, segment.len());
            }
        }

        // 4️⃣ MAC
        if let Some(h) = hash.as_deref_mut() {
            out.mac = h.finalize().map_err(|e| transform_failure(sid, e))?;
            debug_assert!(out.mac.len() <= HASH_MAX_LEN);
            log::trace!("sid 0x{:08X} mac={}", sid, hex::encode(&out.mac));
        }

        Ok(())
    }
}

/// Always hash before encryption and after decryption.
fn process_chunk<C, H>(
    op: CryptOp,
    buf: &mut [u8],
    cipher: Option<&mut C>,
    hash: Option<&mut H>,
    out: &mut CryptOutput,
) -> Result<(), CryptoError>
where
    C: CipherHandle + ?Sized,
    H: HashHandle + ?Sized,
{
    match op {
        CryptOp::Encrypt => {
            if let Some(h) = hash {
                h.update(buf)?;
            }
            if let Some(c) = cipher {
                c.encrypt(buf)?;
                out.dst.extend_from_slice(buf);
            }
        }
        CryptOp::Decrypt => {
            if let Some(c) = cipher {
                c.decrypt(buf)?;
                out.dst.extend_from_slice(buf);
            }
            if let Some(h) = hash {
                h.update(buf)?;
            }
        }
    }
    Ok(())
}

fn transform_failure(sid: SessionId, e: CryptoError) -> CryptodevError {
    log::error!("CryptoAPI failure on sid 0x{:08X}: {}", sid, e);
    CryptodevError::Transform(e)
}
