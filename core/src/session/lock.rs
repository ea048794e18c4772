//! A session and its lock.
//!
//! The transform state lives in a slot. Locking checks the state out into an
//! owned [`LockedSession`]; dropping the guard puts it back and wakes one
//! waiter. This keeps the lock usable after the table lookup that found the
//! session has released the table lock.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use crate::crypto::{CipherHandle, HashHandle};
use crate::engine::SegmentFlags;
use crate::session::types::SessionId;
use crate::telemetry::SessionCounters;
use crate::types::{CryptodevError, Result};

/// Everything only the lock holder may touch.
#[derive(Default)]
pub struct SessionState {
    pub cipher: Option<Box<dyn CipherHandle>>,
    pub hash: Option<Box<dyn HashHandle>>,
    pub stats: SessionCounters,
}

impl SessionState {
    /// What a segment on this session may ask for.
    pub fn capabilities(&self) -> SegmentFlags {
        let mut flags = SegmentFlags::empty();
        if self.cipher.is_some() {
            flags |= SegmentFlags::CIPHER;
        }
        if self.hash.is_some() {
            flags |= SegmentFlags::HASH;
        }
        flags
    }
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("cipher", &self.cipher.as_ref().map(|c| c.alg()))
            .field("hash", &self.hash.as_ref().map(|h| h.alg()))
            .field("stats", &self.stats)
            .finish()
    }
}

struct Slot {
    state: Option<SessionState>,
    retired: bool,
}

pub struct Session {
    id: SessionId,
    slot: Mutex<Slot>,
    returned: Condvar,
}

impl Session {
    pub(crate) fn new(id: SessionId, state: SessionState) -> Self {
        Self {
            id,
            slot: Mutex::new(Slot { state: Some(state), retired: false }),
            returned: Condvar::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until the session is free, then hold it.
    ///
    /// Fails with `SessionNotFound` if the session is (or becomes) retired
    /// while waiting.
    pub fn lock(self: &Arc<Self>) -> Result<LockedSession> {
        let mut slot = self.slot();
        loop {
            if slot.retired {
                return Err(CryptodevError::SessionNotFound(self.id));
            }
            if let Some(state) = slot.state.take() {
                return Ok(LockedSession { session: Arc::clone(self), state });
            }
            slot = self.returned.wait(slot).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Mark retired, wait for any holder to finish, and take the state.
    ///
    /// Late waiters fail instead of receiving the state. Returns `None` only
    /// if the session was already retired.
    pub(crate) fn retire(&self) -> Option<SessionState> {
        let mut slot = self.slot();
        if slot.retired {
            return None;
        }
        slot.retired = true;

        if slot.state.is_none() {
            log::debug!("Waiting for semaphore of sid=0x{:08X}", self.id);
        }
        loop {
            if let Some(state) = slot.state.take() {
                // Wake waiters so they observe `retired`.
                self.returned.notify_all();
                return Some(state);
            }
            slot = self.returned.wait(slot).unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn give_back(&self, state: SessionState) {
        let mut slot = self.slot();
        slot.state = Some(state);
        drop(slot);
        // A retiring thread may be among the waiters; it must not be skipped.
        self.returned.notify_all();
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").field("id", &format_args!("0x{:08X}", self.id)).finish()
    }
}

/// Exclusive hold on one session. Released on drop.
pub struct LockedSession {
    session: Arc<Session>,
    state: SessionState,
}

impl LockedSession {
    pub fn id(&self) -> SessionId {
        self.session.id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SessionState {
        &mut self.state
    }

    pub fn capabilities(&self) -> SegmentFlags {
        self.state.capabilities()
    }

    pub fn stats(&self) -> &SessionCounters {
        &self.state.stats
    }
}

impl Drop for LockedSession {
    fn drop(&mut self) {
        let state = std::mem::take(&mut self.state);
        self.session.give_back(state);
    }
}

impl fmt::Debug for LockedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockedSession")
            .field("id", &format_args!("0x{:08X}", self.session.id))
            .field("state", &self.state)
            .finish()
    }
}
