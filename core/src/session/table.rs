//! Session table: creation, lookup and teardown for one caller context.
//!
//! Two locks, never nested in the other direction:
//! - the table lock guards membership only (insert, remove, id scan, lookup);
//! - each session's own lock guards its transforms and counters.
//!
//! The table lock is never held across transform allocation, a crypto run,
//! or a drain.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::EngineConfig;
use crate::constants::CIPHER_MAX_KEY_LEN;
use crate::crypto::{CryptoError, TransformProvider};
use crate::session::lock::{LockedSession, Session, SessionState};
use crate::session::types::{IdSource, RandomIds, SessionId, SessionOp};
use crate::telemetry::{SessionCounters, StatsSnapshot};
use crate::types::{CryptodevError, Result};

pub struct SessionTable {
    sessions: Mutex<HashMap<SessionId, Arc<Session>>>,
    provider: Arc<dyn TransformProvider>,
    ids: Box<dyn IdSource>,
    config: EngineConfig,
}

impl SessionTable {
    pub fn new(provider: Arc<dyn TransformProvider>, config: EngineConfig) -> Self {
        Self::with_id_source(provider, config, Box::new(RandomIds))
    }

    pub fn with_id_source(
        provider: Arc<dyn TransformProvider>,
        config: EngineConfig,
        ids: Box<dyn IdSource>,
    ) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            provider,
            ids,
            config,
        }
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<SessionId, Arc<Session>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions().is_empty()
    }

    /// Live ids, unordered.
    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions().keys().copied().collect()
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions().contains_key(&id)
    }

    /// Validate `op`, allocate its transforms, and insert a new session.
    ///
    /// Transforms allocated before a failure are dropped before returning, so
    /// a failed call leaves nothing behind.
    pub fn create_session(&self, op: &SessionOp) -> Result<SessionId> {
        if op.cipher.is_none() && op.mac.is_none() {
            log::debug!("Both 'cipher' and 'mac' unset.");
            return Err(CryptodevError::NothingRequested);
        }

        let state = self.build_state(op).map_err(|e| {
            log::debug!("session setup failed: {}", e);
            CryptodevError::Setup(e)
        })?;

        let id = self.insert(state)?;
        log::debug!(
            "Created session 0x{:08X} (cipher={:?}, mac={:?})",
            id, op.cipher, op.mac
        );
        Ok(id)
    }

    fn build_state(&self, op: &SessionOp) -> Result<SessionState, CryptoError> {
        let mut state = SessionState::default();

        if let Some(alg) = op.cipher {
            let bounds = self.provider.cipher_key_bounds(alg)?;
            if !bounds.contains(op.key.len()) || op.key.len() > CIPHER_MAX_KEY_LEN {
                return Err(CryptoError::InvalidKeyLen {
                    alg: alg.name(),
                    min: bounds.min,
                    max: bounds.max,
                    actual: op.key.len(),
                });
            }
            state.cipher = Some(self.provider.alloc_cipher(alg, &op.key)?);
        }

        if let Some(alg) = op.mac {
            if alg.is_keyed() {
                let bounds = self.provider.hash_key_bounds(alg)?;
                if !bounds.contains(op.mac_key.len()) {
                    return Err(CryptoError::InvalidKeyLen {
                        alg: alg.name(),
                        min: bounds.min,
                        max: bounds.max,
                        actual: op.mac_key.len(),
                    });
                }
            }
            // On failure `state` drops here, releasing the cipher.
            state.hash = Some(self.provider.alloc_hash(alg, &op.mac_key)?);
        }

        Ok(state)
    }

    /// Draw ids until one is free across the whole table, then insert.
    fn insert(&self, state: SessionState) -> Result<SessionId> {
        let mut sessions = self.sessions();
        for _ in 0..self.config.max_id_draws {
            let id = self.ids.next_id();
            if sessions.contains_key(&id) {
                log::trace!("sid 0x{:08X} already taken, redrawing", id);
                continue;
            }
            sessions.insert(id, Arc::new(Session::new(id, state)));
            return Ok(id);
        }

        Err(CryptodevError::SessionIdExhausted { attempts: self.config.max_id_draws })
    }

    /// Look the session up, release the table lock, then wait for the
    /// session's own lock.
    pub fn lock_session_by_id(&self, id: SessionId) -> Result<LockedSession> {
        let session = self.sessions().get(&id).cloned();
        let session = session.ok_or_else(|| {
            log::error!("invalid session ID=0x{:08X}", id);
            CryptodevError::SessionNotFound(id)
        })?;
        session.lock()
    }

    /// Remove one session, waiting for any in-flight run on it to finish.
    pub fn destroy_session(&self, id: SessionId) -> Result<()> {
        let removed = self.sessions().remove(&id);
        match removed {
            Some(session) => {
                self.drain(&session);
                Ok(())
            }
            None => {
                log::error!("Session with sid=0x{:08X} not found!", id);
                Err(CryptodevError::SessionNotFound(id))
            }
        }
    }

    /// Remove and drain every session. Returns how many were destroyed.
    pub fn destroy_all(&self) -> usize {
        let drained: Vec<Arc<Session>> = self.sessions().drain().map(|(_, s)| s).collect();
        for session in &drained {
            self.drain(session);
        }
        drained.len()
    }

    fn drain(&self, session: &Session) {
        let Some(state) = session.retire() else {
            return;
        };
        if self.config.collect_stats {
            log::debug!("{}", StatsSnapshot::from(session.id(), &state.stats));
        }
        // Transforms are released here, exactly once.
        drop(state);
        log::debug!("Removed session 0x{:08X}", session.id());
    }

    /// Snapshot of one session's counters. Waits for the session lock.
    pub fn stats(&self, id: SessionId) -> Result<StatsSnapshot> {
        let locked = self.lock_session_by_id(id)?;
        Ok(StatsSnapshot::from(id, locked.stats()))
    }

    /// Counters of every live session merged together.
    pub fn total_stats(&self) -> SessionCounters {
        let mut total = SessionCounters::default();
        for id in self.ids() {
            // A session destroyed since `ids()` simply contributes nothing.
            if let Ok(locked) = self.lock_session_by_id(id) {
                total += locked.stats().clone();
            }
        }
        total
    }
}

impl Drop for SessionTable {
    fn drop(&mut self) {
        self.destroy_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{CipherAlg, HashAlg, SoftwareProvider};
    use crate::types::ErrorKind;
    use std::collections::VecDeque;

    struct ScriptedIds(Mutex<VecDeque<SessionId>>);

    impl ScriptedIds {
        fn new(ids: &[SessionId]) -> Box<Self> {
            Box::new(Self(Mutex::new(ids.iter().copied().collect())))
        }
    }

    impl IdSource for ScriptedIds {
        fn next_id(&self) -> SessionId {
            self.0.lock().unwrap().pop_front().unwrap_or(0)
        }
    }

    fn table_with_ids(ids: &[SessionId]) -> SessionTable {
        SessionTable::with_id_source(
            Arc::new(SoftwareProvider),
            EngineConfig { max_id_draws: 4, ..EngineConfig::default() },
            ScriptedIds::new(ids),
        )
    }

    fn aes_op() -> SessionOp {
        SessionOp::cipher(CipherAlg::AesCbc, &[0x11; 16])
    }

    #[test]
    fn collision_redraws() {
        let table = table_with_ids(&[7, 7, 7, 9]);
        assert_eq!(table.create_session(&aes_op()).unwrap(), 7);
        assert_eq!(table.create_session(&aes_op()).unwrap(), 9);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn collision_checked_against_all_sessions() {
        // Second draw collides with the first session, third with the second.
        let table = table_with_ids(&[1, 2, 1, 2, 3]);
        assert_eq!(table.create_session(&aes_op()).unwrap(), 1);
        assert_eq!(table.create_session(&aes_op()).unwrap(), 2);
        assert_eq!(table.create_session(&aes_op()).unwrap(), 3);
    }

    #[test]
    fn id_exhaustion_is_resource_error() {
        let table = table_with_ids(&[5, 5, 5, 5, 5, 5]);
        table.create_session(&aes_op()).unwrap();
        let err = table.create_session(&aes_op()).unwrap_err();
        assert!(matches!(err, CryptodevError::SessionIdExhausted { attempts: 4 }));
        assert_eq!(err.kind(), ErrorKind::Resource);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn nothing_requested_rejected() {
        let table = SessionTable::new(Arc::new(SoftwareProvider), EngineConfig::default());
        let err = table.create_session(&SessionOp::default()).unwrap_err();
        assert!(matches!(err, CryptodevError::NothingRequested));
        assert!(table.is_empty());
    }

    #[test]
    fn bad_hmac_key_leaves_no_session() {
        let table = SessionTable::new(Arc::new(SoftwareProvider), EngineConfig::default());
        let op = aes_op().with_mac(HashAlg::HmacSha1, &[0u8; 513]);
        let err = table.create_session(&op).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(table.is_empty());
    }

    #[test]
    fn destroy_unknown_is_lookup_error() {
        let table = table_with_ids(&[1]);
        let err = table.destroy_session(42).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Lookup);
    }

    #[test]
    fn destroy_all_is_idempotent() {
        let table = table_with_ids(&[1, 2, 3]);
        for _ in 0..3 {
            table.create_session(&aes_op()).unwrap();
        }
        assert_eq!(table.destroy_all(), 3);
        assert_eq!(table.destroy_all(), 0);
        assert!(table.is_empty());
    }

    #[test]
    fn lock_after_destroy_fails() {
        let table = table_with_ids(&[10]);
        let id = table.create_session(&aes_op()).unwrap();
        table.destroy_session(id).unwrap();
        assert!(matches!(
            table.lock_session_by_id(id),
            Err(CryptodevError::SessionNotFound(10))
        ));
    }
}
