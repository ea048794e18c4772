//! Device handle and per-caller contexts.
//!
//! `CryptoDevice` is constructed once by the embedding application and
//! handed to whatever transport sits on top. Each `open()` yields a context
//! with its own session table; clones of a context share that table, and the
//! table is torn down when the last clone goes away.

use std::fmt;
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::crypto::{SoftwareProvider, TransformProvider};
use crate::device::command::{Command, Reply, SingleCrypt};
use crate::engine::{CryptOp, CryptOutput, CryptRequest, CryptoEngine, Segment};
use crate::session::{IdSource, SessionId, SessionOp, SessionTable};
use crate::telemetry::{SessionCounters, StatsSnapshot};
use crate::types::Result;

#[derive(Clone)]
pub struct CryptoDevice {
    provider: Arc<dyn TransformProvider>,
    config: EngineConfig,
}

impl CryptoDevice {
    pub fn new(provider: Arc<dyn TransformProvider>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        log::info!("cryptodev: device ready (staging={} bytes)", config.staging_size);
        Ok(Self { provider, config })
    }

    /// Software transforms, default configuration.
    pub fn software() -> Self {
        Self {
            provider: Arc::new(SoftwareProvider),
            config: EngineConfig::default(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// New caller context with an empty session table.
    pub fn open(&self) -> CryptoContext {
        self.open_table(SessionTable::new(Arc::clone(&self.provider), self.config.clone()))
    }

    /// Like `open`, drawing session ids from `ids`.
    pub fn open_with_id_source(&self, ids: Box<dyn IdSource>) -> CryptoContext {
        self.open_table(SessionTable::with_id_source(
            Arc::clone(&self.provider),
            self.config.clone(),
            ids,
        ))
    }

    fn open_table(&self, table: SessionTable) -> CryptoContext {
        CryptoContext {
            inner: Arc::new(ContextInner {
                table,
                engine: CryptoEngine::new(&self.config),
            }),
        }
    }
}

impl fmt::Debug for CryptoDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CryptoDevice").field("config", &self.config).finish()
    }
}

struct ContextInner {
    table: SessionTable,
    engine: CryptoEngine,
}

/// One caller's view of the device. Cheap to clone; clones address the
/// same sessions.
#[derive(Clone)]
pub struct CryptoContext {
    inner: Arc<ContextInner>,
}

impl CryptoContext {
    pub fn table(&self) -> &SessionTable {
        &self.inner.table
    }

    pub fn engine(&self) -> &CryptoEngine {
        &self.inner.engine
    }

    /// Another handle on this context.
    pub fn clone_context(&self) -> CryptoContext {
        self.clone()
    }

    /// Number of live handles on this context.
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    pub fn create_session(&self, op: &SessionOp) -> Result<SessionId> {
        self.inner.table.create_session(op)
    }

    pub fn finish_session(&self, id: SessionId) -> Result<()> {
        self.inner.table.destroy_session(id)
    }

    pub fn finish_all_sessions(&self) -> usize {
        self.inner.table.destroy_all()
    }

    pub fn session_stats(&self, id: SessionId) -> Result<StatsSnapshot> {
        self.inner.table.stats(id)
    }

    pub fn total_stats(&self) -> SessionCounters {
        self.inner.table.total_stats()
    }

    /// Vectored request. On error `out` keeps whatever was written.
    pub fn cryptv(&self, req: &CryptRequest<'_>, out: &mut CryptOutput) -> Result<()> {
        let mut session = self.inner.table.lock_session_by_id(req.session_id)?;
        self.inner.engine.run(&mut session, req, out)
    }

    /// Single-buffer request: one segment flagged with whatever the session
    /// can do.
    pub fn crypt(&self, op: &SingleCrypt<'_>) -> Result<CryptOutput> {
        let direction = CryptOp::from_raw(op.op)?;
        let mut session = self.inner.table.lock_session_by_id(op.session_id)?;

        let mut req = CryptRequest::new(direction, op.session_id)
            .segment(Segment::new(op.src, session.capabilities()));
        req.iv = op.iv;

        let mut out = CryptOutput::with_capacity(op.src.len());
        self.inner.engine.run(&mut session, &req, &mut out)?;
        Ok(out)
    }

    /// Resolve one request to exactly one operation.
    pub fn dispatch(&self, cmd: Command<'_>) -> Result<Reply> {
        match cmd {
            // No asymmetric operations.
            Command::AsymFeatures => Ok(Reply::AsymFeatures(0)),
            Command::CloneContext => Ok(Reply::Context(self.clone_context())),
            Command::CreateSession(op) => self.create_session(&op).map(Reply::Session),
            Command::FinishSession(id) => self.finish_session(id).map(|_| Reply::Finished),
            Command::Crypt(op) => self.crypt(&op).map(Reply::Crypt),
            Command::CryptV(req) => {
                let mut out = CryptOutput::with_capacity(req.output_len());
                self.cryptv(&req, &mut out)?;
                Ok(Reply::Crypt(out))
            }
        }
    }
}

impl fmt::Debug for CryptoContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CryptoContext")
            .field("sessions", &self.inner.table.len())
            .field("handles", &self.handle_count())
            .finish()
    }
}
