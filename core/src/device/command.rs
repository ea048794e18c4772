use crate::device::context::CryptoContext;
use crate::engine::{CryptOutput, CryptRequest};
use crate::session::{SessionId, SessionOp};

/// Single-buffer request as a transport hands it over.
#[derive(Debug, Clone, Copy)]
pub struct SingleCrypt<'a> {
    pub session_id: SessionId,
    /// Raw op code; converted before the session is looked up.
    pub op: u16,
    pub src: &'a [u8],
    pub iv: Option<&'a [u8]>,
}

/// Every request a context understands.
#[derive(Debug)]
pub enum Command<'a> {
    AsymFeatures,
    CloneContext,
    CreateSession(SessionOp),
    FinishSession(SessionId),
    Crypt(SingleCrypt<'a>),
    CryptV(CryptRequest<'a>),
}

#[derive(Debug)]
pub enum Reply {
    AsymFeatures(u32),
    Context(CryptoContext),
    Session(SessionId),
    Finished,
    Crypt(CryptOutput),
}

impl Reply {
    pub fn session_id(&self) -> Option<SessionId> {
        match self {
            Reply::Session(id) => Some(*id),
            _ => None,
        }
    }

    pub fn into_output(self) -> Option<CryptOutput> {
        match self {
            Reply::Crypt(out) => Some(out),
            _ => None,
        }
    }
}
