use std::fmt;

use crate::crypto::{CipherAlg, CryptoError, HashAlg};
use crate::types::{CryptodevError, Result};
use crate::utils::key_fingerprint;

/// Opaque session identifier, unique within one table.
pub type SessionId = u32;

/// Session creation request: at most one cipher and at most one hash.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SessionOp {
    pub cipher: Option<CipherAlg>,
    pub key: Vec<u8>,
    pub mac: Option<HashAlg>,
    pub mac_key: Vec<u8>,
}

impl SessionOp {
    pub fn cipher(alg: CipherAlg, key: &[u8]) -> Self {
        Self { cipher: Some(alg), key: key.to_vec(), ..Self::default() }
    }

    pub fn mac(alg: HashAlg, mac_key: &[u8]) -> Self {
        Self { mac: Some(alg), mac_key: mac_key.to_vec(), ..Self::default() }
    }

    pub fn with_mac(mut self, alg: HashAlg, mac_key: &[u8]) -> Self {
        self.mac = Some(alg);
        self.mac_key = mac_key.to_vec();
        self
    }

    /// Build from raw registry ids, `0` meaning "none".
    pub fn from_raw(cipher: u16, key: &[u8], mac: u16, mac_key: &[u8]) -> Result<Self> {
        let cipher = match cipher {
            0 => None,
            raw => Some(
                CipherAlg::try_from(raw)
                    .map_err(|_| CryptodevError::Setup(CryptoError::UnknownCipher { raw }))?,
            ),
        };
        let mac = match mac {
            0 => None,
            raw => Some(
                HashAlg::try_from(raw)
                    .map_err(|_| CryptodevError::Setup(CryptoError::UnknownHash { raw }))?,
            ),
        };

        Ok(Self { cipher, key: key.to_vec(), mac, mac_key: mac_key.to_vec() })
    }

    /// Build from transform names, e.g. `"cbc(aes)"` and `"hmac(sha256)"`.
    pub fn from_names(
        cipher: Option<(&str, &[u8])>,
        mac: Option<(&str, &[u8])>,
    ) -> Result<Self> {
        let mut op = Self::default();
        if let Some((name, key)) = cipher {
            op.cipher = Some(CipherAlg::from_name(name).map_err(CryptodevError::Setup)?);
            op.key = key.to_vec();
        }
        if let Some((name, key)) = mac {
            op.mac = Some(HashAlg::from_name(name).map_err(CryptodevError::Setup)?);
            op.mac_key = key.to_vec();
        }
        Ok(op)
    }
}

// Keys never reach logs.
impl fmt::Debug for SessionOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionOp")
            .field("cipher", &self.cipher)
            .field("key", &key_fingerprint(&self.key))
            .field("mac", &self.mac)
            .field("mac_key", &key_fingerprint(&self.mac_key))
            .finish()
    }
}

/// Session id generator.
pub trait IdSource: Send + Sync {
    fn next_id(&self) -> SessionId;
}

/// Thread-local RNG draws. Unpredictable enough to avoid accidental reuse,
/// not a capability token.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIds;

impl IdSource for RandomIds {
    fn next_id(&self) -> SessionId {
        use rand::Rng;
        rand::thread_rng().gen()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorKind;

    #[test]
    fn raw_ids_resolve() {
        let op = SessionOp::from_raw(11, &[0u8; 16], 19, b"k").unwrap();
        assert_eq!(op.cipher, Some(CipherAlg::AesCbc));
        assert_eq!(op.mac, Some(HashAlg::HmacSha256));

        let none = SessionOp::from_raw(0, &[], 0, &[]).unwrap();
        assert!(none.cipher.is_none() && none.mac.is_none());
    }

    #[test]
    fn unknown_raw_ids_are_configuration_errors() {
        let err = SessionOp::from_raw(99, &[], 0, &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        let err = SessionOp::from_raw(0, &[], 999, &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn names_resolve() {
        let op = SessionOp::from_names(Some(("cbc(des)", &[1u8; 8])), Some(("sha1", &[]))).unwrap();
        assert_eq!(op.cipher, Some(CipherAlg::DesCbc));
        assert_eq!(op.mac, Some(HashAlg::Sha1));
        assert!(SessionOp::from_names(Some(("ecb(aes)", &[])), None).is_err());
    }

    #[test]
    fn debug_hides_keys() {
        let op = SessionOp::cipher(CipherAlg::AesCbc, b"0123456789abcdef");
        let shown = format!("{:?}", op);
        assert!(!shown.contains("0123456789abcdef"));
    }
}
