//! crypto/provider.rs
//! Transform provider seam.
//!
//! The session table asks a provider for keyed transforms and the engine only
//! drives them through these traits. A handle is freed by dropping it.

use crate::crypto::cipher::{CipherAlg, SoftwareCipher};
use crate::crypto::digest::{HashAlg, SoftwareHash};
use crate::crypto::types::{CryptoError, KeyBounds};

/// A keyed CBC cipher with a running IV.
pub trait CipherHandle: Send {
    fn alg(&self) -> CipherAlg;
    fn block_size(&self) -> usize;
    fn iv_size(&self) -> usize;

    /// Replace the running IV. `iv.len()` must equal `iv_size()`.
    fn set_iv(&mut self, iv: &[u8]) -> Result<(), CryptoError>;

    /// Encrypt whole blocks in place, continuing from the running IV.
    fn encrypt(&mut self, buf: &mut [u8]) -> Result<(), CryptoError>;

    /// Decrypt whole blocks in place, continuing from the running IV.
    fn decrypt(&mut self, buf: &mut [u8]) -> Result<(), CryptoError>;
}

/// A (possibly keyed) incremental hash.
pub trait HashHandle: Send {
    fn alg(&self) -> HashAlg;
    fn digest_size(&self) -> usize;
    fn init(&mut self) -> Result<(), CryptoError>;
    fn update(&mut self, data: &[u8]) -> Result<(), CryptoError>;
    fn finalize(&mut self) -> Result<Vec<u8>, CryptoError>;
}

/// Source of transforms.
pub trait TransformProvider: Send + Sync {
    fn cipher_key_bounds(&self, alg: CipherAlg) -> Result<KeyBounds, CryptoError>;
    fn hash_key_bounds(&self, alg: HashAlg) -> Result<KeyBounds, CryptoError>;
    fn alloc_cipher(&self, alg: CipherAlg, key: &[u8]) -> Result<Box<dyn CipherHandle>, CryptoError>;
    fn alloc_hash(&self, alg: HashAlg, key: &[u8]) -> Result<Box<dyn HashHandle>, CryptoError>;
}

/// Pure-software provider covering every registered algorithm.
#[derive(Debug, Default, Clone, Copy)]
pub struct SoftwareProvider;

impl TransformProvider for SoftwareProvider {
    fn cipher_key_bounds(&self, alg: CipherAlg) -> Result<KeyBounds, CryptoError> {
        Ok(alg.key_bounds())
    }

    fn hash_key_bounds(&self, alg: HashAlg) -> Result<KeyBounds, CryptoError> {
        Ok(alg.key_bounds())
    }

    fn alloc_cipher(&self, alg: CipherAlg, key: &[u8]) -> Result<Box<dyn CipherHandle>, CryptoError> {
        Ok(Box::new(SoftwareCipher::new(alg, key)?))
    }

    fn alloc_hash(&self, alg: HashAlg, key: &[u8]) -> Result<Box<dyn HashHandle>, CryptoError> {
        Ok(Box::new(SoftwareHash::new(alg, key)?))
    }
}
