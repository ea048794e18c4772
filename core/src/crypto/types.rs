// ## 📂 File: `src/crypto/types.rs`

use std::fmt;
use crate::utils::enum_name_or_hex;
use crate::crypto::{CipherAlg, HashAlg};

/// Accepted key length range for one algorithm, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBounds {
    pub min: usize,
    pub max: usize,
}

impl KeyBounds {
    pub const fn exact(len: usize) -> Self {
        Self { min: len, max: len }
    }

    pub const fn range(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn contains(&self, len: usize) -> bool {
        len >= self.min && len <= self.max
    }
}

/// Transform-level failures reported by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Cipher id not in the registry.
    UnknownCipher { raw: u16 },

    /// Hash id not in the registry.
    UnknownHash { raw: u16 },

    /// Algorithm name not recognised by the provider.
    UnknownAlgorithm(String),

    /// Key length outside the algorithm's accepted range.
    InvalidKeyLen { alg: &'static str, min: usize, max: usize, actual: usize },

    /// IV length differs from the cipher's IV size.
    InvalidIvLen { expected: usize, actual: usize },

    /// Buffer handed to a cipher is not a whole number of blocks.
    Misaligned { len: usize, block_size: usize },

    /// Key was in range but the algorithm refused it.
    KeySetup { alg: &'static str, key_bits: usize },

    /// General runtime failure with context.
    Failure(String),
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use CryptoError::*;
        match self {
            UnknownCipher { raw } =>
                write!(f, "bad cipher: {}", enum_name_or_hex::<CipherAlg>(*raw)),
            UnknownHash { raw } =>
                write!(f, "bad mac: {}", enum_name_or_hex::<HashAlg>(*raw)),
            UnknownAlgorithm(name) =>
                write!(f, "failed to load transform for {}", name),
            InvalidKeyLen { alg, min, max, actual } =>
                write!(f, "wrong keylen '{}' for algorithm '{}', use {} to {}", actual, alg, min, max),
            InvalidIvLen { expected, actual } =>
                write!(f, "invalid iv length: expected={}, actual={}", expected, actual),
            Misaligned { len, block_size } =>
                write!(f, "data size ({}) isn't a multiple of block size ({})", len, block_size),
            KeySetup { alg, key_bits } =>
                write!(f, "setting key failed for {}-{}", alg, key_bits),
            Failure(msg) =>
                write!(f, "crypto failure: {}", msg),
        }
    }
}

impl std::error::Error for CryptoError {}
