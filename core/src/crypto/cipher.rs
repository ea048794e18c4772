// ## 📂 File: `src/crypto/cipher.rs`

//! CBC block-cipher transforms.
//!
//! Design notes:
//! - A transform owns the keyed block cipher and one running IV.
//! - Every encrypt/decrypt call continues the chain from the running IV and
//!   leaves it pointing at the last ciphertext block, so a request that omits
//!   the IV picks up where the previous one stopped.
//! - `set_iv` overwrites the running IV.

use std::fmt;

use aes::{Aes128, Aes192, Aes256};
use blowfish::Blowfish;
use camellia::{Camellia128, Camellia192, Camellia256};
use cipher::generic_array::GenericArray;
use cipher::{BlockCipher, BlockDecryptMut, BlockEncryptMut, InnerIvInit, IvState, KeyInit};
use des::{Des, TdesEde3};
use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

use crate::constants::{cipher_ids, CIPHER_MAX_KEY_LEN};
use crate::crypto::provider::CipherHandle;
use crate::crypto::types::{CryptoError, KeyBounds};

/// Supported CBC ciphers.
#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, TryFromPrimitive, Serialize, Deserialize)]
pub enum CipherAlg {
    DesCbc      = cipher_ids::DES_CBC,
    TdesCbc     = cipher_ids::TDES_CBC,
    BlowfishCbc = cipher_ids::BLF_CBC,
    AesCbc      = cipher_ids::AES_CBC,
    CamelliaCbc = cipher_ids::CAMELLIA_CBC,
}

impl CipherAlg {
    pub const ALL: [CipherAlg; 5] = [
        CipherAlg::DesCbc,
        CipherAlg::TdesCbc,
        CipherAlg::BlowfishCbc,
        CipherAlg::AesCbc,
        CipherAlg::CamelliaCbc,
    ];

    /// Transform name.
    pub fn name(self) -> &'static str {
        match self {
            CipherAlg::DesCbc      => "cbc(des)",
            CipherAlg::TdesCbc     => "cbc(des3_ede)",
            CipherAlg::BlowfishCbc => "cbc(blowfish)",
            CipherAlg::AesCbc      => "cbc(aes)",
            CipherAlg::CamelliaCbc => "cbc(camellia)",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, CryptoError> {
        Self::ALL
            .iter()
            .copied()
            .find(|alg| alg.name() == name)
            .ok_or_else(|| CryptoError::UnknownAlgorithm(name.to_string()))
    }

    pub fn block_size(self) -> usize {
        match self {
            CipherAlg::DesCbc | CipherAlg::TdesCbc | CipherAlg::BlowfishCbc => 8,
            CipherAlg::AesCbc | CipherAlg::CamelliaCbc => 16,
        }
    }

    /// CBC: the IV is one block.
    pub fn iv_size(self) -> usize {
        self.block_size()
    }

    pub fn key_bounds(self) -> KeyBounds {
        match self {
            CipherAlg::DesCbc      => KeyBounds::exact(8),
            CipherAlg::TdesCbc     => KeyBounds::exact(24),
            CipherAlg::BlowfishCbc => KeyBounds::range(4, 56),
            CipherAlg::AesCbc      => KeyBounds::range(16, 32),
            CipherAlg::CamelliaCbc => KeyBounds::range(16, 32),
        }
    }
}

impl fmt::Display for CipherAlg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Keyed block cipher, one variant per concrete key schedule.
enum BlockEngine {
    Des(Des),
    Tdes(TdesEde3),
    Blowfish(Blowfish),
    Aes128(Aes128),
    Aes192(Aes192),
    Aes256(Aes256),
    Camellia128(Camellia128),
    Camellia192(Camellia192),
    Camellia256(Camellia256),
}

macro_rules! with_engine {
    ($engine:expr, $c:ident => $body:expr) => {
        match $engine {
            BlockEngine::Des($c)         => $body,
            BlockEngine::Tdes($c)        => $body,
            BlockEngine::Blowfish($c)    => $body,
            BlockEngine::Aes128($c)      => $body,
            BlockEngine::Aes192($c)      => $body,
            BlockEngine::Aes256($c)      => $body,
            BlockEngine::Camellia128($c) => $body,
            BlockEngine::Camellia192($c) => $body,
            BlockEngine::Camellia256($c) => $body,
        }
    };
}

impl BlockEngine {
    fn new(alg: CipherAlg, key: &[u8]) -> Result<Self, CryptoError> {
        let setup_failed = || CryptoError::KeySetup { alg: alg.name(), key_bits: key.len() * 8 };

        let engine = match (alg, key.len()) {
            (CipherAlg::DesCbc, _)       => Des::new_from_slice(key).map(BlockEngine::Des),
            (CipherAlg::TdesCbc, _)      => TdesEde3::new_from_slice(key).map(BlockEngine::Tdes),
            (CipherAlg::BlowfishCbc, _)  => Blowfish::new_from_slice(key).map(BlockEngine::Blowfish),
            (CipherAlg::AesCbc, 16)      => Aes128::new_from_slice(key).map(BlockEngine::Aes128),
            (CipherAlg::AesCbc, 24)      => Aes192::new_from_slice(key).map(BlockEngine::Aes192),
            (CipherAlg::AesCbc, 32)      => Aes256::new_from_slice(key).map(BlockEngine::Aes256),
            (CipherAlg::CamelliaCbc, 16) => Camellia128::new_from_slice(key).map(BlockEngine::Camellia128),
            (CipherAlg::CamelliaCbc, 24) => Camellia192::new_from_slice(key).map(BlockEngine::Camellia192),
            (CipherAlg::CamelliaCbc, 32) => Camellia256::new_from_slice(key).map(BlockEngine::Camellia256),
            _ => return Err(setup_failed()),
        };
        engine.map_err(|_| setup_failed())
    }
}

fn cbc_encrypt<C>(cipher: &C, iv: &mut [u8], buf: &mut [u8]) -> Result<(), CryptoError>
where
    C: BlockCipher + BlockEncryptMut + Clone,
{
    let block_size = C::block_size();
    let mut mode = cbc::Encryptor::<C>::inner_iv_slice_init(cipher.clone(), iv)
        .map_err(|_| CryptoError::InvalidIvLen { expected: block_size, actual: iv.len() })?;

    for block in buf.chunks_exact_mut(block_size) {
        mode.encrypt_block_mut(GenericArray::from_mut_slice(block));
    }
    iv.copy_from_slice(&mode.iv_state());
    Ok(())
}

fn cbc_decrypt<C>(cipher: &C, iv: &mut [u8], buf: &mut [u8]) -> Result<(), CryptoError>
where
    C: BlockCipher + BlockDecryptMut + Clone,
{
    let block_size = C::block_size();
    let mut mode = cbc::Decryptor::<C>::inner_iv_slice_init(cipher.clone(), iv)
        .map_err(|_| CryptoError::InvalidIvLen { expected: block_size, actual: iv.len() })?;

    for block in buf.chunks_exact_mut(block_size) {
        mode.decrypt_block_mut(GenericArray::from_mut_slice(block));
    }
    iv.copy_from_slice(&mode.iv_state());
    Ok(())
}

/// RustCrypto-backed CBC transform.
pub struct SoftwareCipher {
    alg: CipherAlg,
    engine: BlockEngine,
    iv: Vec<u8>,
}

impl SoftwareCipher {
    /// Validate the key against the algorithm bounds, then run key setup.
    /// The running IV starts as all zeros.
    pub fn new(alg: CipherAlg, key: &[u8]) -> Result<Self, CryptoError> {
        let bounds = alg.key_bounds();
        if !bounds.contains(key.len()) || key.len() > CIPHER_MAX_KEY_LEN {
            return Err(CryptoError::InvalidKeyLen {
                alg: alg.name(),
                min: bounds.min,
                max: bounds.max,
                actual: key.len(),
            });
        }

        let engine = BlockEngine::new(alg, key)?;
        Ok(Self { alg, engine, iv: vec![0u8; alg.iv_size()] })
    }

    #[inline]
    fn check_aligned(&self, buf: &[u8]) -> Result<(), CryptoError> {
        let block_size = self.alg.block_size();
        if buf.len() % block_size != 0 {
            return Err(CryptoError::Misaligned { len: buf.len(), block_size });
        }
        Ok(())
    }
}

impl CipherHandle for SoftwareCipher {
    fn alg(&self) -> CipherAlg {
        self.alg
    }

    fn block_size(&self) -> usize {
        self.alg.block_size()
    }

    fn iv_size(&self) -> usize {
        self.alg.iv_size()
    }

    fn set_iv(&mut self, iv: &[u8]) -> Result<(), CryptoError> {
        if iv.len() != self.iv.len() {
            return Err(CryptoError::InvalidIvLen { expected: self.iv.len(), actual: iv.len() });
        }
        self.iv.copy_from_slice(iv);
        Ok(())
    }

    fn encrypt(&mut self, buf: &mut [u8]) -> Result<(), CryptoError> {
        self.check_aligned(buf)?;
        let iv = &mut self.iv;
        with_engine!(&self.engine, c => cbc_encrypt(c, iv, buf))
    }

    fn decrypt(&mut self, buf: &mut [u8]) -> Result<(), CryptoError> {
        self.check_aligned(buf)?;
        let iv = &mut self.iv;
        with_engine!(&self.engine, c => cbc_decrypt(c, iv, buf))
    }
}
