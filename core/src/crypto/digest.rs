//! Hash and keyed-hash transforms.
//!
//! Every digest family is available unkeyed or keyed (HMAC, or BLAKE3's native
//! keyed mode). A transform keeps a pristine keyed template; `init` restarts
//! the running state from it so a session can hash many requests.

use std::fmt;

use digest::Digest;
use hmac::{Hmac, Mac};
use md5::Md5;
use num_enum::TryFromPrimitive;
use ripemd::Ripemd160;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};
use sha3::Sha3_256;

use crate::constants::{mac_ids, HMAC_MAX_KEY_LEN};
use crate::crypto::provider::HashHandle;
use crate::crypto::types::{CryptoError, KeyBounds};

/// Supported hash algorithms.
#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, TryFromPrimitive, Serialize, Deserialize)]
pub enum HashAlg {
    HmacMd5       = mac_ids::MD5_HMAC,
    HmacSha1      = mac_ids::SHA1_HMAC,
    HmacRipemd160 = mac_ids::RIPEMD160_HMAC,
    Md5           = mac_ids::MD5,
    Ripemd160     = mac_ids::RIPEMD160,
    Sha1          = mac_ids::SHA1,
    HmacSha256    = mac_ids::SHA2_256_HMAC,
    HmacSha384    = mac_ids::SHA2_384_HMAC,
    HmacSha512    = mac_ids::SHA2_512_HMAC,
    Sha256        = mac_ids::SHA2_256,
    Sha384        = mac_ids::SHA2_384,
    Sha512        = mac_ids::SHA2_512,
    Sha3_256      = mac_ids::SHA3_256,
    HmacSha3_256  = mac_ids::SHA3_256_HMAC,
    Blake3        = mac_ids::BLAKE3,  // UNKEYED Blake3
    Blake3Keyed   = mac_ids::BLAKE3_KEYED,
}

impl HashAlg {
    pub const ALL: [HashAlg; 16] = [
        HashAlg::HmacMd5,
        HashAlg::HmacSha1,
        HashAlg::HmacRipemd160,
        HashAlg::Md5,
        HashAlg::Ripemd160,
        HashAlg::Sha1,
        HashAlg::HmacSha256,
        HashAlg::HmacSha384,
        HashAlg::HmacSha512,
        HashAlg::Sha256,
        HashAlg::Sha384,
        HashAlg::Sha512,
        HashAlg::Sha3_256,
        HashAlg::HmacSha3_256,
        HashAlg::Blake3,
        HashAlg::Blake3Keyed,
    ];

    /// Transform name.
    pub fn name(self) -> &'static str {
        match self {
            HashAlg::HmacMd5       => "hmac(md5)",
            HashAlg::HmacSha1      => "hmac(sha1)",
            HashAlg::HmacRipemd160 => "hmac(rmd160)",
            HashAlg::Md5           => "md5",
            HashAlg::Ripemd160     => "rmd160",
            HashAlg::Sha1          => "sha1",
            HashAlg::HmacSha256    => "hmac(sha256)",
            HashAlg::HmacSha384    => "hmac(sha384)",
            HashAlg::HmacSha512    => "hmac(sha512)",
            HashAlg::Sha256        => "sha256",
            HashAlg::Sha384        => "sha384",
            HashAlg::Sha512        => "sha512",
            HashAlg::Sha3_256      => "sha3-256",
            HashAlg::HmacSha3_256  => "hmac(sha3-256)",
            HashAlg::Blake3        => "blake3",
            HashAlg::Blake3Keyed   => "blake3-keyed",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, CryptoError> {
        Self::ALL
            .iter()
            .copied()
            .find(|alg| alg.name() == name)
            .ok_or_else(|| CryptoError::UnknownAlgorithm(name.to_string()))
    }

    /// True for MAC modes, which bind a key.
    pub fn is_keyed(self) -> bool {
        matches!(
            self,
            HashAlg::HmacMd5
                | HashAlg::HmacSha1
                | HashAlg::HmacRipemd160
                | HashAlg::HmacSha256
                | HashAlg::HmacSha384
                | HashAlg::HmacSha512
                | HashAlg::HmacSha3_256
                | HashAlg::Blake3Keyed
        )
    }

    pub fn digest_size(self) -> usize {
        match self {
            HashAlg::Md5 | HashAlg::HmacMd5 => 16,
            HashAlg::Sha1 | HashAlg::HmacSha1 | HashAlg::Ripemd160 | HashAlg::HmacRipemd160 => 20,
            HashAlg::Sha256 | HashAlg::HmacSha256 | HashAlg::Sha3_256 | HashAlg::HmacSha3_256 => 32,
            HashAlg::Blake3 | HashAlg::Blake3Keyed => blake3::OUT_LEN,
            HashAlg::Sha384 | HashAlg::HmacSha384 => 48,
            HashAlg::Sha512 | HashAlg::HmacSha512 => 64,
        }
    }

    /// Unkeyed digests accept (and ignore) any key.
    pub fn key_bounds(self) -> KeyBounds {
        match self {
            HashAlg::Blake3Keyed => KeyBounds::exact(blake3::KEY_LEN),
            alg if alg.is_keyed() => KeyBounds::range(0, HMAC_MAX_KEY_LEN),
            _ => KeyBounds::range(0, usize::MAX),
        }
    }
}

impl fmt::Display for HashAlg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Internal hashing state.
#[derive(Clone)]
enum DigestState {
    Md5(Md5),
    Ripemd160(Ripemd160),
    Sha1(Sha1),
    Sha256(Sha256),
    Sha384(Sha384),
    Sha512(Sha512),
    Sha3_256(Sha3_256),
    HmacMd5(Hmac<Md5>),
    HmacRipemd160(Hmac<Ripemd160>),
    HmacSha1(Hmac<Sha1>),
    HmacSha256(Hmac<Sha256>),
    HmacSha384(Hmac<Sha384>),
    HmacSha512(Hmac<Sha512>),
    HmacSha3_256(Hmac<Sha3_256>),
    // Keyed or unkeyed, decided at construction.
    Blake3(Box<blake3::Hasher>),
}

impl DigestState {
    fn new(alg: HashAlg, key: &[u8]) -> Result<Self, CryptoError> {
        let bad_key = || CryptoError::KeySetup { alg: alg.name(), key_bits: key.len() * 8 };

        let state = match alg {
            HashAlg::Md5           => DigestState::Md5(Md5::new()),
            HashAlg::Ripemd160     => DigestState::Ripemd160(Ripemd160::new()),
            HashAlg::Sha1          => DigestState::Sha1(Sha1::new()),
            HashAlg::Sha256        => DigestState::Sha256(Sha256::new()),
            HashAlg::Sha384        => DigestState::Sha384(Sha384::new()),
            HashAlg::Sha512        => DigestState::Sha512(Sha512::new()),
            HashAlg::Sha3_256      => DigestState::Sha3_256(Sha3_256::new()),
            HashAlg::Blake3        => DigestState::Blake3(Box::new(blake3::Hasher::new())),
            HashAlg::HmacMd5 => DigestState::HmacMd5(
                <Hmac<Md5> as Mac>::new_from_slice(key).map_err(|_| bad_key())?,
            ),
            HashAlg::HmacRipemd160 => DigestState::HmacRipemd160(
                <Hmac<Ripemd160> as Mac>::new_from_slice(key).map_err(|_| bad_key())?,
            ),
            HashAlg::HmacSha1 => DigestState::HmacSha1(
                <Hmac<Sha1> as Mac>::new_from_slice(key).map_err(|_| bad_key())?,
            ),
            HashAlg::HmacSha256 => DigestState::HmacSha256(
                <Hmac<Sha256> as Mac>::new_from_slice(key).map_err(|_| bad_key())?,
            ),
            HashAlg::HmacSha384 => DigestState::HmacSha384(
                <Hmac<Sha384> as Mac>::new_from_slice(key).map_err(|_| bad_key())?,
            ),
            HashAlg::HmacSha512 => DigestState::HmacSha512(
                <Hmac<Sha512> as Mac>::new_from_slice(key).map_err(|_| bad_key())?,
            ),
            HashAlg::HmacSha3_256 => DigestState::HmacSha3_256(
                <Hmac<Sha3_256> as Mac>::new_from_slice(key).map_err(|_| bad_key())?,
            ),
            HashAlg::Blake3Keyed => {
                let key: [u8; blake3::KEY_LEN] = key.try_into().map_err(|_| bad_key())?;
                DigestState::Blake3(Box::new(blake3::Hasher::new_keyed(&key)))
            }
        };
        Ok(state)
    }

    #[inline]
    fn update(&mut self, data: &[u8]) {
        match self {
            DigestState::Md5(h)          => Digest::update(h, data),
            DigestState::Ripemd160(h)    => Digest::update(h, data),
            DigestState::Sha1(h)         => Digest::update(h, data),
            DigestState::Sha256(h)       => Digest::update(h, data),
            DigestState::Sha384(h)       => Digest::update(h, data),
            DigestState::Sha512(h)       => Digest::update(h, data),
            DigestState::Sha3_256(h)     => Digest::update(h, data),
            DigestState::HmacMd5(m)      => Mac::update(m, data),
            DigestState::HmacRipemd160(m) => Mac::update(m, data),
            DigestState::HmacSha1(m)     => Mac::update(m, data),
            DigestState::HmacSha256(m)   => Mac::update(m, data),
            DigestState::HmacSha384(m)   => Mac::update(m, data),
            DigestState::HmacSha512(m)   => Mac::update(m, data),
            DigestState::HmacSha3_256(m) => Mac::update(m, data),
            // Blake3 update returns &mut Hasher, we ignore it here
            DigestState::Blake3(h)       => { h.update(data); }
        }
    }

    #[inline]
    fn finalize(self) -> Vec<u8> {
        match self {
            DigestState::Md5(h)          => h.finalize().to_vec(),
            DigestState::Ripemd160(h)    => h.finalize().to_vec(),
            DigestState::Sha1(h)         => h.finalize().to_vec(),
            DigestState::Sha256(h)       => h.finalize().to_vec(),
            DigestState::Sha384(h)       => h.finalize().to_vec(),
            DigestState::Sha512(h)       => h.finalize().to_vec(),
            DigestState::Sha3_256(h)     => h.finalize().to_vec(),
            DigestState::HmacMd5(m)      => m.finalize().into_bytes().to_vec(),
            DigestState::HmacRipemd160(m) => m.finalize().into_bytes().to_vec(),
            DigestState::HmacSha1(m)     => m.finalize().into_bytes().to_vec(),
            DigestState::HmacSha256(m)   => m.finalize().into_bytes().to_vec(),
            DigestState::HmacSha384(m)   => m.finalize().into_bytes().to_vec(),
            DigestState::HmacSha512(m)   => m.finalize().into_bytes().to_vec(),
            DigestState::HmacSha3_256(m) => m.finalize().into_bytes().to_vec(),
            DigestState::Blake3(h)       => h.finalize().as_bytes().to_vec(),
        }
    }
}

/// RustCrypto/BLAKE3-backed hash transform.
pub struct SoftwareHash {
    alg: HashAlg,
    template: DigestState,
    running: DigestState,
}

impl SoftwareHash {
    pub fn new(alg: HashAlg, key: &[u8]) -> Result<Self, CryptoError> {
        let bounds = alg.key_bounds();
        if alg.is_keyed() && !bounds.contains(key.len()) {
            return Err(CryptoError::InvalidKeyLen {
                alg: alg.name(),
                min: bounds.min,
                max: bounds.max,
                actual: key.len(),
            });
        }

        let template = DigestState::new(alg, key)?;
        Ok(Self { alg, running: template.clone(), template })
    }
}

impl HashHandle for SoftwareHash {
    fn alg(&self) -> HashAlg {
        self.alg
    }

    fn digest_size(&self) -> usize {
        self.alg.digest_size()
    }

    fn init(&mut self) -> Result<(), CryptoError> {
        self.running = self.template.clone();
        Ok(())
    }

    fn update(&mut self, data: &[u8]) -> Result<(), CryptoError> {
        self.running.update(data);
        Ok(())
    }

    /// Leaves the running state re-initialised.
    fn finalize(&mut self) -> Result<Vec<u8>, CryptoError> {
        let done = std::mem::replace(&mut self.running, self.template.clone());
        Ok(done.finalize())
    }
}
