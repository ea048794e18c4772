//! Fixed sizes, limits and numeric registries shared by the table and engine.

/// One page. Default staging buffer size for `CryptoEngine::run`.
pub const PAGE_SIZE: usize = 4096;

/// Largest block (and IV) length across supported ciphers.
pub const MAX_BLOCK_LEN: usize = 16;

/// Hard ceiling on cipher key bytes, checked before any key copy.
pub const CIPHER_MAX_KEY_LEN: usize = 64;

/// Hard ceiling on HMAC key bytes.
pub const HMAC_MAX_KEY_LEN: usize = 512;

/// Largest digest produced by any supported hash.
pub const HASH_MAX_LEN: usize = 64;

/// Default bound on session id draws before giving up.
pub const MAX_ID_DRAWS: usize = 64;

/// Operation codes (raw form used at the dispatch boundary).
pub mod op_codes {
    pub const COP_ENCRYPT: u16 = 0;
    pub const COP_DECRYPT: u16 = 1;
}

/// Cipher identifiers.
pub mod cipher_ids {
    pub const DES_CBC: u16      = 1;
    pub const TDES_CBC: u16     = 2;
    pub const BLF_CBC: u16      = 3;
    pub const AES_CBC: u16      = 11;
    pub const CAMELLIA_CBC: u16 = 101;
}

/// Hash identifiers. Keyed (HMAC) and unkeyed variants are distinct ids.
pub mod mac_ids {
    pub const MD5_HMAC: u16       = 6;
    pub const SHA1_HMAC: u16      = 7;
    pub const RIPEMD160_HMAC: u16 = 8;
    pub const MD5: u16            = 13;
    pub const RIPEMD160: u16      = 14;
    pub const SHA1: u16           = 15;
    pub const SHA2_256_HMAC: u16  = 19;
    pub const SHA2_384_HMAC: u16  = 20;
    pub const SHA2_512_HMAC: u16  = 21;
    pub const SHA2_256: u16       = 103;
    pub const SHA2_384: u16       = 104;
    pub const SHA2_512: u16       = 105;
    pub const SHA3_256: u16       = 106;
    pub const SHA3_256_HMAC: u16  = 107;
    pub const BLAKE3: u16         = 108;
    pub const BLAKE3_KEYED: u16   = 109;
}
