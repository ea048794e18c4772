use std::fmt;
use num_enum::TryFromPrimitive;

/// Render a raw registry id as its variant name, or hex when unknown.
pub fn enum_name_or_hex<T>(raw: T::Primitive) -> String
where
    T: TryFromPrimitive + fmt::Debug,
    T::Primitive: fmt::LowerHex,
{
    match T::try_from_primitive(raw) {
        Ok(variant) => format!("{:?}", variant),
        Err(_) => format!("0x{:x}", raw),
    }
}

/// Short, non-reversible key fingerprint for logs (first 4 bytes of SHA-256).
pub fn key_fingerprint(key: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    if key.is_empty() {
        return "-".to_string();
    }
    let digest = Sha256::digest(key);
    hex::encode(&digest[..4])
}
