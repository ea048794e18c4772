pub mod types;
pub mod cipher;
pub mod digest;
pub mod provider;

pub use types::*;
pub use cipher::{CipherAlg, SoftwareCipher};
pub use digest::{HashAlg, SoftwareHash};
pub use provider::*;
