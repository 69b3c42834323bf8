//! Cryptographic primitives: key derivation, the chunked CBC stream
//! transform, and the encrypted-file header.

pub mod cbc;
pub mod header;
pub mod kdf;

pub use cbc::{decrypt_stream, encrypt_stream};
pub use header::FileHeader;
pub use kdf::{DEFAULT_ITERATIONS, Kdf};

use crate::error::Error;
use getrandom::fill;

/// Length of the random salt (16 bytes).
pub const SALT_LEN: usize = 16;
/// Length of the CBC initialization vector (16 bytes, one AES block).
pub const IV_LEN: usize = 16;
/// Length of derived secrets: cipher keys and stored password hashes
/// (32 bytes / 256 bits).
pub const KEY_LEN: usize = 32;
/// AES block length (16 bytes).
pub const BLOCK_LEN: usize = 16;
/// Chunk size for streaming file reads and writes (4096 bytes).
pub const CHUNK_LEN: usize = 4096;

/// Fills `buf` from the OS random source.
fn secure_random(buf: &mut [u8]) -> Result<(), Error> {
    fill(buf).map_err(|_| Error::Rand)
}

/// Draws a fresh random salt.
pub fn generate_salt() -> Result<[u8; SALT_LEN], Error> {
    let mut salt = [0u8; SALT_LEN];
    secure_random(&mut salt)?;
    Ok(salt)
}

/// Draws a fresh random initialization vector.
pub fn generate_iv() -> Result<[u8; IV_LEN], Error> {
    let mut iv = [0u8; IV_LEN];
    secure_random(&mut iv)?;
    Ok(iv)
}
