//! Chunked AES-256-CBC transform with PKCS#7 padding.
//!
//! Input is consumed in fixed-size chunks so memory use stays bounded
//! regardless of stream length. Decryption holds back one block at all times
//! because the final block carries the padding, and which block is final is
//! only known at end of stream.

use std::io::{self, Read, Write};

use aes::Aes256;
use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use zeroize::Zeroizing;

use super::{BLOCK_LEN, CHUNK_LEN, IV_LEN, KEY_LEN};
use crate::error::Error;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Encrypts everything from `input` into `output`.
///
/// The final block is PKCS#7-padded; block-aligned input gains one full
/// padding block, so ciphertext is always a non-zero multiple of the block
/// length. On error the bytes already written to `output` are indeterminate.
pub fn encrypt_stream<R: Read, W: Write>(
    key: &[u8; KEY_LEN],
    iv: &[u8; IV_LEN],
    mut input: R,
    mut output: W,
) -> Result<(), Error> {
    let mut enc = Aes256CbcEnc::new(key.into(), iv.into());

    let mut chunk = Zeroizing::new(vec![0u8; CHUNK_LEN]);
    let mut pending: Zeroizing<Vec<u8>> =
        Zeroizing::new(Vec::with_capacity(CHUNK_LEN + BLOCK_LEN));

    loop {
        let n = match input.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        pending.extend_from_slice(&chunk[..n]);

        let full = pending.len() - pending.len() % BLOCK_LEN;
        if full > 0 {
            for block in pending[..full].chunks_exact_mut(BLOCK_LEN) {
                enc.encrypt_block_mut(aes::Block::from_mut_slice(block));
            }
            output.write_all(&pending[..full])?;
            pending.drain(..full);
        }
    }

    // The remainder is shorter than one block; padding emits exactly one
    // final block.
    let final_block = enc.encrypt_padded_vec_mut::<Pkcs7>(&pending);
    output.write_all(&final_block)?;
    Ok(())
}

/// Decrypts a stream produced by [`encrypt_stream`], stripping the padding
/// from the held-back final block.
///
/// Fails with [`Error::WrongPasswordOrCorrupt`] when the ciphertext is empty,
/// not a multiple of the block length, or the final-block padding does not
/// validate. On error the bytes already written to `output` are
/// indeterminate.
pub fn decrypt_stream<R: Read, W: Write>(
    key: &[u8; KEY_LEN],
    iv: &[u8; IV_LEN],
    mut input: R,
    mut output: W,
) -> Result<(), Error> {
    let mut dec = Aes256CbcDec::new(key.into(), iv.into());

    let mut chunk = vec![0u8; CHUNK_LEN];
    let mut pending: Zeroizing<Vec<u8>> =
        Zeroizing::new(Vec::with_capacity(CHUNK_LEN + BLOCK_LEN));

    loop {
        let n = match input.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        pending.extend_from_slice(&chunk[..n]);

        // Decrypt all complete blocks except the trailing one.
        if pending.len() >= 2 * BLOCK_LEN {
            let full = (pending.len() - BLOCK_LEN) / BLOCK_LEN * BLOCK_LEN;
            for block in pending[..full].chunks_exact_mut(BLOCK_LEN) {
                dec.decrypt_block_mut(aes::Block::from_mut_slice(block));
            }
            output.write_all(&pending[..full])?;
            pending.drain(..full);
        }
    }

    // A well-formed ciphertext is a non-zero multiple of the block length,
    // so exactly one held-back block must remain.
    if pending.len() != BLOCK_LEN {
        return Err(Error::WrongPasswordOrCorrupt);
    }
    let plaintext = Zeroizing::new(
        dec.decrypt_padded_vec_mut::<Pkcs7>(&pending)
            .map_err(|_| Error::WrongPasswordOrCorrupt)?,
    );
    output.write_all(&plaintext)?;
    Ok(())
}
