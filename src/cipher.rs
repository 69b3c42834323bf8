//! Whole-file password encryption.
//!
//! Encrypted files carry a fixed 32-byte header followed by ciphertext:
//!
//! ```text
//! offset  size  field
//! 0       16    salt        random per file, feeds key derivation
//! 16      16    iv          random per file, CBC initialization vector
//! 32      ..    ciphertext  PKCS#7 padded, non-zero multiple of 16 bytes
//! ```
//!
//! There is no magic number, version byte, or integrity tag. A wrong
//! password or damaged file is detected only through PKCS#7 padding
//! validation on the final block, which a corrupted stream can satisfy by
//! chance (roughly 1 in 255), and blocks before the final one can be
//! altered without tripping it at all. The format authenticates nothing;
//! treat files from untrusted sources accordingly.
//!
//! Output files go through [`AtomicWriter`], so an interrupted or failed
//! run never leaves a partial result at the destination.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use zeroize::Zeroizing;

use crate::crypto::{
    FileHeader, KEY_LEN, Kdf, decrypt_stream, encrypt_stream, generate_iv, generate_salt,
};
use crate::error::Error;
use crate::storage::AtomicWriter;

/// Password-based encryption and decryption of files on disk.
pub struct FileCipher {
    kdf: Kdf,
}

impl FileCipher {
    /// Creates a cipher with the default derivation cost.
    pub fn new() -> Self {
        Self::with_kdf(Kdf::default())
    }

    /// Creates a cipher with an explicit derivation cost.
    ///
    /// The cost is not recorded in the file header, so decryption must use
    /// the same cost the file was encrypted with.
    pub fn with_kdf(kdf: Kdf) -> Self {
        Self { kdf }
    }

    /// Encrypts `input` to `output` under `password`.
    ///
    /// A fresh salt and IV are drawn for every call, so encrypting the same
    /// file twice yields unrelated ciphertexts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if either file cannot be accessed and
    /// [`Error::Derivation`] if key derivation fails. On error the output
    /// path is left untouched.
    pub fn encrypt(&self, input: &Path, output: &Path, password: &str) -> Result<(), Error> {
        let source = File::open(input)?;

        let salt = generate_salt()?;
        let iv = generate_iv()?;

        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        self.kdf.derive(password, &salt, key.as_mut())?;

        let header = FileHeader::new(salt, iv);

        let mut writer = AtomicWriter::create(output)?;
        writer.write_all(&header.to_bytes())?;
        encrypt_stream(&key, &iv, source, &mut writer)?;
        writer.commit()
    }

    /// Decrypts `input` to `output` using `password`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WrongPasswordOrCorrupt`] when the file is too short
    /// to hold a header, the ciphertext is not block-aligned, or the final
    /// padding does not validate. A wrong password and a corrupted file are
    /// indistinguishable here. On error the output path is left untouched.
    pub fn decrypt(&self, input: &Path, output: &Path, password: &str) -> Result<(), Error> {
        let mut source = File::open(input)?;
        let header = FileHeader::read_from(&mut source)?;

        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        self.kdf.derive(password, header.salt(), key.as_mut())?;

        let mut writer = AtomicWriter::create(output)?;
        decrypt_stream(&key, header.iv(), source, &mut writer)?;
        writer.commit()
    }
}

impl Default for FileCipher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::BLOCK_LEN;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn cheap_cipher() -> FileCipher {
        FileCipher::with_kdf(Kdf::new(1_000).unwrap())
    }

    fn write_input(dir: &Path, data: &[u8]) -> PathBuf {
        let path = dir.join("input.bin");
        fs::write(&path, data).unwrap();
        path
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let dir = tempdir().unwrap();
        let plaintext = b"attack at dawn";
        let input = write_input(dir.path(), plaintext);
        let encrypted = dir.path().join("input.enc");
        let decrypted = dir.path().join("input.dec");

        let cipher = cheap_cipher();
        cipher.encrypt(&input, &encrypted, "hunter2").unwrap();
        cipher.decrypt(&encrypted, &decrypted, "hunter2").unwrap();

        assert_eq!(fs::read(&decrypted).unwrap(), plaintext);
    }

    #[test]
    fn ciphertext_has_header_plus_padded_length() {
        let dir = tempdir().unwrap();
        let input = write_input(dir.path(), &[7u8; 100]);
        let encrypted = dir.path().join("input.enc");

        cheap_cipher().encrypt(&input, &encrypted, "pw").unwrap();

        // 32-byte header, then 100 bytes padded up to 112
        let expected = (FileHeader::LEN + (100 / BLOCK_LEN + 1) * BLOCK_LEN) as u64;
        assert_eq!(fs::metadata(&encrypted).unwrap().len(), expected);
    }

    #[test]
    fn empty_file_roundtrips() {
        let dir = tempdir().unwrap();
        let input = write_input(dir.path(), b"");
        let encrypted = dir.path().join("input.enc");
        let decrypted = dir.path().join("input.dec");

        let cipher = cheap_cipher();
        cipher.encrypt(&input, &encrypted, "pw").unwrap();

        // header plus a single all-padding block
        assert_eq!(
            fs::metadata(&encrypted).unwrap().len(),
            (FileHeader::LEN + BLOCK_LEN) as u64
        );

        cipher.decrypt(&encrypted, &decrypted, "pw").unwrap();
        assert_eq!(fs::read(&decrypted).unwrap(), b"");
    }

    #[test]
    fn megabyte_file_roundtrips() {
        let dir = tempdir().unwrap();
        let plaintext: Vec<u8> = (0..1_048_576).map(|i| (i % 251) as u8).collect();
        let input = write_input(dir.path(), &plaintext);
        let encrypted = dir.path().join("input.enc");
        let decrypted = dir.path().join("input.dec");

        let cipher = cheap_cipher();
        cipher.encrypt(&input, &encrypted, "pw").unwrap();

        // block-aligned input gains exactly one padding block
        assert_eq!(
            fs::metadata(&encrypted).unwrap().len(),
            (FileHeader::LEN + plaintext.len() + BLOCK_LEN) as u64
        );

        cipher.decrypt(&encrypted, &decrypted, "pw").unwrap();
        assert_eq!(fs::read(&decrypted).unwrap(), plaintext);
    }

    #[test]
    fn each_encryption_uses_fresh_salt_and_iv() {
        let dir = tempdir().unwrap();
        let input = write_input(dir.path(), b"same plaintext every time");
        let first = dir.path().join("first.enc");
        let second = dir.path().join("second.enc");

        let cipher = cheap_cipher();
        cipher.encrypt(&input, &first, "pw").unwrap();
        cipher.encrypt(&input, &second, "pw").unwrap();

        let a = fs::read(&first).unwrap();
        let b = fs::read(&second).unwrap();
        assert_ne!(a[..FileHeader::LEN], b[..FileHeader::LEN]);
        assert_ne!(a[FileHeader::LEN..], b[FileHeader::LEN..]);
    }

    #[test]
    fn wrong_password_fails_or_garbles() {
        let dir = tempdir().unwrap();
        let plaintext = b"the eagle lands at midnight";
        let input = write_input(dir.path(), plaintext);
        let encrypted = dir.path().join("input.enc");

        let cipher = cheap_cipher();
        cipher.encrypt(&input, &encrypted, "right password").unwrap();

        // Padding validation lets roughly 1 in 255 wrong keys through, so a
        // spurious success must still never reproduce the plaintext.
        let mut rejected = 0;
        for i in 0..12 {
            let out = dir.path().join(format!("attempt-{i}.dec"));
            match cipher.decrypt(&encrypted, &out, &format!("wrong password {i}")) {
                Err(Error::WrongPasswordOrCorrupt) => rejected += 1,
                Err(e) => panic!("unexpected error: {e}"),
                Ok(()) => assert_ne!(fs::read(&out).unwrap(), plaintext),
            }
        }
        assert!(rejected >= 10, "only {rejected} of 12 wrong passwords rejected");
    }

    #[test]
    fn tampered_final_block_fails_or_garbles() {
        let dir = tempdir().unwrap();
        let plaintext = b"bytes worth protecting";
        let input = write_input(dir.path(), plaintext);
        let encrypted = dir.path().join("input.enc");
        let out = dir.path().join("input.dec");

        let cipher = cheap_cipher();
        cipher.encrypt(&input, &encrypted, "pw").unwrap();

        let mut bytes = fs::read(&encrypted).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        fs::write(&encrypted, &bytes).unwrap();

        match cipher.decrypt(&encrypted, &out, "pw") {
            Err(Error::WrongPasswordOrCorrupt) => {}
            Err(e) => panic!("unexpected error: {e}"),
            Ok(()) => assert_ne!(fs::read(&out).unwrap(), plaintext),
        }
    }

    #[test]
    fn truncated_files_are_corrupt() {
        let dir = tempdir().unwrap();
        let input = write_input(dir.path(), &[9u8; 64]);
        let encrypted = dir.path().join("input.enc");
        let out = dir.path().join("input.dec");

        let cipher = cheap_cipher();
        cipher.encrypt(&input, &encrypted, "pw").unwrap();
        let bytes = fs::read(&encrypted).unwrap();

        // shorter than the header
        fs::write(&encrypted, &bytes[..20]).unwrap();
        assert!(matches!(
            cipher.decrypt(&encrypted, &out, "pw"),
            Err(Error::WrongPasswordOrCorrupt)
        ));

        // header intact but ciphertext cut mid-block
        fs::write(&encrypted, &bytes[..FileHeader::LEN + 24]).unwrap();
        assert!(matches!(
            cipher.decrypt(&encrypted, &out, "pw"),
            Err(Error::WrongPasswordOrCorrupt)
        ));
    }

    #[test]
    fn failed_decrypt_leaves_no_output() {
        let dir = tempdir().unwrap();
        let input = write_input(dir.path(), b"short lived");
        let encrypted = dir.path().join("input.enc");
        let out = dir.path().join("input.dec");

        let cipher = cheap_cipher();
        cipher.encrypt(&input, &encrypted, "pw").unwrap();

        // guaranteed corruption: cut the ciphertext mid-block
        let bytes = fs::read(&encrypted).unwrap();
        fs::write(&encrypted, &bytes[..bytes.len() - 1]).unwrap();

        cipher.decrypt(&encrypted, &out, "pw").unwrap_err();
        assert!(!out.exists());

        // no stray temporary files either
        let stray: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.contains(".tmp."))
            .collect();
        assert!(stray.is_empty(), "leftover temp files: {stray:?}");
    }

    #[test]
    fn missing_input_is_an_io_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.bin");
        let out = dir.path().join("out.bin");

        let cipher = cheap_cipher();
        assert!(matches!(
            cipher.encrypt(&missing, &out, "pw"),
            Err(Error::Io(_))
        ));
        assert!(matches!(
            cipher.decrypt(&missing, &out, "pw"),
            Err(Error::Io(_))
        ));
    }
}
