use std::io::{self, Read};

use super::{IV_LEN, SALT_LEN};
use crate::error::Error;

/// Header prepended to every encrypted file: the key-derivation salt followed
/// by the CBC initialization vector. The layout is exactly these 32 bytes;
/// there is no magic number, version field, or integrity tag.
#[derive(Debug, Clone, Copy)]
pub struct FileHeader {
    salt: [u8; SALT_LEN],
    iv: [u8; IV_LEN],
}

impl FileHeader {
    pub const LEN: usize = SALT_LEN + IV_LEN;

    pub fn new(salt: [u8; SALT_LEN], iv: [u8; IV_LEN]) -> Self {
        Self { salt, iv }
    }

    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }

    pub fn iv(&self) -> &[u8; IV_LEN] {
        &self.iv
    }

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut buf = [0u8; Self::LEN];
        buf[..SALT_LEN].copy_from_slice(&self.salt);
        buf[SALT_LEN..].copy_from_slice(&self.iv);
        buf
    }

    /// Reads the header from the start of an encrypted stream, leaving the
    /// reader positioned at the first ciphertext byte. A stream too short to
    /// contain a header is reported as corrupt.
    pub fn read_from<R: Read>(mut reader: R) -> Result<Self, Error> {
        let mut buf = [0u8; Self::LEN];
        match reader.read_exact(&mut buf) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Err(Error::WrongPasswordOrCorrupt);
            }
            Err(e) => return Err(e.into()),
        }

        let mut salt = [0u8; SALT_LEN];
        let mut iv = [0u8; IV_LEN];
        salt.copy_from_slice(&buf[..SALT_LEN]);
        iv.copy_from_slice(&buf[SALT_LEN..]);
        Ok(Self { salt, iv })
    }
}
