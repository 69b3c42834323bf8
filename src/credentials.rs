//! Password credential records.
//!
//! Users are kept in a plain text file, one record per line:
//!
//! ```text
//! username:salt_hex:hash_hex
//! ```
//!
//! where `salt_hex` is 32 lowercase hex characters (a 16-byte salt) and
//! `hash_hex` is 64 lowercase hex characters (the 32-byte PBKDF2 hash of
//! the password under that salt). The file is append-only: registration
//! adds one line and never rewrites earlier ones. Lookups scan from the
//! top and take the first record whose username matches.
//!
//! The store does no file locking. Concurrent registrations are each a
//! single appended write, but callers that need stronger guarantees must
//! serialize access themselves.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use zeroize::Zeroizing;

use crate::crypto::{Kdf, SALT_LEN, generate_salt};
use crate::error::Error;

/// Length in bytes of a stored password hash.
pub const PASSWORD_HASH_LEN: usize = 32;

/// A parsed credential line.
struct Record {
    salt: [u8; SALT_LEN],
    hash: [u8; PASSWORD_HASH_LEN],
}

/// Registration and authentication against a credential file.
pub struct CredentialStore {
    path: PathBuf,
    kdf: Kdf,
}

impl CredentialStore {
    /// Opens a store at `path` with the default derivation cost.
    ///
    /// The file does not have to exist yet; it is created on first
    /// registration.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_kdf(path, Kdf::default())
    }

    /// Opens a store with an explicit derivation cost.
    ///
    /// Stored hashes only verify under the same cost they were created
    /// with, so this must match across registration and authentication.
    pub fn with_kdf(path: impl Into<PathBuf>, kdf: Kdf) -> Self {
        Self {
            path: path.into(),
            kdf,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Registers a new user.
    ///
    /// Hashes the password with a fresh random salt and appends one record
    /// line to the store file, creating the file and its parent directories
    /// on first use.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUsername`] if the username is empty or
    /// contains a `:` or line break, and [`Error::UserExists`] if a record
    /// for this username already exists.
    pub fn register(&self, username: &str, password: &str) -> Result<(), Error> {
        validate_username(username)?;

        if self.lookup(username)?.is_some() {
            return Err(Error::UserExists(username.to_string()));
        }

        let salt = generate_salt()?;
        let mut hash = Zeroizing::new([0u8; PASSWORD_HASH_LEN]);
        self.kdf.derive(password, &salt, hash.as_mut())?;

        let line = format!(
            "{username}:{}:{}\n",
            hex_encode(&salt),
            hex_encode(hash.as_ref())
        );

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.storage_err("create", e))?;
            }
        }

        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(|e| self.storage_err("open", e))?;

        // one write per record keeps concurrent appends from interleaving
        file.write_all(line.as_bytes())
            .map_err(|e| self.storage_err("append to", e))?;
        file.sync_all().map_err(|e| self.storage_err("sync", e))?;

        Ok(())
    }

    /// Checks a password against the stored hash for `username`.
    ///
    /// Re-derives the hash with the record's salt and compares in constant
    /// time. `Ok(false)` means the user exists but the password does not
    /// match.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UserNotFound`] if no record matches, including when
    /// the store file itself is missing.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<bool, Error> {
        let record = self
            .lookup(username)?
            .ok_or_else(|| Error::UserNotFound(username.to_string()))?;

        let mut candidate = Zeroizing::new([0u8; PASSWORD_HASH_LEN]);
        self.kdf.derive(password, &record.salt, candidate.as_mut())?;

        Ok(ct_eq(candidate.as_ref(), &record.hash))
    }

    /// Finds the first record for `username`, or `None` when the user (or
    /// the whole store file) does not exist.
    fn lookup(&self, username: &str) -> Result<Option<Record>, Error> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.storage_err("read", e)),
        };

        for (index, line) in contents.lines().enumerate() {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.is_empty() {
                continue;
            }

            let (name, record) = parse_record(line).ok_or_else(|| {
                Error::Storage(format!(
                    "malformed record at {}:{}",
                    self.path.display(),
                    index + 1
                ))
            })?;

            if name == username {
                return Ok(Some(record));
            }
        }

        Ok(None)
    }

    fn storage_err(&self, action: &str, e: io::Error) -> Error {
        Error::Storage(format!("failed to {action} {}: {e}", self.path.display()))
    }
}

fn validate_username(username: &str) -> Result<(), Error> {
    if username.is_empty() {
        return Err(Error::InvalidUsername("must not be empty".to_string()));
    }
    if username.contains(':') {
        return Err(Error::InvalidUsername(
            "must not contain ':'".to_string(),
        ));
    }
    if username.contains('\n') || username.contains('\r') {
        return Err(Error::InvalidUsername(
            "must not contain line breaks".to_string(),
        ));
    }
    Ok(())
}

fn parse_record(line: &str) -> Option<(&str, Record)> {
    let mut fields = line.splitn(3, ':');
    let name = fields.next()?;
    let salt = hex_decode::<SALT_LEN>(fields.next()?)?;
    let hash = hex_decode::<PASSWORD_HASH_LEN>(fields.next()?)?;

    if name.is_empty() {
        return None;
    }

    Some((name, Record { salt, hash }))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Decodes exactly `N` bytes of strict lowercase hex.
fn hex_decode<const N: usize>(s: &str) -> Option<[u8; N]> {
    if s.len() != 2 * N {
        return None;
    }
    if !s
        .bytes()
        .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    {
        return None;
    }

    let mut out = [0u8; N];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&s[2 * i..2 * i + 2], 16).ok()?;
    }
    Some(out)
}

/// Equality over digests that does not short-circuit on the first
/// differing byte.
fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
