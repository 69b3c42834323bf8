//! Password authentication against a plain text credential file and
//! password-based file encryption, both built on the same PBKDF2 key
//! derivation.

mod cipher;
mod credentials;
mod crypto;
mod error;
mod storage;

pub use crate::cipher::FileCipher;
pub use crate::credentials::{CredentialStore, PASSWORD_HASH_LEN};
pub use crate::crypto::{DEFAULT_ITERATIONS, Kdf};
pub use crate::error::Error;

use std::path::PathBuf;

use directories::ProjectDirs;

/// Platform default location of the credentials file.
pub fn default_users_path() -> Result<PathBuf, Error> {
    let project_dirs = ProjectDirs::from("", "", "passlock")
        .ok_or_else(|| Error::Storage("could not determine platform directories".to_string()))?;

    Ok(project_dirs.data_dir().join("passwords.txt"))
}
