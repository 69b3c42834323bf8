use hmac::Hmac;
use pbkdf2::pbkdf2;
use sha2::Sha256;

use super::SALT_LEN;
use crate::error::Error;

/// Default PBKDF2 iteration count. OWASP recommends at least 600,000 for
/// PBKDF2-HMAC-SHA256.
pub const DEFAULT_ITERATIONS: u32 = 600_000;

/// PBKDF2-HMAC-SHA256 configuration.
///
/// Neither the credential store nor the encrypted-file format embeds the
/// iteration count, so data written with one count can only be verified or
/// decrypted with the same count. Stick to [`Kdf::default`] unless every
/// producer and consumer of the data agrees on something else.
#[derive(Debug, Clone, Copy)]
pub struct Kdf {
    iterations: u32,
}

impl Default for Kdf {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

impl Kdf {
    pub fn new(iterations: u32) -> Result<Self, Error> {
        if iterations < 1 {
            return Err(Error::Derivation(
                "iteration count must be at least 1".into(),
            ));
        }
        Ok(Self { iterations })
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Derives `out.len()` bytes from the password and salt.
    ///
    /// Deterministic: identical inputs always produce identical output.
    pub fn derive(
        &self,
        password: &str,
        salt: &[u8; SALT_LEN],
        out: &mut [u8],
    ) -> Result<(), Error> {
        pbkdf2::<Hmac<Sha256>>(password.as_bytes(), salt, self.iterations, out)
            .map_err(|e| Error::Derivation(format!("PBKDF2-HMAC-SHA256 failed: {e}")))
    }
}
