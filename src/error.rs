use std::fmt;
use std::io;

#[derive(Debug)]
pub enum Error {
    /// The key-derivation primitive failed or was misconfigured. Unexpected
    /// in normal operation; always fatal for the call.
    Derivation(String),
    /// The OS random source could not fill a buffer.
    Rand,
    /// The credential store could not be read, written, or parsed.
    Storage(String),
    UserExists(String),
    UserNotFound(String),
    InvalidUsername(String),
    /// Decryption failed its final-block padding check, or the input is not
    /// a well-formed encrypted file. A wrong password and a corrupted file
    /// are indistinguishable here and are reported identically.
    WrongPasswordOrCorrupt,
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Derivation(msg) => write!(f, "key derivation failed: {msg}"),
            Error::Rand => write!(f, "system random source unavailable"),
            Error::Storage(msg) => write!(f, "credential store error: {msg}"),
            Error::UserExists(user) => write!(f, "user '{user}' already exists"),
            Error::UserNotFound(user) => write!(f, "user '{user}' not found"),
            Error::InvalidUsername(reason) => write!(f, "invalid username: {reason}"),
            Error::WrongPasswordOrCorrupt => write!(f, "invalid password or corrupted file"),
            Error::Io(err) => write!(f, "i/o error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}
