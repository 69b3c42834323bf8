//! Atomic file output.
//!
//! Encrypted and decrypted files are streamed to a temporary file next to
//! the destination and moved into place only on [`AtomicWriter::commit`].
//! If the process fails mid-stream the destination is never touched and the
//! temporary file is removed, so a partially written output cannot be
//! mistaken for a complete one.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use getrandom::fill;

use crate::error::Error;

/// A file writer that only publishes its output on `commit`.
///
/// Writes go to `NAME.tmp.<random hex>` in the destination's directory;
/// `commit` fsyncs the data and atomically replaces the destination.
/// Dropping an uncommitted writer removes the temporary file.
pub struct AtomicWriter {
    file: Option<File>,
    tmp_path: PathBuf,
    dest: PathBuf,
    committed: bool,
}

impl AtomicWriter {
    /// Opens a fresh temporary file beside `dest`.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary file cannot be created, e.g. when
    /// the destination directory does not exist or is not writable.
    pub fn create(dest: &Path) -> Result<Self, Error> {
        let tmp_path = random_tmp_path(dest)?;

        // create_new: refuse to write through a path something else created
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)?;

        Ok(Self {
            file: Some(file),
            tmp_path,
            dest: dest.to_path_buf(),
            committed: false,
        })
    }

    /// Syncs the temporary file and atomically moves it over the
    /// destination, then syncs the parent directory so the rename itself is
    /// persisted.
    pub fn commit(mut self) -> Result<(), Error> {
        if let Some(file) = self.file.take() {
            file.sync_all()?;
        }

        self.atomic_replace()?;
        self.committed = true;

        #[cfg(unix)]
        if let Some(parent) = self.dest.parent() {
            if !parent.as_os_str().is_empty() {
                File::open(parent)?.sync_all()?;
            }
        }

        Ok(())
    }

    /// Atomically replaces the destination with the temporary file.
    ///
    /// The temp file sits in the destination's own directory, so this is a
    /// same-filesystem `rename()`, which POSIX makes atomic.
    #[cfg(not(target_os = "windows"))]
    fn atomic_replace(&self) -> Result<(), Error> {
        fs::rename(&self.tmp_path, &self.dest)?;
        Ok(())
    }

    /// Atomically replaces the destination with the temporary file.
    ///
    /// Uses `ReplaceFileW` with `REPLACEFILE_WRITE_THROUGH`. That call
    /// requires the destination to exist already, so a brand-new output
    /// falls back to a plain rename.
    #[cfg(target_os = "windows")]
    fn atomic_replace(&self) -> Result<(), Error> {
        use std::ffi::OsStr;
        use std::os::windows::ffi::OsStrExt;
        use windows_sys::Win32::Storage::FileSystem::{REPLACEFILE_WRITE_THROUGH, ReplaceFileW};

        if !self.dest.exists() {
            fs::rename(&self.tmp_path, &self.dest)?;
            return Ok(());
        }

        fn to_wide(s: &OsStr) -> Vec<u16> {
            s.encode_wide().chain(std::iter::once(0)).collect()
        }

        let dest_w = to_wide(self.dest.as_os_str());
        let tmp_w = to_wide(self.tmp_path.as_os_str());

        // SAFETY: both strings are null-terminated UTF-16 buffers that
        // outlive the call, and ReplaceFileW does not retain the pointers.
        let result = unsafe {
            ReplaceFileW(
                dest_w.as_ptr(),
                tmp_w.as_ptr(),
                std::ptr::null(),
                REPLACEFILE_WRITE_THROUGH,
                std::ptr::null(),
                std::ptr::null(),
            )
        };

        if result == 0 {
            return Err(Error::Io(io::Error::last_os_error()));
        }

        Ok(())
    }
}

impl Write for AtomicWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.file.as_mut() {
            Some(file) => file.write(buf),
            None => Err(io::Error::other("writer already committed")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for AtomicWriter {
    fn drop(&mut self) {
        if !self.committed {
            // close the handle before unlinking so Windows can delete it
            self.file.take();
            let _ = fs::remove_file(&self.tmp_path);
        }
    }
}

/// Builds a unique `NAME.tmp.<hex>` path in the destination's directory,
/// named from the OS random source so concurrent writers cannot collide.
fn random_tmp_path(dest: &Path) -> Result<PathBuf, Error> {
    let mut buf = [0u8; 8];
    fill(&mut buf).map_err(|_| Error::Rand)?;

    let rand_string = buf.iter().map(|b| format!("{b:02x}")).collect::<String>();

    let file_name = dest.file_name().ok_or_else(|| {
        Error::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            "output path has no file name",
        ))
    })?;

    let tmp_name = format!("{}.tmp.{}", file_name.to_string_lossy(), rand_string);

    Ok(dest.with_file_name(tmp_name))
}
