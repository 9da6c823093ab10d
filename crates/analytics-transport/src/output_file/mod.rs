use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("invalid output file path: {0:?}")]
    InvalidPath(PathBuf),

    #[error("output file already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("unable to create {}: {}", .0.display(), .1)]
    CreateFailed(PathBuf, #[source] io::Error),

    #[error("unable to open {}: {}", .0.display(), .1)]
    OpenFailed(PathBuf, #[source] io::Error),

    #[error("unable to write {}: {}", .0.display(), .1)]
    WriteFailed(PathBuf, #[source] io::Error),

    #[error("unable to close {}: {}", .0.display(), .1)]
    CloseFailed(PathBuf, #[source] io::Error),
}

/// Why a write did not touch the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Empty,
    /// Neither `create` nor `open` has been called, or the file was closed.
    NotOpen,
    InvalidEncoding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written(usize),
    Skipped(SkipReason),
}

/// Append-only file that buffers serialized events until they are uploaded.
///
/// Writing to a file that is not open is not an error; it is reported as
/// [`WriteOutcome::Skipped`] and performs no I/O.
#[derive(Debug)]
pub struct OutputFile {
    path: PathBuf,
    handle: Option<File>,
}

impl OutputFile {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, FileError> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(FileError::InvalidPath(path));
        }
        Ok(Self { path, handle: None })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Create the file empty and open it. Never touches an existing file.
    pub fn create(&mut self) -> Result<(), FileError> {
        let file = OpenOptions::new()
            .append(true)
            .create_new(true)
            .open(&self.path)
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => FileError::AlreadyExists(self.path.clone()),
                _ => FileError::CreateFailed(self.path.clone(), e),
            })?;

        debug!(path = %self.path.display(), "created output file");
        self.handle = Some(file);
        Ok(())
    }

    /// Open an existing file for appending. No-op if already open.
    pub fn open(&mut self) -> Result<(), FileError> {
        if self.handle.is_some() {
            return Ok(());
        }

        let file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| FileError::OpenFailed(self.path.clone(), e))?;

        debug!(path = %self.path.display(), "opened output file");
        self.handle = Some(file);
        Ok(())
    }

    pub fn write(&mut self, data: &[u8]) -> Result<WriteOutcome, FileError> {
        if data.is_empty() {
            return Ok(WriteOutcome::Skipped(SkipReason::Empty));
        }
        let Some(file) = self.handle.as_mut() else {
            debug!(path = %self.path.display(), bytes = data.len(), "write skipped, file not open");
            return Ok(WriteOutcome::Skipped(SkipReason::NotOpen));
        };

        file.write_all(data)
            .map_err(|e| FileError::WriteFailed(self.path.clone(), e))?;
        Ok(WriteOutcome::Written(data.len()))
    }

    pub fn write_str(&mut self, data: &str) -> Result<WriteOutcome, FileError> {
        self.write(data.as_bytes())
    }

    /// Write `data` only if it is valid UTF-8 text.
    pub fn write_utf8(&mut self, data: &[u8]) -> Result<WriteOutcome, FileError> {
        match std::str::from_utf8(data) {
            Ok(text) => self.write_str(text),
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "write skipped, invalid UTF-8");
                Ok(WriteOutcome::Skipped(SkipReason::InvalidEncoding))
            }
        }
    }

    /// Flush to durable storage and close. Closing a closed file is a no-op.
    ///
    /// Only flush and sync failures are reported as [`FileError::CloseFailed`].
    /// The handle is released by dropping it, and `File`'s `Drop` ignores
    /// errors from the OS close itself.
    pub fn close(&mut self) -> Result<(), FileError> {
        // Cleared before the OS close so a failed close is never retried.
        let Some(mut file) = self.handle.take() else {
            return Ok(());
        };

        file.flush()
            .and_then(|()| file.sync_all())
            .map_err(|e| FileError::CloseFailed(self.path.clone(), e))?;

        debug!(path = %self.path.display(), "closed output file");
        Ok(())
    }
}
