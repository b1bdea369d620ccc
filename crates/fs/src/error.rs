//! POSIX-visible error kinds.
//!
//! Handlers convert every internal failure into exactly one of these before
//! returning; the kernel only ever sees the numeric code.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    /// Path not present, or the id/index behind it is not live.
    NotFound,
    /// Path shape names a directory where a file is required.
    NotDir,
    /// Path shape names a file where a directory is required.
    IsDir,
    /// Write to a read-only file or read of a write-only file.
    Access,
    /// Operation not permitted, e.g. a partial write where a whole file is
    /// required.
    Perm,
    /// Create over a live id.
    Exists,
    /// Failed parameter validation.
    Invalid,
    /// LLM or search-backend failure, timeout, or malformed reply.
    Io,
    /// Operation outside the handler's contract.
    Unsupported,
}

impl FsError {
    pub fn errno(self) -> i32 {
        match self {
            FsError::NotFound => libc::ENOENT,
            FsError::NotDir => libc::ENOTDIR,
            FsError::IsDir => libc::EISDIR,
            FsError::Access => libc::EACCES,
            FsError::Perm => libc::EPERM,
            FsError::Exists => libc::EEXIST,
            FsError::Invalid => libc::EINVAL,
            FsError::Io => libc::EIO,
            FsError::Unsupported => libc::ENOSYS,
        }
    }
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FsError::NotFound => "ENOENT",
            FsError::NotDir => "ENOTDIR",
            FsError::IsDir => "EISDIR",
            FsError::Access => "EACCES",
            FsError::Perm => "EPERM",
            FsError::Exists => "EEXIST",
            FsError::Invalid => "EINVAL",
            FsError::Io => "EIO",
            FsError::Unsupported => "ENOSYS",
        };
        f.write_str(name)
    }
}

pub type FsResult<T> = Result<T, FsError>;
