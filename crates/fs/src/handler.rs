//! The per-subtree VFS contract and its supporting types.

use crate::error::{FsError, FsResult};

/// Directory size reported in attributes. Advisory, like every size here.
pub const DIR_SIZE: u64 = 4096;
/// Size reported for virtual files whose real length is only known at read
/// time. Tools like `cat` read until EOF, so the value just has to be
/// non-zero.
pub const FILE_SIZE: u64 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Directory,
    Regular,
}

/// Attributes of a virtual node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attr {
    pub kind: FileKind,
    pub perm: u16,
    pub nlink: u32,
    pub size: u64,
}

impl Attr {
    pub fn dir() -> Self {
        Attr {
            kind: FileKind::Directory,
            perm: 0o755,
            nlink: 2,
            size: DIR_SIZE,
        }
    }

    pub fn file(perm: u16) -> Self {
        Attr {
            kind: FileKind::Regular,
            perm,
            nlink: 1,
            size: FILE_SIZE,
        }
    }
}

/// One entry in a directory listing. Handlers include `.` and `..`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: FileKind,
}

impl DirEntry {
    pub fn dir(name: impl Into<String>) -> Self {
        DirEntry {
            name: name.into(),
            kind: FileKind::Directory,
        }
    }

    pub fn file(name: impl Into<String>) -> Self {
        DirEntry {
            name: name.into(),
            kind: FileKind::Regular,
        }
    }
}

/// The operations a subtree handler may implement. Anything it leaves out
/// answers `ENOSYS`.
///
/// Handlers never call each other and hold no lock while invoking another
/// component; they acquire only their own internal locks and those of the
/// shared stores they reference.
pub trait Handler: Send + Sync {
    fn getattr(&self, _path: &str) -> FsResult<Attr> {
        Err(FsError::Unsupported)
    }

    fn readdir(&self, _path: &str) -> FsResult<Vec<DirEntry>> {
        Err(FsError::Unsupported)
    }

    /// `flags` are the open(2) flags as delivered by the kernel.
    fn open(&self, _path: &str, _flags: i32) -> FsResult<()> {
        Err(FsError::Unsupported)
    }

    /// Returns the requested window of the materialised content.
    fn read(&self, _path: &str, _size: u32, _offset: i64) -> FsResult<Vec<u8>> {
        Err(FsError::Unsupported)
    }

    /// Returns the number of bytes consumed.
    fn write(&self, _path: &str, _data: &[u8], _offset: i64) -> FsResult<u32> {
        Err(FsError::Unsupported)
    }

    fn mkdir(&self, _path: &str) -> FsResult<()> {
        Err(FsError::Unsupported)
    }

    fn rmdir(&self, _path: &str) -> FsResult<()> {
        Err(FsError::Unsupported)
    }

    fn unlink(&self, _path: &str) -> FsResult<()> {
        Err(FsError::Unsupported)
    }

    fn mknod(&self, _path: &str) -> FsResult<()> {
        Err(FsError::Unsupported)
    }
}

/// Offset-honouring read: empty at or past EOF, otherwise the window
/// `content[offset .. min(offset + size, len)]`.
pub fn read_slice(content: &[u8], size: u32, offset: i64) -> Vec<u8> {
    if offset < 0 {
        return Vec::new();
    }
    let offset = offset as usize;
    if offset >= content.len() {
        return Vec::new();
    }
    let end = content.len().min(offset + size as usize);
    content[offset..end].to_vec()
}
