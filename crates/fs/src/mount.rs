//! fuser glue: translates inode-addressed kernel callbacks into calls on
//! the path-based dispatch.
//!
//! The kernel speaks inodes; the engine speaks absolute virtual paths. An
//! inode table assigns a number to every path the kernel has looked up and
//! resolves it back on each callback. Numbers are dropped again on
//! `unlink`/`rmdir`; everything else ages out with the short attribute TTL.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use fuser::{
    FileAttr, FileType, Filesystem, ReplyAttr, ReplyData, ReplyDirectory, ReplyEmpty,
    ReplyEntry, ReplyOpen, ReplyWrite, Request, TimeOrNow, FUSE_ROOT_ID,
};

use crate::dispatch::Dispatch;
use crate::handler::{Attr, FileKind};

const TTL: Duration = Duration::from_secs(1);

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Inode table
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

struct InodeTable {
    by_ino: HashMap<u64, String>,
    by_path: HashMap<String, u64>,
    next_ino: u64,
}

impl InodeTable {
    fn new() -> Self {
        let mut table = Self {
            by_ino: HashMap::new(),
            by_path: HashMap::new(),
            next_ino: FUSE_ROOT_ID + 1,
        };
        table.by_ino.insert(FUSE_ROOT_ID, "/".to_owned());
        table.by_path.insert("/".to_owned(), FUSE_ROOT_ID);
        table
    }

    fn get_or_assign(&mut self, path: &str) -> u64 {
        if let Some(&ino) = self.by_path.get(path) {
            return ino;
        }
        let ino = self.next_ino;
        self.next_ino += 1;
        self.by_ino.insert(ino, path.to_owned());
        self.by_path.insert(path.to_owned(), ino);
        ino
    }

    fn path_of(&self, ino: u64) -> Option<String> {
        self.by_ino.get(&ino).cloned()
    }

    fn ino_of(&self, path: &str) -> Option<u64> {
        self.by_path.get(path).copied()
    }

    fn forget_path(&mut self, path: &str) {
        if let Some(ino) = self.by_path.remove(path) {
            self.by_ino.remove(&ino);
        }
    }
}

fn join(parent: &str, name: &OsStr) -> Option<String> {
    let name = name.to_str()?;
    if parent == "/" {
        Some(format!("/{name}"))
    } else {
        Some(format!("{parent}/{name}"))
    }
}

fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(pos) => &path[..pos],
    }
}

fn file_attr(ino: u64, attr: &Attr, req: &Request<'_>) -> FileAttr {
    let now = SystemTime::now();
    FileAttr {
        ino,
        size: attr.size,
        blocks: 0,
        atime: now,
        mtime: now,
        ctime: now,
        crtime: now,
        kind: match attr.kind {
            FileKind::Directory => FileType::Directory,
            FileKind::Regular => FileType::RegularFile,
        },
        perm: attr.perm,
        nlink: attr.nlink,
        uid: req.uid(),
        gid: req.gid(),
        rdev: 0,
        blksize: 512,
        flags: 0,
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Filesystem implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct LlmFuse {
    dispatch: Arc<Dispatch>,
    inodes: InodeTable,
}

impl LlmFuse {
    pub fn new(dispatch: Arc<Dispatch>) -> Self {
        Self {
            dispatch,
            inodes: InodeTable::new(),
        }
    }

    fn resolve(&self, ino: u64) -> Option<String> {
        let path = self.inodes.path_of(ino);
        if path.is_none() {
            tracing::warn!(ino, "callback for unknown inode");
        }
        path
    }
}

impl Filesystem for LlmFuse {
    fn lookup(&mut self, req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let Some(parent_path) = self.resolve(parent) else {
            reply.error(libc::ENOENT);
            return;
        };
        let Some(path) = join(&parent_path, name) else {
            reply.error(libc::ENOENT);
            return;
        };

        match self.dispatch.getattr(&path) {
            Ok(attr) => {
                let ino = self.inodes.get_or_assign(&path);
                reply.entry(&TTL, &file_attr(ino, &attr, req), 0);
            }
            Err(e) => reply.error(e.errno()),
        }
    }

    fn getattr(&mut self, req: &Request<'_>, ino: u64, reply: ReplyAttr) {
        let Some(path) = self.resolve(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.dispatch.getattr(&path) {
            Ok(attr) => reply.attr(&TTL, &file_attr(ino, &attr, req)),
            Err(e) => reply.error(e.errno()),
        }
    }

    /// The virtual files have no persisted size, so truncation (and every
    /// other attribute change) is acknowledged without effect. This is what
    /// lets `echo x > file` open with `O_TRUNC` and proceed to the write.
    #[allow(clippy::too_many_arguments)]
    fn setattr(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        _mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        _size: Option<u64>,
        _atime: Option<TimeOrNow>,
        _mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        let Some(path) = self.resolve(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.dispatch.getattr(&path) {
            Ok(attr) => reply.attr(&TTL, &file_attr(ino, &attr, req)),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn mknod(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        _rdev: u32,
        reply: ReplyEntry,
    ) {
        if mode & libc::S_IFMT as u32 != libc::S_IFREG as u32 {
            reply.error(libc::EPERM);
            return;
        }
        let Some(path) = self.resolve(parent).and_then(|p| join(&p, name)) else {
            reply.error(libc::ENOENT);
            return;
        };

        if let Err(e) = self.dispatch.mknod(&path) {
            reply.error(e.errno());
            return;
        }
        match self.dispatch.getattr(&path) {
            Ok(attr) => {
                let ino = self.inodes.get_or_assign(&path);
                reply.entry(&TTL, &file_attr(ino, &attr, req), 0);
            }
            Err(e) => reply.error(e.errno()),
        }
    }

    fn mkdir(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        let Some(path) = self.resolve(parent).and_then(|p| join(&p, name)) else {
            reply.error(libc::ENOENT);
            return;
        };

        if let Err(e) = self.dispatch.mkdir(&path) {
            reply.error(e.errno());
            return;
        }
        match self.dispatch.getattr(&path) {
            Ok(attr) => {
                let ino = self.inodes.get_or_assign(&path);
                reply.entry(&TTL, &file_attr(ino, &attr, req), 0);
            }
            Err(e) => reply.error(e.errno()),
        }
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let Some(path) = self.resolve(parent).and_then(|p| join(&p, name)) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.dispatch.unlink(&path) {
            Ok(()) => {
                self.inodes.forget_path(&path);
                reply.ok();
            }
            Err(e) => reply.error(e.errno()),
        }
    }

    fn rmdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let Some(path) = self.resolve(parent).and_then(|p| join(&p, name)) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.dispatch.rmdir(&path) {
            Ok(()) => {
                self.inodes.forget_path(&path);
                reply.ok();
            }
            Err(e) => reply.error(e.errno()),
        }
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        let Some(path) = self.resolve(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.dispatch.open(&path, flags) {
            Ok(()) => reply.opened(0, 0),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let Some(path) = self.resolve(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.dispatch.read(&path, size, offset) {
            Ok(data) => reply.data(&data),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        let Some(path) = self.resolve(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.dispatch.write(&path, data, offset) {
            Ok(written) => reply.written(written),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn flush(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        _fh: u64,
        _lock_owner: u64,
        reply: ReplyEmpty,
    ) {
        // Nothing buffered on our side; acknowledge so close() succeeds.
        reply.ok();
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let Some(path) = self.resolve(ino) else {
            reply.error(libc::ENOENT);
            return;
        };

        let entries = match self.dispatch.readdir(&path) {
            Ok(entries) => entries,
            Err(e) => {
                reply.error(e.errno());
                return;
            }
        };

        let parent_ino = self.inodes.ino_of(parent_of(&path)).unwrap_or(FUSE_ROOT_ID);
        for (i, entry) in entries.iter().enumerate().skip(offset as usize) {
            let entry_ino = match entry.name.as_str() {
                "." => ino,
                ".." => parent_ino,
                name => {
                    let child = if path == "/" {
                        format!("/{name}")
                    } else {
                        format!("{path}/{name}")
                    };
                    self.inodes.get_or_assign(&child)
                }
            };
            let kind = match entry.kind {
                FileKind::Directory => FileType::Directory,
                FileKind::Regular => FileType::RegularFile,
            };
            // The next offset is i + 1; a full buffer ends this batch.
            if reply.add(entry_ino, (i + 1) as i64, kind, &entry.name) {
                break;
            }
        }
        reply.ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inode_numbers_are_stable_per_path() {
        let mut table = InodeTable::new();
        let a = table.get_or_assign("/models/gpt-x");
        let b = table.get_or_assign("/models/gpt-x");
        assert_eq!(a, b);
        assert_ne!(a, FUSE_ROOT_ID);
        assert_eq!(table.path_of(a).as_deref(), Some("/models/gpt-x"));
    }

    #[test]
    fn forgotten_paths_get_fresh_numbers() {
        let mut table = InodeTable::new();
        let old = table.get_or_assign("/conversations/x");
        table.forget_path("/conversations/x");
        assert_eq!(table.path_of(old), None);
        let new = table.get_or_assign("/conversations/x");
        assert_ne!(old, new);
    }

    #[test]
    fn parents_resolve_up_to_the_root() {
        assert_eq!(parent_of("/models/gpt-x"), "/models");
        assert_eq!(parent_of("/models"), "/");
        assert_eq!(parent_of("/"), "/");
    }
}
