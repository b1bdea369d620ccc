//! The filesystem root: four fixed subdirectories, nothing else.

use crate::error::{FsError, FsResult};
use crate::handler::{Attr, DirEntry, Handler};

const TOP_DIRS: [&str; 4] = ["models", "config", "conversations", "semantic_search"];

pub struct RootHandler;

impl Handler for RootHandler {
    fn getattr(&self, path: &str) -> FsResult<Attr> {
        if path == "/" {
            // `.`, `..`, and one link per fixed subdirectory.
            let mut attr = Attr::dir();
            attr.nlink = 2 + TOP_DIRS.len() as u32;
            return Ok(attr);
        }

        let trimmed = path.trim_start_matches('/');
        if TOP_DIRS.contains(&trimmed) {
            return Ok(Attr::dir());
        }
        Err(FsError::NotFound)
    }

    fn readdir(&self, path: &str) -> FsResult<Vec<DirEntry>> {
        if path != "/" {
            return Err(FsError::NotFound);
        }
        let mut entries = vec![DirEntry::dir("."), DirEntry::dir("..")];
        entries.extend(TOP_DIRS.iter().copied().map(DirEntry::dir));
        Ok(entries)
    }

    fn open(&self, _path: &str, _flags: i32) -> FsResult<()> {
        Err(FsError::IsDir)
    }

    // Mutations on `/` fall through to the trait defaults: ENOSYS.
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::FileKind;

    #[test]
    fn root_lists_the_four_subtrees() {
        let handler = RootHandler;
        let names: Vec<String> = handler
            .readdir("/")
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(
            names,
            vec![".", "..", "models", "config", "conversations", "semantic_search"]
        );
    }

    #[test]
    fn unknown_top_level_names_do_not_exist() {
        let handler = RootHandler;
        assert_eq!(handler.getattr("/nope"), Err(FsError::NotFound));
        assert_eq!(handler.getattr("/models").unwrap().kind, FileKind::Directory);
        assert!(handler.getattr("/").unwrap().nlink >= 2);
    }

    #[test]
    fn root_refuses_mutation() {
        let handler = RootHandler;
        assert_eq!(handler.mkdir("/x"), Err(FsError::Unsupported));
        assert_eq!(handler.unlink("/x"), Err(FsError::Unsupported));
        assert_eq!(handler.write("/", b"x", 0), Err(FsError::Unsupported));
    }
}
