//! `/semantic_search`: index directories backed entirely by the search
//! service.
//!
//! The backend owns index and document existence; this handler keeps only
//! the per-index last-query-result cache that makes reading the `query`
//! file after writing it meaningful.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use llmfs_search::SearchBackend;

use crate::error::{FsError, FsResult};
use crate::handler::{read_slice, Attr, DirEntry, Handler};
use crate::path::components;

const NO_QUERY_YET: &str = "No query has been made for this index yet.\n";

#[derive(Debug, PartialEq, Eq)]
enum SearchPath<'a> {
    Root,
    IndexDir(&'a str),
    CorpusDir(&'a str),
    CorpusFile { index: &'a str, doc: &'a str },
    QueryFile(&'a str),
    Unknown,
}

fn parse(path: &str) -> SearchPath<'_> {
    let parts = components(path);
    match parts.as_slice() {
        ["semantic_search"] => SearchPath::Root,
        ["semantic_search", index] => SearchPath::IndexDir(index),
        ["semantic_search", index, "corpus"] => SearchPath::CorpusDir(index),
        ["semantic_search", index, "query"] => SearchPath::QueryFile(index),
        ["semantic_search", index, "corpus", doc] => SearchPath::CorpusFile { index, doc },
        _ => SearchPath::Unknown,
    }
}

pub struct SearchHandler {
    backend: Arc<dyn SearchBackend>,
    /// Last query result per index. Lazily populated, last write wins,
    /// never evicted.
    last_results: Mutex<HashMap<String, String>>,
}

impl SearchHandler {
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self {
            backend,
            last_results: Mutex::new(HashMap::new()),
        }
    }

    fn index_exists(&self, index: &str) -> FsResult<bool> {
        let indexes = self.backend.list_indexes().map_err(|_| FsError::Io)?;
        Ok(indexes.iter().any(|i| i == index))
    }
}

impl Handler for SearchHandler {
    fn getattr(&self, path: &str) -> FsResult<Attr> {
        match parse(path) {
            SearchPath::Root | SearchPath::CorpusDir(_) => Ok(Attr::dir()),

            SearchPath::IndexDir(index) => {
                if self.index_exists(index)? {
                    Ok(Attr::dir())
                } else {
                    Err(FsError::NotFound)
                }
            }

            SearchPath::QueryFile(_) => Ok(Attr::file(0o644)),
            SearchPath::CorpusFile { .. } => Ok(Attr::file(0o644)),

            SearchPath::Unknown => Err(FsError::NotFound),
        }
    }

    fn readdir(&self, path: &str) -> FsResult<Vec<DirEntry>> {
        match parse(path) {
            SearchPath::Root => {
                let indexes = self.backend.list_indexes().map_err(|_| FsError::Io)?;
                let mut entries = vec![DirEntry::dir("."), DirEntry::dir("..")];
                entries.extend(indexes.into_iter().map(DirEntry::dir));
                Ok(entries)
            }

            SearchPath::IndexDir(_) => Ok(vec![
                DirEntry::dir("."),
                DirEntry::dir(".."),
                DirEntry::dir("corpus"),
                DirEntry::file("query"),
            ]),

            SearchPath::CorpusDir(index) => {
                let docs = self
                    .backend
                    .list_documents(index)
                    .map_err(|_| FsError::Io)?;
                let mut entries = vec![DirEntry::dir("."), DirEntry::dir("..")];
                entries.extend(docs.into_iter().map(DirEntry::file));
                Ok(entries)
            }

            SearchPath::Unknown => Err(FsError::NotFound),
            _ => Err(FsError::NotDir),
        }
    }

    fn open(&self, path: &str, _flags: i32) -> FsResult<()> {
        // Corpus files are write-only, but that is enforced at read time so
        // `touch` and redirection both work.
        match parse(path) {
            SearchPath::Unknown => Err(FsError::NotFound),
            _ => Ok(()),
        }
    }

    fn read(&self, path: &str, size: u32, offset: i64) -> FsResult<Vec<u8>> {
        match parse(path) {
            SearchPath::QueryFile(index) => {
                let cache = self.last_results.lock();
                let content = cache
                    .get(index)
                    .map(String::as_str)
                    .unwrap_or(NO_QUERY_YET);
                Ok(read_slice(content.as_bytes(), size, offset))
            }

            // Corpus content lives in the backend's vector store; it cannot
            // be read back through the filesystem.
            SearchPath::CorpusFile { .. } => Err(FsError::Access),

            SearchPath::Unknown => Err(FsError::NotFound),
            _ => Err(FsError::IsDir),
        }
    }

    fn write(&self, path: &str, data: &[u8], _offset: i64) -> FsResult<u32> {
        match parse(path) {
            SearchPath::QueryFile(index) => {
                let query = String::from_utf8_lossy(data);
                // `echo` appends a newline; the backend should not see it.
                let query = query.trim_end();
                tracing::info!(index = %index, "running query");

                let result = self.backend.query(index, query).map_err(|_| FsError::Io)?;
                self.last_results
                    .lock()
                    .insert(index.to_owned(), result);
                Ok(data.len() as u32)
            }

            SearchPath::CorpusFile { index, doc } => {
                let text = String::from_utf8_lossy(data);
                tracing::info!(index = %index, doc = %doc, bytes = data.len(), "indexing document");
                self.backend
                    .add_document(index, doc, &text)
                    .map_err(|_| FsError::Io)?;
                Ok(data.len() as u32)
            }

            SearchPath::Unknown => Err(FsError::NotFound),
            _ => Err(FsError::IsDir),
        }
    }

    fn mkdir(&self, path: &str) -> FsResult<()> {
        let index = match parse(path) {
            SearchPath::IndexDir(index) => index,
            _ => return Err(FsError::Perm),
        };
        self.backend.create_index(index).map_err(|_| FsError::Io)
    }

    fn rmdir(&self, path: &str) -> FsResult<()> {
        let index = match parse(path) {
            SearchPath::IndexDir(index) => index,
            _ => return Err(FsError::NotDir),
        };
        self.backend.delete_index(index).map_err(|_| FsError::Io)
    }

    fn mknod(&self, path: &str) -> FsResult<()> {
        // `touch` on a corpus file creates nothing remotely; indexing
        // happens when content is written.
        match parse(path) {
            SearchPath::CorpusFile { .. } => Ok(()),
            _ => Err(FsError::Perm),
        }
    }

    fn unlink(&self, path: &str) -> FsResult<()> {
        let (index, doc) = match parse(path) {
            SearchPath::CorpusFile { index, doc } => (index, doc),
            _ => return Err(FsError::Perm),
        };
        self.backend
            .remove_document(index, doc)
            .map_err(|_| FsError::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_parse_to_their_shapes() {
        assert_eq!(parse("/semantic_search"), SearchPath::Root);
        assert_eq!(parse("/semantic_search/idx"), SearchPath::IndexDir("idx"));
        assert_eq!(
            parse("/semantic_search/idx/corpus"),
            SearchPath::CorpusDir("idx")
        );
        assert_eq!(
            parse("/semantic_search/idx/query"),
            SearchPath::QueryFile("idx")
        );
        assert_eq!(
            parse("/semantic_search/idx/corpus/a.txt"),
            SearchPath::CorpusFile {
                index: "idx",
                doc: "a.txt"
            }
        );
        assert_eq!(parse("/semantic_search/idx/other"), SearchPath::Unknown);
        assert_eq!(
            parse("/semantic_search/idx/corpus/a/b"),
            SearchPath::Unknown
        );
    }
}
