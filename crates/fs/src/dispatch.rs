//! Routes each kernel callback to the handler owning its subtree.
//!
//! Built once before the filesystem is mounted and never mutated afterwards;
//! handlers hold `Arc` references to the shared stores and adapters, never
//! ownership of each other.

use std::sync::Arc;

use llmfs_domain::config::ConfigStore;
use llmfs_providers::ChatBackend;
use llmfs_search::SearchBackend;
use llmfs_sessions::SessionStore;

use crate::error::{FsError, FsResult};
use crate::handler::{Attr, DirEntry, Handler};
use crate::handlers::{
    ConfigHandler, ConversationsHandler, ModelsHandler, RootHandler, SearchHandler,
};
use crate::path::{classify, Subtree};

pub struct Dispatch {
    root: RootHandler,
    models: ModelsHandler,
    config: ConfigHandler,
    conversations: ConversationsHandler,
    search: SearchHandler,
}

impl Dispatch {
    pub fn new(
        config: Arc<ConfigStore>,
        sessions: Arc<SessionStore>,
        llm: Arc<dyn ChatBackend>,
        search: Arc<dyn SearchBackend>,
    ) -> Self {
        Self {
            root: RootHandler,
            models: ModelsHandler::new(config.clone(), sessions.clone(), llm.clone()),
            config: ConfigHandler::new(config.clone(), llm.clone()),
            conversations: ConversationsHandler::new(sessions, config, llm),
            search: SearchHandler::new(search),
        }
    }

    /// The handler owning `path`'s subtree.
    pub fn route(&self, path: &str) -> FsResult<&dyn Handler> {
        match classify(path) {
            Subtree::Root => Ok(&self.root),
            Subtree::Models => Ok(&self.models),
            Subtree::Config => Ok(&self.config),
            Subtree::Conversations => Ok(&self.conversations),
            Subtree::Search => Ok(&self.search),
            Subtree::Other => Err(FsError::NotFound),
        }
    }

    // ── forwarding, used by the mount layer and the tests ────────────

    pub fn getattr(&self, path: &str) -> FsResult<Attr> {
        self.route(path)?.getattr(path)
    }

    pub fn readdir(&self, path: &str) -> FsResult<Vec<DirEntry>> {
        self.route(path)?.readdir(path)
    }

    pub fn open(&self, path: &str, flags: i32) -> FsResult<()> {
        self.route(path)?.open(path, flags)
    }

    pub fn read(&self, path: &str, size: u32, offset: i64) -> FsResult<Vec<u8>> {
        self.route(path)?.read(path, size, offset)
    }

    pub fn write(&self, path: &str, data: &[u8], offset: i64) -> FsResult<u32> {
        self.route(path)?.write(path, data, offset)
    }

    pub fn mkdir(&self, path: &str) -> FsResult<()> {
        self.route(path)?.mkdir(path)
    }

    pub fn rmdir(&self, path: &str) -> FsResult<()> {
        self.route(path)?.rmdir(path)
    }

    pub fn unlink(&self, path: &str) -> FsResult<()> {
        self.route(path)?.unlink(path)
    }

    pub fn mknod(&self, path: &str) -> FsResult<()> {
        self.route(path)?.mknod(path)
    }
}
