//! `/models`: one writable file per upstream model.
//!
//! Writing a file sends its content as a stateless prompt; reading it
//! returns the model's last response. Every successful stateless query is
//! archived as a fresh auto-id conversation so it can be revisited under
//! `/conversations`.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use llmfs_domain::config::{ConfigStore, DEFAULT_MODEL_ALIAS};
use llmfs_providers::ChatBackend;
use llmfs_sessions::SessionStore;

use crate::error::{FsError, FsResult};
use crate::handler::{read_slice, Attr, DirEntry, Handler};
use crate::path::components;

enum ModelsPath<'a> {
    Root,
    Model(&'a str),
    Unknown,
}

fn parse(path: &str) -> ModelsPath<'_> {
    let parts = components(path);
    match parts.as_slice() {
        ["models"] => ModelsPath::Root,
        ["models", name] => ModelsPath::Model(name),
        _ => ModelsPath::Unknown,
    }
}

pub struct ModelsHandler {
    config: Arc<ConfigStore>,
    sessions: Arc<SessionStore>,
    llm: Arc<dyn ChatBackend>,
    /// Last response per resolved model name. Lazily populated, last write
    /// wins, never evicted.
    last_responses: Mutex<HashMap<String, String>>,
}

impl ModelsHandler {
    pub fn new(
        config: Arc<ConfigStore>,
        sessions: Arc<SessionStore>,
        llm: Arc<dyn ChatBackend>,
    ) -> Self {
        Self {
            config,
            sessions,
            llm,
            last_responses: Mutex::new(HashMap::new()),
        }
    }

    fn is_known(&self, name: &str) -> bool {
        name == DEFAULT_MODEL_ALIAS || self.llm.knows_model(name)
    }
}

impl Handler for ModelsHandler {
    fn getattr(&self, path: &str) -> FsResult<Attr> {
        match parse(path) {
            ModelsPath::Root => Ok(Attr::dir()),
            ModelsPath::Model(name) if self.is_known(name) => Ok(Attr::file(0o666)),
            _ => Err(FsError::NotFound),
        }
    }

    fn readdir(&self, path: &str) -> FsResult<Vec<DirEntry>> {
        match parse(path) {
            ModelsPath::Root => {
                let mut entries = vec![
                    DirEntry::dir("."),
                    DirEntry::dir(".."),
                    DirEntry::file(DEFAULT_MODEL_ALIAS),
                ];
                entries.extend(self.llm.models().iter().map(DirEntry::file));
                Ok(entries)
            }
            ModelsPath::Model(_) => Err(FsError::NotDir),
            ModelsPath::Unknown => Err(FsError::NotFound),
        }
    }

    fn open(&self, path: &str, _flags: i32) -> FsResult<()> {
        match parse(path) {
            ModelsPath::Root => Err(FsError::IsDir),
            ModelsPath::Model(name) if self.is_known(name) => Ok(()),
            _ => Err(FsError::NotFound),
        }
    }

    fn read(&self, path: &str, size: u32, offset: i64) -> FsResult<Vec<u8>> {
        let name = match parse(path) {
            ModelsPath::Root => return Err(FsError::IsDir),
            ModelsPath::Model(name) if self.is_known(name) => name,
            _ => return Err(FsError::NotFound),
        };

        let resolved = self.config.resolve_model(name);
        let cache = self.last_responses.lock();
        let content = cache.get(&resolved).map(|s| s.as_bytes()).unwrap_or(&[]);
        Ok(read_slice(content, size, offset))
    }

    /// The whole buffer is the prompt; offsets are accepted as written so
    /// shell redirection works without ceremony.
    fn write(&self, path: &str, data: &[u8], _offset: i64) -> FsResult<u32> {
        let name = match parse(path) {
            ModelsPath::Root => return Err(FsError::IsDir),
            ModelsPath::Model(name) if self.is_known(name) => name,
            _ => return Err(FsError::NotFound),
        };

        let prompt = String::from_utf8_lossy(data).into_owned();
        let resolved = self.config.resolve_model(name);
        let params = self.config.model_params(&resolved);

        tracing::info!(model = %resolved, bytes = data.len(), "stateless query");
        let response = self
            .llm
            .simple_query(&resolved, &prompt, &params)
            .map_err(|e| {
                tracing::error!(model = %resolved, error = %e, "stateless query failed");
                FsError::Io
            })?;

        // Archive the exchange as a conversation. The response is already in
        // hand, so a failure here is logged and swallowed, never surfaced.
        let session = self.sessions.create_with_auto_id();
        session.populate(&prompt, &response);
        self.sessions.set_latest(session.id());
        tracing::info!(session = %session.id(), model = %resolved, "query archived");

        self.last_responses.lock().insert(resolved, response);
        Ok(data.len() as u32)
    }
}
