//! `/config`: one directory per model holding a single `settings.toml`.
//!
//! Reads re-serialise the *effective* parameters from the live store, so a
//! read always reflects writes made through either this subtree or a
//! session's config directory.

use std::sync::Arc;

use llmfs_domain::config::{ConfigStore, ModelParameters, DEFAULT_MODEL_ALIAS};
use llmfs_providers::ChatBackend;

use crate::error::{FsError, FsResult};
use crate::handler::{read_slice, Attr, DirEntry, Handler};
use crate::path::components;

const SETTINGS_FILE: &str = "settings.toml";

enum ConfigPath<'a> {
    Root,
    ModelDir(&'a str),
    Settings(&'a str),
    Unknown,
}

fn parse(path: &str) -> ConfigPath<'_> {
    let parts = components(path);
    match parts.as_slice() {
        ["config"] => ConfigPath::Root,
        ["config", model] => ConfigPath::ModelDir(model),
        ["config", model, SETTINGS_FILE] => ConfigPath::Settings(model),
        _ => ConfigPath::Unknown,
    }
}

pub struct ConfigHandler {
    config: Arc<ConfigStore>,
    llm: Arc<dyn ChatBackend>,
}

impl ConfigHandler {
    pub fn new(config: Arc<ConfigStore>, llm: Arc<dyn ChatBackend>) -> Self {
        Self { config, llm }
    }

    fn is_known(&self, name: &str) -> bool {
        name == DEFAULT_MODEL_ALIAS || self.llm.knows_model(name)
    }
}

impl Handler for ConfigHandler {
    fn getattr(&self, path: &str) -> FsResult<Attr> {
        match parse(path) {
            ConfigPath::Root => Ok(Attr::dir()),
            ConfigPath::ModelDir(model) if self.is_known(model) => Ok(Attr::dir()),
            ConfigPath::Settings(model) if self.is_known(model) => Ok(Attr::file(0o666)),
            _ => Err(FsError::NotFound),
        }
    }

    fn readdir(&self, path: &str) -> FsResult<Vec<DirEntry>> {
        match parse(path) {
            ConfigPath::Root => {
                let mut entries = vec![
                    DirEntry::dir("."),
                    DirEntry::dir(".."),
                    DirEntry::dir(DEFAULT_MODEL_ALIAS),
                ];
                entries.extend(self.llm.models().iter().map(DirEntry::dir));
                Ok(entries)
            }
            ConfigPath::ModelDir(model) if self.is_known(model) => Ok(vec![
                DirEntry::dir("."),
                DirEntry::dir(".."),
                DirEntry::file(SETTINGS_FILE),
            ]),
            ConfigPath::Settings(_) => Err(FsError::NotDir),
            _ => Err(FsError::NotFound),
        }
    }

    fn open(&self, path: &str, _flags: i32) -> FsResult<()> {
        match parse(path) {
            ConfigPath::Root => Err(FsError::IsDir),
            ConfigPath::ModelDir(model) if self.is_known(model) => Err(FsError::IsDir),
            ConfigPath::Settings(model) if self.is_known(model) => Ok(()),
            _ => Err(FsError::NotFound),
        }
    }

    fn read(&self, path: &str, size: u32, offset: i64) -> FsResult<Vec<u8>> {
        let model = match parse(path) {
            ConfigPath::Root | ConfigPath::ModelDir(_) => return Err(FsError::IsDir),
            ConfigPath::Settings(model) if self.is_known(model) => model,
            _ => return Err(FsError::NotFound),
        };

        let resolved = self.config.resolve_model(model);
        let content = self.config.model_params(&resolved).to_toml_string();
        Ok(read_slice(content.as_bytes(), size, offset))
    }

    fn write(&self, path: &str, data: &[u8], offset: i64) -> FsResult<u32> {
        let model = match parse(path) {
            ConfigPath::Root | ConfigPath::ModelDir(_) => return Err(FsError::IsDir),
            ConfigPath::Settings(model) if self.is_known(model) => model,
            _ => return Err(FsError::NotFound),
        };

        // settings.toml is a whole document; partial writes make no sense.
        if offset != 0 {
            return Err(FsError::Perm);
        }

        let text = String::from_utf8_lossy(data);
        let params = ModelParameters::parse(&text).map_err(|e| {
            tracing::warn!(model = %model, error = %e, "rejected settings write");
            FsError::Invalid
        })?;

        let resolved = self.config.resolve_model(model);
        self.config.update_model_params(&resolved, &params);
        Ok(data.len() as u32)
    }
}
