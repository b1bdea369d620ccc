//! `/conversations`: named multi-turn chat sessions.
//!
//! A session is a directory created with `mkdir` and destroyed with
//! `rmdir`. Its files re-materialise their content on every read; writes
//! are whole-document only. The `latest` name is a virtual alias resolved
//! through the store's latest pointer on every access, never a stored
//! session of its own.

use std::sync::Arc;

use llmfs_domain::config::{ConfigStore, ModelParameters};
use llmfs_providers::ChatBackend;
use llmfs_sessions::{Session, SessionStore, LATEST_ALIAS};

use crate::error::{FsError, FsResult};
use crate::handler::{read_slice, Attr, DirEntry, Handler};
use crate::path::components;

const SETTINGS_FILE: &str = "settings.toml";

#[derive(Debug, PartialEq, Eq)]
enum ConvPath<'a> {
    Root,
    /// `/conversations/<id>`, id chosen by the user.
    SessionDir(&'a str),
    /// `/conversations/latest`, the virtual alias directory.
    LatestDir,
    Prompt(&'a str),
    History(&'a str),
    Context(&'a str),
    ConfigDir(&'a str),
    Model(&'a str),
    Settings(&'a str),
    Unknown,
}

fn parse(path: &str) -> ConvPath<'_> {
    let parts = components(path);
    match parts.as_slice() {
        ["conversations"] => ConvPath::Root,
        ["conversations", LATEST_ALIAS] => ConvPath::LatestDir,
        ["conversations", id] => ConvPath::SessionDir(id),
        ["conversations", id, "prompt"] => ConvPath::Prompt(id),
        ["conversations", id, "history"] => ConvPath::History(id),
        ["conversations", id, "context"] => ConvPath::Context(id),
        ["conversations", id, "config"] => ConvPath::ConfigDir(id),
        ["conversations", id, "config", "model"] => ConvPath::Model(id),
        ["conversations", id, "config", SETTINGS_FILE] => ConvPath::Settings(id),
        _ => ConvPath::Unknown,
    }
}

fn session_dir_entries() -> Vec<DirEntry> {
    vec![
        DirEntry::dir("."),
        DirEntry::dir(".."),
        DirEntry::file("prompt"),
        DirEntry::file("history"),
        DirEntry::file("context"),
        DirEntry::dir("config"),
    ]
}

pub struct ConversationsHandler {
    sessions: Arc<SessionStore>,
    config: Arc<ConfigStore>,
    llm: Arc<dyn ChatBackend>,
}

impl ConversationsHandler {
    pub fn new(
        sessions: Arc<SessionStore>,
        config: Arc<ConfigStore>,
        llm: Arc<dyn ChatBackend>,
    ) -> Self {
        Self {
            sessions,
            config,
            llm,
        }
    }

    /// Session behind a path id, with the `latest` alias resolved.
    fn session(&self, id: &str) -> FsResult<Arc<Session>> {
        self.sessions.resolve(id).ok_or(FsError::NotFound)
    }

    /// Fetch the session and mark it as the most recently interacted-with
    /// one. The pointer stores the resolved id, never the alias itself.
    fn touch_session(&self, id: &str) -> FsResult<Arc<Session>> {
        let session = self.session(id)?;
        self.sessions.set_latest(session.id());
        Ok(session)
    }

    fn llm_prompt(&self, session: &Session, prompt: &str) -> FsResult<()> {
        session
            .add_prompt(prompt, &self.config, self.llm.as_ref())
            .map(|_| ())
            .map_err(|_| FsError::Io)
    }
}

impl Handler for ConversationsHandler {
    fn getattr(&self, path: &str) -> FsResult<Attr> {
        match parse(path) {
            ConvPath::Root => Ok(Attr::dir()),

            ConvPath::SessionDir(id) | ConvPath::ConfigDir(id) => {
                self.session(id)?;
                Ok(Attr::dir())
            }
            ConvPath::LatestDir => {
                self.session(LATEST_ALIAS)?;
                Ok(Attr::dir())
            }

            ConvPath::History(id) => {
                self.session(id)?;
                Ok(Attr::file(0o444))
            }
            ConvPath::Prompt(id)
            | ConvPath::Context(id)
            | ConvPath::Model(id)
            | ConvPath::Settings(id) => {
                self.session(id)?;
                Ok(Attr::file(0o644))
            }

            ConvPath::Unknown => Err(FsError::NotFound),
        }
    }

    fn readdir(&self, path: &str) -> FsResult<Vec<DirEntry>> {
        match parse(path) {
            ConvPath::Root => {
                let mut entries = vec![DirEntry::dir("."), DirEntry::dir("..")];
                if self.sessions.latest_id().is_some() {
                    entries.push(DirEntry::dir(LATEST_ALIAS));
                }
                entries.extend(self.sessions.list_ids().into_iter().map(DirEntry::dir));
                Ok(entries)
            }

            ConvPath::SessionDir(id) => {
                self.session(id)?;
                Ok(session_dir_entries())
            }
            ConvPath::LatestDir => {
                self.session(LATEST_ALIAS)?;
                Ok(session_dir_entries())
            }

            ConvPath::ConfigDir(id) => {
                self.session(id)?;
                Ok(vec![
                    DirEntry::dir("."),
                    DirEntry::dir(".."),
                    DirEntry::file("model"),
                    DirEntry::file(SETTINGS_FILE),
                ])
            }

            ConvPath::Unknown => Err(FsError::NotFound),
            _ => Err(FsError::NotDir),
        }
    }

    fn open(&self, path: &str, flags: i32) -> FsResult<()> {
        match parse(path) {
            ConvPath::Root | ConvPath::Unknown => Err(FsError::NotFound),

            ConvPath::SessionDir(id) | ConvPath::ConfigDir(id) => {
                self.session(id).map(|_| ())
            }
            ConvPath::LatestDir => self.session(LATEST_ALIAS).map(|_| ()),

            ConvPath::History(id) => {
                self.session(id)?;
                if flags & libc::O_ACCMODE != libc::O_RDONLY {
                    return Err(FsError::Access);
                }
                Ok(())
            }

            ConvPath::Prompt(id)
            | ConvPath::Context(id)
            | ConvPath::Model(id)
            | ConvPath::Settings(id) => self.session(id).map(|_| ()),
        }
    }

    fn read(&self, path: &str, size: u32, offset: i64) -> FsResult<Vec<u8>> {
        let content = match parse(path) {
            ConvPath::Prompt(id) => self.session(id)?.latest_response(),
            ConvPath::History(id) => self.session(id)?.formatted_history(),
            ConvPath::Context(id) => self.session(id)?.context(),
            ConvPath::Model(id) => self.session(id)?.model(),
            ConvPath::Settings(id) => self.session(id)?.params().to_toml_string(),

            ConvPath::Unknown => return Err(FsError::NotFound),
            _ => return Err(FsError::IsDir),
        };
        Ok(read_slice(content.as_bytes(), size, offset))
    }

    fn write(&self, path: &str, data: &[u8], offset: i64) -> FsResult<u32> {
        // Every writable file here is a whole document; `echo x > f`
        // semantics, no appends.
        if offset != 0 {
            return Err(FsError::Perm);
        }

        let text = String::from_utf8_lossy(data);
        match parse(path) {
            ConvPath::Prompt(id) => {
                let session = self.touch_session(id)?;
                self.llm_prompt(&session, &text)?;
            }
            ConvPath::Context(id) => {
                self.touch_session(id)?.set_context(text.into_owned());
            }
            ConvPath::Model(id) => {
                self.touch_session(id)?.set_model(text.trim());
            }
            ConvPath::Settings(id) => {
                let session = self.touch_session(id)?;
                let params = ModelParameters::parse(&text).map_err(|e| {
                    tracing::warn!(session = %session.id(), error = %e, "rejected settings write");
                    FsError::Invalid
                })?;
                session.merge_params(&params);
            }

            ConvPath::History(id) => {
                self.session(id)?;
                return Err(FsError::Access);
            }

            ConvPath::Unknown => return Err(FsError::NotFound),
            _ => return Err(FsError::IsDir),
        }

        Ok(data.len() as u32)
    }

    fn mkdir(&self, path: &str) -> FsResult<()> {
        let id = match parse(path) {
            ConvPath::SessionDir(id) => id,
            // `latest` is reserved, and nothing below a session is creatable.
            _ => return Err(FsError::Perm),
        };

        match self.sessions.create(id) {
            Some(_) => Ok(()),
            None => Err(FsError::Exists),
        }
    }

    fn rmdir(&self, path: &str) -> FsResult<()> {
        let id = match parse(path) {
            ConvPath::SessionDir(id) => id,
            _ => return Err(FsError::NotDir),
        };

        if self.sessions.remove(id) {
            Ok(())
        } else {
            Err(FsError::NotFound)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_parse_to_their_shapes() {
        assert_eq!(parse("/conversations"), ConvPath::Root);
        assert_eq!(parse("/conversations/latest"), ConvPath::LatestDir);
        assert_eq!(parse("/conversations/abc"), ConvPath::SessionDir("abc"));
        assert_eq!(parse("/conversations/abc/prompt"), ConvPath::Prompt("abc"));
        assert_eq!(parse("/conversations/abc/history"), ConvPath::History("abc"));
        assert_eq!(parse("/conversations/abc/context"), ConvPath::Context("abc"));
        assert_eq!(parse("/conversations/abc/config"), ConvPath::ConfigDir("abc"));
        assert_eq!(
            parse("/conversations/latest/config/model"),
            ConvPath::Model("latest")
        );
        assert_eq!(
            parse("/conversations/abc/config/settings.toml"),
            ConvPath::Settings("abc")
        );
        assert_eq!(parse("/conversations/abc/nope"), ConvPath::Unknown);
        assert_eq!(parse("/conversations/a/b/c/d"), ConvPath::Unknown);
    }
}
