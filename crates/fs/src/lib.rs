//! The virtual filesystem engine.
//!
//! Kernel callbacks arrive through the [`mount`] layer, which resolves
//! inodes to absolute virtual paths and forwards every operation to the
//! [`dispatch::Dispatch`]. The dispatch classifies the path's top-level
//! subtree and hands the call to the owning handler; each handler re-parses
//! within its own subtree and talks to the shared stores and the external
//! adapters.

pub mod cli;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod handlers;
pub mod mount;
pub mod path;

pub use dispatch::Dispatch;
pub use error::{FsError, FsResult};
pub use handler::{read_slice, Attr, DirEntry, FileKind, Handler};
