//! Command-line surface.

use std::path::PathBuf;

use clap::Parser;

/// Mount an LLM service as a virtual filesystem.
#[derive(Parser, Debug)]
#[command(name = "llmfs", version, about)]
pub struct Cli {
    /// Directory to mount the filesystem at.
    #[arg(short, long)]
    pub mountpoint: PathBuf,

    /// Mount-time configuration file (TOML).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Automatically unmount when the process exits.
    #[arg(long)]
    pub auto_unmount: bool,

    /// Allow the root user to access the filesystem.
    #[arg(long)]
    pub allow_root: bool,
}
