use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser as _;
use fuser::MountOption;
use tracing_subscriber::EnvFilter;

use llmfs_domain::config::{ConfigStore, MountConfig};
use llmfs_providers::{ChatBackend, OpenAiChatClient};
use llmfs_search::{SearchBackend, ZmqSearchClient};
use llmfs_sessions::SessionStore;

use llmfs_fs::cli::Cli;
use llmfs_fs::mount::LlmFuse;
use llmfs_fs::Dispatch;

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help/--version print and exit cleanly; real argument
            // errors exit 1.
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    init_tracing();

    if let Err(e) = run(cli) {
        tracing::error!(error = %format!("{e:#}"), "llmfs failed");
        std::process::exit(1);
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    tracing::info!("llmfs starting");

    let mut config = match &cli.config {
        Some(path) => MountConfig::load(path)
            .with_context(|| format!("loading config file {}", path.display()))?,
        None => {
            tracing::warn!("no --config given; using built-in defaults");
            MountConfig::default()
        }
    };

    let llm = Arc::new(OpenAiChatClient::new(&config).context("initialising LLM client")?);

    // A default model the endpoint does not serve would make every write to
    // `/models/default` fail; substitute the first advertised model.
    if !llm.knows_model(&config.default_model) {
        let fallback = llm.models()[0].clone();
        tracing::warn!(
            configured = %config.default_model,
            using = %fallback,
            "configured default model is not advertised by the endpoint"
        );
        config.default_model = fallback;
    }

    let search: Arc<dyn SearchBackend> = Arc::new(
        ZmqSearchClient::connect(&config.search_endpoint)
            .context("connecting to the search backend")?,
    );

    let config = Arc::new(ConfigStore::new(config));
    let sessions = Arc::new(SessionStore::new(config.clone()));
    let dispatch = Arc::new(Dispatch::new(
        config,
        sessions,
        llm as Arc<dyn ChatBackend>,
        search,
    ));

    let mut options = vec![MountOption::FSName("llmfs".into())];
    if cli.auto_unmount {
        options.push(MountOption::AutoUnmount);
    }
    if cli.allow_root {
        options.push(MountOption::AllowRoot);
    }

    tracing::info!(mountpoint = %cli.mountpoint.display(), "mounting");
    fuser::mount2(LlmFuse::new(dispatch), &cli.mountpoint, &options)
        .context("fuse session ended with an error")?;
    tracing::info!("unmounted");
    Ok(())
}
