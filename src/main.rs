//! # Rabbit Docs CLI (`rdocs`)
//!
//! Lists, inspects, removes, and uploads the documents held by a Rabbit Hole
//! chunk store.
//!
//! ## Usage
//!
//! ```bash
//! rdocs --config ./config/rdocs.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rdocs list [--filter Q]` | Aggregated documents, newest first |
//! | `rdocs info <source>` | Chunk details for one document |
//! | `rdocs remove <source>` | Delete one document after confirmation |
//! | `rdocs clear` | Delete every document after confirmation |
//! | `rdocs stats [--server]` | Library statistics |
//! | `rdocs upload <files…>` | Batch upload, then list again |
//!
//! Results go to stdout. Notifications and logs go to stderr.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use rabbit_docs::api::HttpGateway;
use rabbit_docs::config;
use rabbit_docs::manager::{DocumentManager, RefreshOutcome};
use rabbit_docs::render::{self, Palette};
use rabbit_docs::theme::{EnvContext, TerminalPreference, ThemeSync};
use rabbit_docs_core::action::Settlement;
use rabbit_docs_core::models::PendingAction;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Rabbit Docs: manage the documents in a Rabbit Hole chunk store.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. When the file does not exist, built-in defaults are used.
#[derive(Parser)]
#[command(
    name = "rdocs",
    about = "Rabbit Docs: list, inspect, and remove documents in a Rabbit Hole chunk store",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/rdocs.toml")]
    config: PathBuf,

    /// Log requests and state changes to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List documents aggregated by source, most recently updated first.
    List {
        /// Case-insensitive substring to match against the source.
        #[arg(long)]
        filter: Option<String>,
    },

    /// Show the info panel for one document.
    Info {
        /// Document source, exactly as listed.
        source: String,
    },

    /// Remove one document and all of its chunks.
    Remove {
        source: String,
        /// Skip the confirmation prompt.
        #[arg(long, short)]
        yes: bool,
    },

    /// Remove every document.
    Clear {
        /// Skip the confirmation prompt.
        #[arg(long, short)]
        yes: bool,
    },

    /// Show library statistics.
    Stats {
        /// Ask the server instead of computing from the fetched list.
        #[arg(long)]
        server: bool,
    },

    /// Upload files to the batch ingestion endpoint, then list again.
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long)]
        chunk_size: Option<u32>,
        #[arg(long)]
        chunk_overlap: Option<u32>,
        /// JSON object attached to every uploaded file.
        #[arg(long)]
        metadata: Option<String>,
    },
}

/// A failure the user has already seen as a notification. `main` exits
/// non-zero without printing it again.
#[derive(Debug, Error)]
#[error("already reported")]
struct Reported;

fn init_tracing(verbose: bool) {
    // Without -v, notifications are the only failure output.
    let default = if verbose { "debug" } else { "error" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Ask on stderr, read the answer from stdin. Anything but y/yes declines.
fn confirm_prompt(action: &PendingAction) -> anyhow::Result<bool> {
    let mut stderr = std::io::stderr();
    write!(stderr, "{} [y/N] ", action.prompt())?;
    stderr.flush()?;

    let mut answer = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("Failed to read confirmation")?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn flush_notifications<R: rabbit_docs::RemoteStore>(mgr: &DocumentManager<R>, palette: Palette) {
    let now = std::time::Instant::now();
    for n in mgr.visible_notifications(now) {
        eprintln!("{}", render::notification(n, palette));
    }
}

async fn load<R: rabbit_docs::RemoteStore>(mgr: &mut DocumentManager<R>) -> anyhow::Result<()> {
    match mgr.refresh().await.map_err(|_| Reported)? {
        RefreshOutcome::Failed { message } => bail!("{}", message),
        RefreshOutcome::Applied { .. } => Ok(()),
    }
}

async fn run_action<R: rabbit_docs::RemoteStore>(
    mgr: &mut DocumentManager<R>,
    yes: bool,
) -> anyhow::Result<()> {
    let action = mgr
        .pending()
        .cloned()
        .context("No action awaiting confirmation")?;
    if !yes && !confirm_prompt(&action)? {
        mgr.cancel()?;
        eprintln!("Cancelled.");
        return Ok(());
    }
    match mgr.confirm().await? {
        Settlement::Retain => Ok(()),
        Settlement::Resync => Err(Reported.into()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = config::load_or_default(&cli.config)?;
    let theme = ThemeSync::init(&EnvContext::new(cfg.ui.theme.clone()), &TerminalPreference);
    let color = atty::is(atty::Stream::Stdout) && std::env::var_os("NO_COLOR").is_none();
    let palette = Palette::new(theme.theme(), color);
    let now_ts = chrono::Utc::now().timestamp();

    let gateway = HttpGateway::new(&cfg)?;
    let mut mgr = DocumentManager::new(gateway, &cfg);

    let result = match cli.command {
        Commands::List { filter } => {
            let loaded = load(&mut mgr).await;
            if let Some(q) = filter {
                mgr.set_query(q);
            }
            if loaded.is_ok() {
                let docs = mgr.documents();
                let table =
                    render::document_table(&docs, mgr.query(), mgr.load_error(), palette, now_ts);
                print!("{}", table);
            }
            loaded
        }
        Commands::Info { source } => {
            let loaded = load(&mut mgr).await;
            match loaded {
                Ok(()) => match mgr.open_info(&source) {
                    Some(view) => {
                        print!("{}", render::panel(view, palette));
                        Ok(())
                    }
                    None => Err(anyhow::anyhow!("No document with source '{}'", source)),
                },
                Err(e) => Err(e),
            }
        }
        Commands::Remove { source, yes } => {
            let loaded = load(&mut mgr).await;
            match loaded {
                Ok(()) if !mgr.store().contains_source(&source) => {
                    Err(anyhow::anyhow!("No document with source '{}'", source))
                }
                Ok(()) => {
                    mgr.request_delete(&source)?;
                    run_action(&mut mgr, yes).await
                }
                Err(e) => Err(e),
            }
        }
        Commands::Clear { yes } => {
            let loaded = load(&mut mgr).await;
            match loaded {
                Ok(()) => {
                    mgr.request_clear()?;
                    run_action(&mut mgr, yes).await
                }
                Err(e) => Err(e),
            }
        }
        Commands::Stats { server } => {
            if server {
                mgr.server_stats()
                    .await
                    .map(|stats| print!("{}", render::server_stats(&stats)))
                    .map_err(|_| Reported.into())
            } else {
                load(&mut mgr)
                    .await
                    .map(|()| print!("{}", render::library_stats(&mgr.stats())))
            }
        }
        Commands::Upload {
            files,
            chunk_size,
            chunk_overlap,
            metadata,
        } => {
            let metadata = match metadata {
                Some(raw) => serde_json::from_str::<serde_json::Value>(&raw)
                    .context("--metadata must be valid JSON")?,
                None => serde_json::json!({}),
            };
            match mgr.upload(files, chunk_size, chunk_overlap, metadata).await {
                Ok(_) => {
                    let docs = mgr.documents();
                    let table = render::document_table(
                        &docs,
                        mgr.query(),
                        mgr.load_error(),
                        palette,
                        now_ts,
                    );
                    print!("{}", table);
                    Ok(())
                }
                Err(_) => Err(Reported.into()),
            }
        }
    };

    flush_notifications(&mgr, palette);
    match result {
        Err(e) if e.is::<Reported>() => std::process::exit(1),
        other => other,
    }
}
