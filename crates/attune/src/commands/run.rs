//! Run command - interactive focus console.

use std::io::IsTerminal;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use attune_cache::{CacheConfig, TtlCache};
use attune_focus::{
    FocusManager, FocusService, FocusStore, InMemoryFocusStore, LogNotifier, ManagerConfig,
    SqliteFocusStore, TriggerDispatcher,
};
use attune_types::HasFocusConfig;
use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::Context;
use super::console::{Console, ControlFlow};

/// How long shutdown waits for pending finish events to be dispatched.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Arguments for the run command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Keep history in memory only
    #[arg(long)]
    pub in_memory: bool,

    /// History database path (overrides config)
    #[arg(long, value_name = "PATH")]
    pub db: Option<PathBuf>,
}

/// Run the console until `quit`, end of input or Ctrl-C.
pub async fn run(args: RunArgs, ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;
    if ctx.verbose {
        for path in loaded.loaded_from() {
            eprintln!("config: {}", path.display());
        }
    }
    let config = loaded.config;
    let focus = config.focus();
    let storage = config.storage();

    let store: Arc<dyn FocusStore> = if args.in_memory || storage.in_memory {
        info!("Using in-memory history");
        Arc::new(InMemoryFocusStore::new())
    } else {
        let path = args.db.unwrap_or_else(|| storage.effective_path());
        if ctx.verbose {
            eprintln!("history: {}", path.display());
        }
        Arc::new(
            SqliteFocusStore::open(&path)
                .with_context(|| format!("Failed to open history at {}", path.display()))?,
        )
    };

    let shutdown = CancellationToken::new();

    let records = TtlCache::new(CacheConfig::from_provider(&config.cache()));
    let sweeper = records.spawn_sweeper(&shutdown);

    let (tx, rx) = mpsc::channel(focus.trigger_buffer());
    let manager = FocusManager::new(records, tx, ManagerConfig::from_provider(&focus));
    let dispatcher =
        TriggerDispatcher::new(Arc::clone(&store), Arc::new(LogNotifier::new())).spawn(rx, &shutdown);

    let console = Console::new(FocusService::new(manager.clone(), store), ctx.json_output);
    let interactive = std::io::stdin().is_terminal();
    if interactive {
        println!("Attune focus console. Type 'help' for commands.");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if interactive {
            print!("attune> ");
            std::io::stdout().flush()?;
        }

        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => {
                    if console.handle_line(&line).await == ControlFlow::Exit {
                        break;
                    }
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        }
    }

    // Announce every live session before the event channel closes.
    let stopped = manager.stop_all();
    info!(stopped, "Console closed, sessions stopped");

    // The channel closes once the manager and every in-flight announcement
    // have dropped their senders.
    drop(console);
    drop(manager);
    if tokio::time::timeout(DRAIN_TIMEOUT, dispatcher.join()).await.is_err() {
        warn!("Timed out draining finish events");
    }

    shutdown.cancel();
    sweeper.stop().await;
    Ok(())
}
