//! yesscache - command-line host for the offline cache manager.
//!
//! Each subcommand delivers one lifecycle event (install, activate, fetch,
//! message, sync, push, notification click) to an `OfflineCacheManager`
//! rooted at the configured data directory, the way a browser delivers
//! events to a service worker.

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use yesscache_core::{
    Config, FetchOutcome, MessageOutcome, OfflineCacheManager, Request, SyncOutcome, SyncReport,
    SyncTag,
};

/// Log file name prefix inside `--log-dir`
const LOG_FILE_PREFIX: &str = "yesscache.log";

#[derive(Parser)]
#[command(name = "yesscache", version, about = "Offline cache manager for YessPlora")]
struct Cli {
    /// Data directory for caches, sync queues and registration
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Also write logs to a daily-rolling file in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Precache the static manifest for the configured version
    Install,
    /// Activate the installed version and drop stale caches
    Activate,
    /// Run a request through the route policies
    Fetch {
        /// Absolute URL or origin-relative path
        url: String,
        #[arg(long, default_value = "GET")]
        method: String,
    },
    /// Show the cached entry for a URL, if any
    Cached {
        /// Absolute URL or origin-relative path
        url: String,
    },
    /// Post a control message (JSON) as a page would
    Message { json: String },
    /// Queue a payload for background sync
    Enqueue { tag: SyncTag, json: String },
    /// Flush background sync (all registered tags when none given)
    Sync { tag: Option<SyncTag> },
    /// Deliver a push message
    Push { text: Option<String> },
    /// Click a notification, optionally on an action button
    Click { action: Option<String> },
    /// Show versions, partitions and queue sizes
    Status,
    /// Write the effective configuration to the config file
    SaveConfig,
}

/// Initialize the tracing subscriber for logging
fn init_tracing(log_dir: Option<&PathBuf>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let stderr_layer = fmt::layer().with_writer(io::stderr);

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .init();
            None
        }
    }
}

fn load_config(data_dir: Option<PathBuf>) -> Result<Config> {
    let mut config = Config::load().context("Failed to load config")?;
    config.apply_env();
    if data_dir.is_some() {
        config.data_dir = data_dir;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.log_dir.as_ref());

    let config = load_config(cli.data_dir)?;
    let manager = OfflineCacheManager::open(config).await?;
    info!(version = %manager.config().cache_version, "yesscache starting");

    let result = run(&manager, cli.command).await;
    manager.shutdown();
    result
}

async fn run(manager: &OfflineCacheManager, command: Command) -> Result<()> {
    match command {
        Command::Install => {
            manager.install().await?;
            println!("Installed {} (waiting to activate)", manager.config().cache_version);
        }
        Command::Activate => {
            let version = manager.activate().await?;
            println!("Activated {}", version);
        }
        Command::Fetch { url, method } => {
            let url = manager.config().resolve(&url)?;
            let request = Request::parse(&method, url.as_str())?;
            print_outcome(&manager.handle_fetch(&request).await);
        }
        Command::Cached { url } => {
            let url = manager.config().resolve(&url)?;
            match manager.cached(url.as_str()).await? {
                Some(cached) => println!(
                    "{} ({} bytes), cached {}",
                    cached.response.status,
                    cached.response.body.len(),
                    cached.age_display()
                ),
                None => println!("Not cached"),
            }
        }
        Command::Message { json } => match manager.handle_message(json.as_bytes()).await {
            MessageOutcome::Activated(version) => println!("Activated {}", version),
            MessageOutcome::Cached => println!("Offline data cached"),
            MessageOutcome::Ignored => println!("Message ignored"),
        },
        Command::Enqueue { tag, json } => {
            let payload: serde_json::Value =
                serde_json::from_str(&json).context("Payload is not valid JSON")?;
            let item = manager.enqueue(tag, payload).await?;
            println!("Queued {} under {}", item.id, tag);
        }
        Command::Sync { tag } => {
            let reports = match tag {
                Some(tag) => vec![manager.sync(tag).await],
                None => manager.connectivity_restored().await,
            };
            if reports.is_empty() {
                println!("No sync registered");
            }
            reports.iter().for_each(print_report);
        }
        Command::Push { text } => {
            match manager.handle_push(text.as_deref().map(str::as_bytes)).await {
                Some(notification) => println!("{}: {}", notification.title, notification.body),
                None => println!("Push ignored"),
            }
        }
        Command::Click { action } => {
            println!("{:?}", manager.handle_notification_click(action.as_deref()));
        }
        Command::SaveConfig => {
            manager.config().save()?;
            println!("Config written to {}", Config::config_path()?.display());
        }
        Command::Status => {
            let status = manager.status().await?;
            println!("Configured version: {}", status.configured_version);
            println!(
                "Active version:     {}",
                status.active_version.as_deref().unwrap_or("none")
            );
            println!(
                "Waiting version:    {}",
                status.waiting_version.as_deref().unwrap_or("none")
            );
            println!("Partitions:");
            for (name, count) in &status.partitions {
                println!("  {:<32} {} entries", name, count);
            }
            println!("Sync queues:");
            for (tag, count) in &status.queued {
                let registered = if status.registered_syncs.contains(tag) { " (registered)" } else { "" };
                println!("  {:<32} {} pending{}", tag.as_str(), count, registered);
            }
        }
    }
    Ok(())
}

fn print_outcome(outcome: &FetchOutcome) {
    match outcome {
        FetchOutcome::Respond { response, source } => {
            println!(
                "{} from {:?} ({} bytes, {})",
                response.status,
                source,
                response.body.len(),
                response.content_type().unwrap_or("no content-type")
            );
        }
        FetchOutcome::PassThrough => println!("Not intercepted"),
        FetchOutcome::NoResponse => println!("No response available"),
    }
}

fn print_report(report: &SyncReport) {
    match &report.outcome {
        SyncOutcome::Empty => println!("{}: nothing queued", report.tag),
        SyncOutcome::Delivered => println!("{}: delivered {} item(s)", report.tag, report.sent),
        SyncOutcome::Retained { reason } => {
            println!("{}: kept {} item(s) - {}", report.tag, report.sent, reason)
        }
    }
}
