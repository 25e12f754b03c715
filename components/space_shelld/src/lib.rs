//! CLI parsing and subcommand dispatch for the space reconciliation
//! daemon: wires `session_store`, `platform_abstraction`,
//! `reconciliation_engine`, and `message_bus` together, the way the
//! teacher's `shell_app` wired `browser_shell`/`ui_chrome` together.

use clap::{Parser, Subcommand, ValueEnum};
use message_bus::MessageBus;
use platform_abstraction::{FakePlatform, PlatformApi};
use reconciliation_engine::{ReconcilerConfig, ReconciliationEngine};
use session_store::SessionStore;
use shared_types::SpaceRequest;
use std::fmt;
use std::io::{BufRead, Write};
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };
        write!(f, "{s}")
    }
}

impl FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(format!("invalid log level: {s}")),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "space_shelld")]
#[command(about = "Reconciles live browser windows against saved sessions", long_about = None)]
struct Cli {
    /// Path to the SQLite session database.
    #[arg(long, value_name = "PATH", default_value = "sessions.db")]
    db_path: String,

    /// The running extension's own identifier, used to filter self-pages.
    #[arg(long, value_name = "ID", default_value = "")]
    extension_id: String,

    /// Per-window event coalescing window, in milliseconds.
    #[arg(long, default_value_t = 1000)]
    debounce_millis: u64,

    /// Maximum history entries kept per session.
    #[arg(long, default_value_t = shared_types::MAX_HISTORY_ENTRIES)]
    history_cap: usize,

    /// Advisory cap on tracked closed-window ids (never evicted; logged
    /// only when exceeded).
    #[arg(long, default_value_t = 10_000)]
    max_closed_window_ids: usize,

    #[arg(long, value_enum, default_value = "info")]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the reconciliation loop, reading newline-delimited JSON
    /// `SpaceRequest`s from stdin and writing `SpaceResponse`s to stdout.
    Serve,
    /// Print every known session as JSON, open sessions first (§6 sort
    /// order).
    List,
    /// Keep only the `keep` most recently accessed sessions.
    Cleanup {
        #[arg(long, default_value_t = 200)]
        keep: usize,
    },
    /// Export a session's JSON backup to stdout.
    Export {
        #[arg(long)]
        id: i64,
    },
}

fn init_logging(level: LogLevel) {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level.to_string()))
        .try_init();
}

fn parse_args(args: Vec<String>) -> anyhow::Result<Cli> {
    Ok(Cli::try_parse_from(args)?)
}

/// Entry point called from `main.rs`.
pub async fn run(args: Vec<String>) -> anyhow::Result<()> {
    let cli = parse_args(args)?;
    init_logging(cli.log_level);

    let config = ReconcilerConfig {
        db_path: cli.db_path.clone(),
        extension_id: cli.extension_id.clone(),
        debounce_millis: cli.debounce_millis,
        history_cap: cli.history_cap,
        max_closed_window_ids: cli.max_closed_window_ids,
        ..ReconcilerConfig::default()
    };

    let store = SessionStore::open(&config.db_path).await?;

    // The real platform push channel (window/tab enumeration and events)
    // is explicitly out of scope (§1); `FakePlatform` stands in as the
    // seam a real platform integration would plug into.
    let platform: Arc<dyn PlatformApi> = Arc::new(FakePlatform::new());
    let engine = ReconciliationEngine::new(store.clone(), platform, config);
    engine.ensure_initialized().await?;

    match cli.command {
        Command::Serve => serve_stdio(engine).await,
        Command::List => list_sessions(&engine).await,
        Command::Cleanup { keep } => cleanup(&store, keep).await,
        Command::Export { id } => export(&store, id).await,
    }
}

async fn serve_stdio(engine: Arc<ReconciliationEngine>) -> anyhow::Result<()> {
    let bus = MessageBus::new(engine, 1024 * 1024);
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let request: SpaceRequest = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed request line");
                continue;
            }
        };
        let response = bus.dispatch(request).await;
        writeln!(stdout, "{}", serde_json::to_string(&response)?)?;
        stdout.flush()?;
    }
    Ok(())
}

async fn list_sessions(engine: &Arc<ReconciliationEngine>) -> anyhow::Result<()> {
    for session in engine.list_all_spaces().await? {
        println!("{}", serde_json::to_string(&session)?);
    }
    Ok(())
}

async fn cleanup(store: &SessionStore, keep: usize) -> anyhow::Result<()> {
    let removed = store.cleanup_old_sessions(keep).await?;
    tracing::info!(removed, keep, "cleanup complete");
    Ok(())
}

async fn export(store: &SessionStore, id: i64) -> anyhow::Result<()> {
    let json = store.export_session(shared_types::SessionId(id)).await?;
    println!("{json}");
    Ok(())
}
