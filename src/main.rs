//! git-mcp: MCP server exposing git repository operations as tools.
//!
//! Speaks newline-delimited JSON-RPC 2.0 on stdin/stdout. Logs go to stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use git_mcp::config;
use git_mcp::git::{register_tools, GitOperations};
use git_mcp::mcp::protocol::ServerInfo;
use git_mcp::mcp::server::McpServer;
use git_mcp::mcp::transport::StdioTransport;

/// MCP server exposing git repository operations as tools.
///
/// Reads JSON-RPC requests from stdin and writes responses to stdout.
#[derive(Parser, Debug)]
#[command(name = "git-mcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Repository used when a tool call gives no repo_path
    #[arg(short, long, value_name = "PATH")]
    repository: Option<PathBuf>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,

    /// Name recorded on commits and annotated tags
    #[arg(short = 'u', long, value_name = "NAME")]
    user_name: Option<String>,

    /// Email recorded on commits and annotated tags
    #[arg(short = 'e', long, value_name = "EMAIL")]
    user_email: Option<String>,
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN,
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber for logging.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Fires `shutdown` on SIGINT or SIGTERM.
#[cfg(unix)]
async fn watch_signals(shutdown: watch::Sender<bool>) {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut sigint, mut sigterm) = match (
        signal(SignalKind::interrupt()),
        signal(SignalKind::terminate()),
    ) {
        (Ok(sigint), Ok(sigterm)) => (sigint, sigterm),
        (Err(e), _) | (_, Err(e)) => {
            error!(error = %e, "Failed to install signal handlers");
            return;
        }
    };

    tokio::select! {
        _ = sigint.recv() => info!("Received SIGINT, initiating graceful shutdown"),
        _ = sigterm.recv() => info!("Received SIGTERM, initiating graceful shutdown"),
    }
    let _ = shutdown.send(true);
}

/// Fires `shutdown` on Ctrl+C.
#[cfg(windows)]
async fn watch_signals(shutdown: watch::Sender<bool>) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("Received Ctrl+C, initiating graceful shutdown");
            let _ = shutdown.send(true);
        }
        Err(e) => error!(error = %e, "Failed to install Ctrl+C handler"),
    }
}

/// Entry point for the git-mcp server.
fn main() -> ExitCode {
    let args = Args::parse();

    let config_path = args.config.as_deref();
    let cfg = match config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    eprintln!(
        "git-mcp {} serving MCP on stdio (Ctrl+C to stop)",
        env!("CARGO_PKG_VERSION")
    );

    let mut identity = cfg.git.identity();
    if let Some(name) = args.user_name {
        identity.name = name;
    }
    if let Some(email) = args.user_email {
        identity.email = email;
    }

    let repository = args.repository.or(cfg.repository);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        repository = ?repository,
        git = %cfg.git.binary,
        "Starting git-mcp server"
    );

    let mut server = McpServer::new(ServerInfo::default());
    register_tools(
        &mut server,
        GitOperations::new(cfg.git.binary, identity),
        repository,
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to create Tokio runtime");

    let result = runtime.block_on(async {
        let (tx, rx) = watch::channel(false);
        tokio::spawn(watch_signals(tx));
        let mut transport = StdioTransport::stdio();
        server.serve(&mut transport, rx).await
    });

    // A stdin read may still be parked on a blocking thread.
    runtime.shutdown_background();

    match result {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}
