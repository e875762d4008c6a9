//! apple-mail-mcp: MCP server for AI-assisted Apple Mail automation
//!
//! Checks that Mail.app is reachable, then serves MCP over stdio until the
//! client disconnects or the process is signalled.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, Level};
use tracing_subscriber::EnvFilter;

use apple_mail_mcp::config::{self, Config};
use apple_mail_mcp::jxa::{startup_check, DiscardSink, Executor, ScriptLogSink, TracingSink};
use apple_mail_mcp::mcp::server::McpServer;
use apple_mail_mcp::tools::MailTools;

/// MCP server for AI-assisted Apple Mail automation.
///
/// Lets AI assistants list accounts and mailboxes, read messages and draft
/// replies in Mail.app. Nothing is ever sent.
#[derive(Parser, Debug)]
#[command(name = "apple-mail-mcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
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

/// Script logs are only worth collecting when debug output is shown.
fn script_log_sink(level: Level) -> Arc<dyn ScriptLogSink> {
    if level >= Level::DEBUG {
        Arc::new(TracingSink)
    } else {
        Arc::new(DiscardSink)
    }
}

fn build_executor(cfg: &Config, level: Level) -> Executor {
    Executor::with_interpreter(cfg.jxa.interpreter.clone()).with_sink(script_log_sink(level))
}

/// Verifies Mail.app, then serves until shutdown.
async fn serve(executor: Executor, cfg: &Config) -> ExitCode {
    let cancel = CancellationToken::new();

    match startup_check(&executor, &cancel).await {
        Ok(properties) => {
            debug!(properties = ?properties, "Mail.app startup check passed");
        }
        Err(e) => {
            error!(error = %e, "Startup check failed");
            eprintln!("Error: {e}");
            eprintln!();
            eprintln!("{}", e.guidance());
            return ExitCode::FAILURE;
        }
    }

    let tools = MailTools::new(executor, cfg.jxa.timeout());
    let mut server = McpServer::new(tools);

    info!("MCP server ready, waiting for client connection...");

    match server.run().await {
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

/// Entry point for the apple-mail-mcp server.
fn main() -> ExitCode {
    let args = Args::parse();

    // Load configuration
    let config_path = args.config.as_deref();
    let cfg = match config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialise logging
    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        interpreter = %cfg.jxa.interpreter.display(),
        timeout_secs = cfg.jxa.timeout_secs,
        "Starting apple-mail-mcp server"
    );

    let executor = build_executor(&cfg, log_level);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    let code = runtime.block_on(serve(executor, &cfg));
    // A pending blocking read of stdin would otherwise hold up the exit.
    runtime.shutdown_background();
    code
}
