//! eraser-mcp: MCP gateway for Eraser diagram rendering
//!
//! Speaks MCP over stdio and forwards tool calls to the Eraser rendering
//! API, keeping a local copy of each rendered image.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use eraser_mcp::catalog::Catalog;
use eraser_mcp::config;
use eraser_mcp::mcp::forwarder::HttpUpstream;
use eraser_mcp::mcp::server::McpServer;

/// MCP gateway for Eraser diagram rendering.
///
/// Exposes the Eraser diagram tools to AI assistants over stdio. Set
/// `ERASER_API_TOKEN` to unlock file and diagram management tools.
#[derive(Parser, Debug)]
#[command(name = "eraser-mcp")]
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

impl Args {
    /// Log level from the flags, falling back to the configured level.
    ///
    /// `-q` wins over `-v`. Unparseable config levels mean `warn`.
    fn log_level(&self, config_level: &str) -> Level {
        if self.quiet {
            return Level::ERROR;
        }

        match self.verbose {
            0 => config_level.trim().parse().unwrap_or(Level::WARN),
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}

/// Installs the stderr subscriber; `RUST_LOG` directives refine `level`.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Entry point for the eraser-mcp gateway.
fn main() -> ExitCode {
    let args = Args::parse();

    // Load configuration
    let config_path = args.config.as_deref();
    let cfg = match config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            if config_path.is_none() {
                if let Some(default_path) = config::default_config_path() {
                    eprintln!("\nConfig is read from: {}", default_path.display());
                }
            }
            return ExitCode::FAILURE;
        }
    };

    init_tracing(args.log_level(&cfg.logging.level));

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting eraser-mcp gateway"
    );
    info!(
        output_dir = %cfg.output_dir.display(),
        credentialed = cfg.token().is_some(),
        "Configuration loaded"
    );

    let catalog = match Catalog::load() {
        Ok(catalog) => catalog,
        Err(e) => {
            error!(error = %e, "Tool catalog failed to load");
            return ExitCode::FAILURE;
        }
    };

    let upstream = match HttpUpstream::new(cfg.api_url.clone()) {
        Ok(upstream) => upstream,
        Err(e) => {
            error!(error = %e, "Cannot create HTTP client");
            return ExitCode::FAILURE;
        }
    };

    info!(endpoint = upstream.endpoint(), "Forwarding tool calls");

    let server = McpServer::new(cfg, catalog, upstream);

    info!("MCP gateway ready, waiting for client messages...");

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

    match runtime.block_on(server.run()) {
        Ok(()) => {
            info!("Gateway shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Gateway error");
            ExitCode::FAILURE
        }
    }
}
