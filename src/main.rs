//! nabud CLI - NABU Network Adapter emulator.

use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use tracing::{info, warn};

use nabud::cli::Cli;
use nabud::config::{init_logging, Config, LoggingConfig};
use nabud::error::{Error, Result};
use nabud::http::HttpFetcher;
use nabud::protocol::Engine;
use nabud::serial::SerialLink;
use nabud::store::CycleStore;
use nabud::VERSION;

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {e}", "✗".red());
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Load config if specified
    let config = if let Some(ref path) = cli.config {
        Config::load(path)?
    } else {
        Config::default()
    };

    let log_config = LoggingConfig {
        level: cli.log_level.clone(),
        color: !cli.no_color,
    };
    init_logging(&log_config)?;

    // CLI arguments override config file values
    let device = cli
        .device
        .or(config.serial.device)
        .ok_or_else(|| Error::Config("no serial device given (try: nabud /dev/ttyUSB0)".into()))?;
    let cycle_dir = cli.cycle_dir.unwrap_or(config.store.cycle_dir);
    let origin = cli.origin.unwrap_or(config.http.origin);
    let fetch_enabled = config.http.enabled && !cli.offline;

    fs::create_dir_all(&cycle_dir)?;

    println!(
        "{}",
        "╔══════════════════════════════════════════╗".bright_cyan()
    );
    println!(
        "{}",
        "║     NABUD NETWORK ADAPTER                ║".bright_cyan()
    );
    println!(
        "{}",
        format!("║     Version {VERSION}                        ║").bright_cyan()
    );
    println!(
        "{}",
        "╚══════════════════════════════════════════╝".bright_cyan()
    );
    println!();
    println!("  {} {}", "Serial:".bright_white(), device);
    println!("  {} {}", "Cycles:".bright_white(), cycle_dir.display());
    if fetch_enabled {
        println!("  {} {}", "Origin:".bright_white(), origin);
    } else {
        println!("  {} {}", "Origin:".bright_white(), "disabled".dimmed());
    }
    println!();

    // Shutdown flag, shared with the HTTP fetcher as its cancellation token
    let shutdown = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || handler_flag.store(true, Ordering::Relaxed))
        .map_err(|e| Error::Internal(format!("Failed to install signal handler: {e}")))?;

    let mut link = SerialLink::open(&device)?;

    let mut store = CycleStore::new(&cycle_dir);
    if fetch_enabled {
        store = store.with_fetcher(HttpFetcher::new(origin, Arc::clone(&shutdown))?);
    }
    let mut engine = Engine::new(store);

    println!("{} Adapter running. Press Ctrl+C to stop.", "●".green());
    info!(device = %device, "adapter ready");

    while !shutdown.load(Ordering::Relaxed) {
        match link.read_byte() {
            Ok(Some(byte)) => {
                let outbound = engine.feed(byte);
                if !outbound.is_empty() {
                    link.send(&outbound)?;
                }
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "serial read failed"),
        }
    }

    println!();
    println!("{} Adapter stopped.", "●".yellow());

    Ok(())
}
