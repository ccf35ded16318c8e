//! Canvas Tasks - Canvas LMS assignments as markdown checklists
//!
//! A CLI tool that walks the Canvas REST API (courses, modules,
//! assignments, or upcoming/missing items) and inserts the result into a
//! note as a task list.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (missing config, request failure, note not writable, etc.)

mod aggregator;
mod canvas;
mod cli;
mod config;
mod error;
mod host;
mod models;
mod report;

use anyhow::{Context, Result};
use canvas::{HttpTransport, Transport};
use cli::Args;
use config::Config;
use error::CanvasError;
use host::{FileHost, Host, Target};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, Registry};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config(&args);
    }

    // Initialize logging before the config is read so its warnings show up
    let log_level = init_logging(&args);

    info!("Canvas Tasks v{}", env!("CARGO_PKG_VERSION"));

    let mut host = FileHost::new(args.config.clone());

    let mut config = match host.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    if config.general.verbose && !args.quiet {
        if let Err(e) = log_level.modify(|filter| *filter = LevelFilter::DEBUG) {
            warn!("Could not enable verbose logging: {}", e);
        }
    }
    debug!("Output settings: {:?}", config.output);

    if args.save_config {
        host.save_config(&config)?;
        eprintln!("✅ Settings saved to {}", host.config_path().display());
        return Ok(());
    }

    host = host.with_target(Target::from_output(&config.output));

    let transport = HttpTransport::new(config.canvas.timeout_seconds)?;
    let spinner = fetch_spinner(spinner_visible(
        args.quiet,
        host.target(),
        std::io::stdout().is_terminal(),
    ));

    match run(&config, &transport, &mut host, &spinner).await {
        Ok(()) => Ok(()),
        Err(e) => {
            spinner.finish_and_clear();
            error!("Failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            if let Some(canvas_err) = e.downcast_ref::<CanvasError>() {
                if let Some(url) = canvas_err.url() {
                    debug!("Failing request: {}", url);
                }
                if matches!(canvas_err.status(), Some(401) | Some(403)) {
                    eprintln!("   Check that your access token is valid and has not expired.");
                }
            }
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .canvas-tasks.toml.
fn handle_init_config(args: &Args) -> Result<()> {
    let host = FileHost::new(args.config.clone());
    let path = host.config_path();

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            path.display()
        );
        std::process::exit(1);
    }

    std::fs::write(path, Config::default_toml())
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("✅ Created {} with default settings.", path.display());
    println!("   Fill in base_url and token under [canvas].");
    Ok(())
}

/// Initialize logging based on the command-line verbosity.
///
/// Logs go to stderr; stdout is reserved for the checklist. The returned
/// handle raises the level once `general.verbose` is known from the config.
fn init_logging(args: &Args) -> reload::Handle<LevelFilter, Registry> {
    let (filter, handle) = reload::Layer::new(LevelFilter::from_level(args.log_level()));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact();

    let subscriber = tracing_subscriber::registry().with(filter).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    handle
}

/// Fetch and render, then hand the text to the host.
///
/// The host is only touched when the whole fetch succeeded.
async fn run<T, H>(config: &Config, transport: &T, host: &mut H, spinner: &ProgressBar) -> Result<()>
where
    T: Transport + ?Sized,
    H: Host,
{
    let start_time = Instant::now();
    spinner.set_message(format!("Fetching from {}", config.canvas.base_url));

    let output = report::generate(
        transport,
        &config.canvas.base_url,
        &config.canvas.token,
        config.output.source,
        config.general.concurrency,
    )
    .await?;
    spinner.finish_and_clear();

    if output.is_empty() {
        info!("Nothing to insert: no accessible courses or events found");
        return Ok(());
    }

    host.insert_text(&output)?;

    info!(
        "Done: {} lines in {:.1}s",
        output.lines().count(),
        start_time.elapsed().as_secs_f64()
    );
    Ok(())
}

/// Whether the fetch spinner should be drawn.
///
/// Hidden with `--quiet`, and when the checklist goes to a stdout that is
/// not a terminal.
fn spinner_visible(quiet: bool, target: &Target, stdout_is_terminal: bool) -> bool {
    if quiet {
        return false;
    }
    stdout_is_terminal || !matches!(target, Target::Stdout)
}

/// Spinner on stderr while requests are in flight.
fn fetch_spinner(visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
