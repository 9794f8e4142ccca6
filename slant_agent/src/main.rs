//! slant_agent - host sampling agent.
//!
//! Writes one pipe-delimited record per interval to stdout until SIGINT or
//! SIGTERM. Logs go to stderr.

use std::io;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use slant_agent::config::{interval_from_secs, SamplingConfig, DEFAULT_INTERVAL};
use slant_agent::metrics::SysinfoProvider;
use slant_agent::sampler::{self, install_signal_handlers, Shutdown};
use slant_agent::sandbox::restrict_filesystem;

/// Host sampling agent.
#[derive(Parser)]
#[command(name = "slant_agent", about = "Host sampling agent", version)]
struct Args {
    /// Disk devices to watch, comma separated (e.g. sd0,sd1).
    #[arg(short = 'd', long = "discs", value_name = "DISCS", env = "SLANT_AGENT_DISCS")]
    discs: Option<String>,

    /// Process names to look for, comma separated (e.g. httpd,sshd).
    #[arg(short = 'p', long = "procs", value_name = "PROCS", env = "SLANT_AGENT_PROCS")]
    procs: Option<String>,

    /// Validate the configuration and exit without sampling.
    #[arg(short = 'n', long)]
    noop: bool,

    /// Log at debug level.
    #[arg(short, long)]
    verbose: bool,

    /// Seconds between samples.
    #[arg(short, long, default_value_t = DEFAULT_INTERVAL.as_secs(), env = "SLANT_AGENT_INTERVAL")]
    interval: u64,
}

/// Logs to stderr; stdout carries records. `RUST_LOG` overrides the level.
fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let cfg = SamplingConfig::from_lists(args.discs.as_deref(), args.procs.as_deref())?;
    let interval = interval_from_secs(args.interval)?;

    info!("slant_agent {} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Config: interval={}s, discs=[{}], procs=[{}]",
        interval.as_secs(),
        cfg.disks().join(","),
        cfg.procs().join(",")
    );

    if args.noop {
        info!("Configuration ok, not sampling (-n)");
        return Ok(());
    }

    let provider = SysinfoProvider::acquire().context("acquire snapshot provider")?;

    let shutdown = Shutdown::new();
    install_signal_handlers(&shutdown)?;
    restrict_filesystem()?;

    let stdout = io::stdout();
    let mut sink = stdout.lock();
    let records = sampler::run(&cfg, provider, &mut sink, interval, &shutdown).await?;

    info!("Shutdown complete after {records} records");
    Ok(())
}
