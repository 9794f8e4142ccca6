//! Entry point for the slant viewer. Reads host views as JSON and prints one
//! gauge row per host.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use crossterm::{
    cursor::MoveTo,
    execute,
    terminal::{Clear, ClearType},
};

use slant::render::draw;
use slant::types::HostView;

/// Fixed-width CPU gauges for a set of monitored hosts.
#[derive(Parser)]
#[command(name = "slant", version)]
struct Args {
    /// JSON array of host views; `-` or nothing reads stdin.
    file: Option<PathBuf>,

    /// Re-read FILE and redraw every SECS seconds until interrupted.
    #[arg(short, long, value_name = "SECS")]
    watch: Option<u64>,
}

fn load_views(path: Option<&Path>) -> anyhow::Result<Vec<HostView>> {
    let data = match path {
        Some(p) if p != Path::new("-") => {
            fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?
        }
        _ => {
            let mut s = String::new();
            io::stdin().read_to_string(&mut s).context("read stdin")?;
            s
        }
    };
    serde_json::from_str(&data).context("parse host views")
}

fn watch(path: &Path, every: Duration) -> anyhow::Result<()> {
    let mut stdout = io::stdout();
    loop {
        let views = load_views(Some(path))?;
        execute!(stdout, Clear(ClearType::All), MoveTo(0, 0)).context("clear terminal")?;
        draw(&mut stdout, &views).context("write report")?;
        thread::sleep(every);
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if let Some(secs) = args.watch {
        let Some(path) = args.file.as_deref().filter(|p| *p != Path::new("-")) else {
            bail!("--watch needs a FILE to re-read");
        };
        if secs == 0 {
            bail!("--watch interval must be at least one second");
        }
        return watch(path, Duration::from_secs(secs));
    }

    let views = load_views(args.file.as_deref())?;
    draw(&mut io::stdout().lock(), &views).context("write report")
}
