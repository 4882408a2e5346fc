//! Magicwatch CLI - Command-line interface for Magicwatch
//!
//! Watches one directory for files with a given extension and logs every
//! new line containing the magic text. Runs until SIGINT or SIGTERM.

use clap::Parser;
use magicwatch_watcher::WatchOptions;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod signals;

#[derive(Parser, Debug)]
#[command(name = "magicwatch")]
#[command(author = "Magicwatch Contributors")]
#[command(version)]
#[command(about = "Watch a directory for files containing magic text", long_about = None)]
struct Cli {
    /// Directory path to watch
    path: PathBuf,

    /// Text to watch for
    #[arg(value_parser = parse_magic)]
    magic: String,

    /// File extension to watch
    #[arg(short, long, default_value = ".txt")]
    ext: String,

    /// Number of seconds between polls (fractions are dropped)
    #[arg(short, long, default_value = "1.0", value_parser = parse_interval)]
    interval: f64,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn watch_options(&self) -> WatchOptions {
        WatchOptions {
            extension: self.ext.clone(),
            interval: WatchOptions::interval_from_secs(self.interval),
            ..WatchOptions::new(&self.path, &self.magic)
        }
    }
}

fn parse_magic(s: &str) -> Result<String, String> {
    if s.is_empty() {
        return Err("magic text must not be empty".to_string());
    }
    Ok(s.to_string())
}

fn parse_interval(s: &str) -> Result<f64, String> {
    let secs: f64 = s.parse().map_err(|_| format!("'{}' is not a number", s))?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(format!("interval must be a non-negative number, got {}", s));
    }
    Ok(secs)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Set up logging; RUST_LOG wins over --verbose
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(filter)
        .init();

    commands::run(cli.watch_options(), cli.interval).await;
}
