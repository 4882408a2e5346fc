//! CLI command implementations.

use crate::signals;
use chrono::{DateTime, Local};
use colored::Colorize;
use magicwatch_watcher::{DirectoryPoller, RunSummary, WatchOptions};
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

const RULE: &str = "-------------------------------------------------";

/// Watch a directory until SIGINT or SIGTERM.
pub async fn run(options: WatchOptions, interval_secs: f64) -> RunSummary {
    let started = Local::now();
    let program = format!("{} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    println!("{}", RULE.dimmed());
    println!("   Running {}", program.cyan().bold());
    println!("   Started on {}", started.to_rfc3339());
    println!("   Path:      {}", options.path.display().to_string().cyan());
    println!("   Extension: {}", options.extension.cyan());
    println!("   Interval:  {}s", interval_secs.to_string().cyan());
    println!("   Magic:     {}", options.magic.cyan());
    println!("{}", RULE.dimmed());
    info!("Running {}, started on {}", program, started.to_rfc3339());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    signals::spawn_signal_bridge(shutdown_tx);

    let summary = DirectoryPoller::new(options).run(shutdown_rx).await;
    let uptime = format_uptime(summary.uptime);

    println!("{}", RULE.dimmed());
    println!("   Stopped {}", program.cyan().bold());
    println!(
        "   Watching since {}",
        DateTime::<Local>::from(summary.started).to_rfc3339()
    );
    println!("   Uptime was {}", uptime.green());
    println!(
        "   {} cycles ({} failed), {} files tracked",
        summary.cycles, summary.failed_cycles, summary.tracked_files
    );
    println!("{}", RULE.dimmed());
    info!(
        "Stopped {} after {} cycles, uptime was {}",
        program, summary.cycles, uptime
    );

    summary
}

/// Formats as `H:MM:SS.mmm`.
fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    format!(
        "{}:{:02}:{:02}.{:03}",
        secs / 3600,
        secs % 3600 / 60,
        secs % 60,
        uptime.subsec_millis()
    )
}
