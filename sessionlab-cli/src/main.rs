//! SessionLab CLI: replay bar files through the session engine.
//!
//! Commands:
//! - `run`: evaluate a CSV of bars with a TOML config, in replay or stream mode
//! - `check`: parse and validate a config file without running it

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use sessionlab_core::domain::TradeRecord;
use sessionlab_core::engine::{observation_channel, NullSink, ReplayDriver, StreamDriver};
use sessionlab_core::{Bar, Engine, RunConfig, RunResult};
use std::path::{Path, PathBuf};
use std::thread;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "sessionlab",
    about = "SessionLab CLI: session-gated long-only strategy evaluation"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a bar file with a strategy config.
    Run {
        /// Path to a TOML run config.
        #[arg(long)]
        config: PathBuf,

        /// CSV with header `timestamp,open,high,low,close,volume`
        /// (RFC 3339 timestamps; an empty price field is a void bar).
        #[arg(long)]
        bars: PathBuf,

        /// Feed the bars through the stream driver from a producer thread.
        #[arg(long, default_value_t = false)]
        stream: bool,

        /// Queue capacity between producer and engine in stream mode.
        #[arg(long, default_value_t = 1024)]
        queue_capacity: usize,

        /// Print closed trades as JSON lines instead of the summary.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Parse and validate a config file.
    Check {
        /// Path to a TOML run config.
        #[arg(long)]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            bars,
            stream,
            queue_capacity,
            json,
        } => run_cmd(&config, &bars, stream, queue_capacity, json),
        Commands::Check { config } => check_cmd(&config),
    }
}

/// Logs go to stderr so `--json` output on stdout stays clean.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: &Path) -> Result<RunConfig> {
    RunConfig::load(path).with_context(|| format!("loading config {}", path.display()))
}

fn check_cmd(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    println!("Config OK: {}", config_path.display());
    println!("Fingerprint:    {}", config.fingerprint());
    println!("Timezone:       {}", config.session.timezone);
    println!("Warm-up:        {} observations", config.strategy.warmup_len());
    println!("Tiers:          {}", config.strategy.take_profit.len());
    Ok(())
}

fn run_cmd(
    config_path: &Path,
    bars_path: &Path,
    stream: bool,
    queue_capacity: usize,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let bars = load_bars(bars_path)?;
    if bars.is_empty() {
        bail!("no bars in {}", bars_path.display());
    }
    info!(bars = bars.len(), stream, "loaded bar file");

    let engine = Engine::new(config).context("starting engine")?;
    let result = if stream {
        run_stream(engine, bars, queue_capacity)?
    } else {
        ReplayDriver::new(engine, NullSink).run(&bars)
    };

    if json {
        print_trades_json(&result.trades)?;
    } else {
        print_summary(&result);
    }
    Ok(())
}

/// One producer thread feeds the queue; the engine consumes on this thread.
fn run_stream(engine: Engine, bars: Vec<Bar>, queue_capacity: usize) -> Result<RunResult> {
    let (feed, queue) = observation_channel(queue_capacity);
    let producer = thread::spawn(move || {
        for bar in bars {
            if feed.send(bar).is_err() {
                debug!("stream consumer gone; producer exiting");
                break;
            }
        }
    });

    let result = StreamDriver::new(engine, queue, NullSink).run();
    if producer.join().is_err() {
        bail!("bar producer thread panicked");
    }
    Ok(result)
}

/// One CSV row. Empty price fields deserialize to `None` and become NaN.
#[derive(Debug, Deserialize)]
struct BarRow {
    timestamp: DateTime<Utc>,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<f64>,
}

impl From<BarRow> for Bar {
    fn from(row: BarRow) -> Self {
        let px = |v: Option<f64>| v.unwrap_or(f64::NAN);
        Bar::new(
            row.timestamp,
            px(row.open),
            px(row.high),
            px(row.low),
            px(row.close),
            row.volume.unwrap_or(0.0),
        )
    }
}

fn load_bars(path: &Path) -> Result<Vec<Bar>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening bar file {}", path.display()))?;
    let mut bars = Vec::new();
    for (i, row) in reader.deserialize::<BarRow>().enumerate() {
        // header is line 1
        let row = row.with_context(|| format!("{}: bad row at line {}", path.display(), i + 2))?;
        bars.push(Bar::from(row));
    }
    Ok(bars)
}

fn print_trades_json(trades: &[TradeRecord]) -> Result<()> {
    for trade in trades {
        println!("{}", serde_json::to_string(trade)?);
    }
    Ok(())
}

fn print_summary(result: &RunResult) {
    let stats = &result.stats;
    println!();
    println!("=== Run Result ===");
    println!("Config:         {}", result.config_hash.short());
    println!("Observations:   {}", result.observations);
    println!("Trades:         {}", stats.num_trades);
    println!("Wins / Losses:  {} / {}", stats.wins, stats.losses);
    println!();
    println!("--- Performance ---");
    println!("Initial Equity: {:.2}", stats.initial_equity);
    println!("Final Equity:   {:.2}", stats.final_equity);
    println!("Realized P&L:   {:.2}", stats.total_pnl);
    println!("Total Return:   {:.2}%", stats.total_return * 100.0);
    println!("Max Drawdown:   {:.2}%", stats.max_drawdown * 100.0);
    println!("Win Rate:       {:.1}%", stats.win_rate * 100.0);

    if !result.trades.is_empty() {
        println!();
        println!(
            "{:<5} {:<25} {:>10} {:<25} {:>10} {:<14} {:>12}",
            "Id", "Entry", "Price", "Exit", "Price", "Reason", "P&L"
        );
        println!("{}", "-".repeat(107));
        for t in &result.trades {
            println!(
                "{:<5} {:<25} {:>10.2} {:<25} {:>10.2} {:<14} {:>12.2}",
                t.id.to_string(),
                t.entry_time.to_rfc3339(),
                t.entry_price,
                t.exit_time.to_rfc3339(),
                t.exit_price,
                t.exit_reason.as_str(),
                t.realized_pnl
            );
        }
    }

    if let Some(pos) = &result.open_position {
        println!();
        println!(
            "OPEN: {} @ {:.2} since {} (stop {:.2})",
            pos.remaining,
            pos.entry_price,
            pos.entry_time.to_rfc3339(),
            pos.effective_stop()
        );
    }
    for warning in &result.warnings {
        println!("WARNING: {} {}", warning.timestamp.to_rfc3339(), warning.message);
    }
    println!();
}
