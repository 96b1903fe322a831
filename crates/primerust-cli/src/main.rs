//! PrimeRust CLI - parallel probable-prime search benchmark.
//!
//! Finds a random probable prime with the requested number of decimal digits,
//! compares the run against the fastest recorded run for that digit count and
//! appends it to a JSON history.

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use primerust_core::config::{limits, search};
use primerust_core::history::DEFAULT_HISTORY_FILE;
use primerust_core::{
    compare, format_scientific, format_time, run_session, ComparisonRow, HistoryPolicy,
    HistoryStore, JsonHistoryStore, MemoryHistoryStore, Metric, Oracle, ProgressSink,
    ProgressSnapshot, RunMetrics, RunReport, SearchConfig, SearchCoordinator, SearchError,
    SearchRequest, Variation,
};
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// CLI arguments structure.
#[derive(Parser, Debug)]
#[command(
    name = "primerust",
    version,
    about = "Parallel probable-prime search with historical benchmarking",
    long_about = None
)]
struct Cli {
    /// Number of decimal digits of the prime. Prompted for when omitted.
    #[arg(value_parser = clap::value_parser!(u32).range(1..=limits::MAX_DIGITS as i64))]
    digits: Option<u32>,

    /// Run the search N times in a row (10 when given without a value).
    #[arg(
        short,
        long,
        value_name = "N",
        num_args = 0..=1,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    repeat: Option<Option<u32>>,

    /// Number of worker threads (default: all logical processors).
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    threads: Option<u64>,

    /// JSON file holding the run history.
    #[arg(long, env = "PRIMERUST_HISTORY", default_value = DEFAULT_HISTORY_FILE)]
    history: PathBuf,

    /// Keep history in memory only; nothing is written to disk.
    #[arg(long)]
    no_history: bool,

    /// Move an unreadable history aside and start a new one.
    #[arg(long)]
    overwrite_corrupt_history: bool,

    /// Progress refresh interval in milliseconds.
    #[arg(long, default_value_t = search::POLL_INTERVAL_MS)]
    poll_ms: u64,

    /// Maximum wait for workers to stop once a prime is found, in milliseconds.
    #[arg(long, default_value_t = search::SHUTDOWN_TIMEOUT_MS)]
    shutdown_timeout_ms: u64,

    /// Ring the terminal bell when a prime is found.
    #[arg(long)]
    beep: bool,
}

impl Cli {
    /// Runs requested: one without `--repeat`, the default count for a bare flag.
    fn repeat_count(&self) -> u32 {
        match self.repeat {
            None => 1,
            Some(None) => search::DEFAULT_REPEAT,
            Some(Some(n)) => n,
        }
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing();

    let digits = match cli.digits {
        Some(d) => d,
        None => prompt_digits(io::stdin().lock(), io::stdout())?,
    };
    let request = SearchRequest::new(digits)?;

    primerust_core::prewarm_system();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(run(cli, request))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Reads a digit count, re-prompting until the input is a valid positive integer.
fn prompt_digits<R: BufRead, W: Write>(mut input: R, mut out: W) -> anyhow::Result<u32> {
    let mut line = String::new();
    loop {
        write!(out, "Digit Count: ")?;
        out.flush()?;
        line.clear();
        if input.read_line(&mut line)? == 0 {
            bail!("no digit count provided");
        }
        match line.trim().parse::<i64>() {
            Ok(d) if d < 1 => writeln!(out, "Enter a positive integer.")?,
            Ok(d) if d > i64::from(limits::MAX_DIGITS) => writeln!(
                out,
                "Digit count is too large (max supported: {}).",
                limits::MAX_DIGITS
            )?,
            Ok(d) => return Ok(d as u32),
            Err(_) => writeln!(out, "Invalid input. Please enter an integer.")?,
        }
    }
}

async fn run(cli: Cli, request: SearchRequest) -> anyhow::Result<ExitCode> {
    let interrupt = Arc::new(AtomicBool::new(false));
    {
        let interrupt = interrupt.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                interrupt.store(true, Ordering::Relaxed);
            }
        });
    }

    let mut config = SearchConfig::default()
        .with_poll_interval(Duration::from_millis(cli.poll_ms.max(1)))
        .with_shutdown_timeout(Duration::from_millis(cli.shutdown_timeout_ms))
        .with_interrupt(interrupt);
    if let Some(threads) = cli.threads {
        config = config.with_threads(threads as usize);
    }

    tokio::task::spawn_blocking(move || run_blocking(&cli, request, config))
        .await
        .context("search task failed")?
}

fn run_blocking(cli: &Cli, request: SearchRequest, config: SearchConfig) -> anyhow::Result<ExitCode> {
    let digits = request.digit_count();
    let oracle = Oracle::for_digits(digits)?;
    let coordinator = SearchCoordinator::new(config);
    let mut store: Box<dyn HistoryStore> = if cli.no_history {
        Box::new(MemoryHistoryStore::new())
    } else {
        Box::new(JsonHistoryStore::open(&cli.history))
    };
    let policy = if cli.overwrite_corrupt_history {
        HistoryPolicy::OverwriteCorrupt
    } else {
        HistoryPolicy::KeepCorrupt
    };

    println!("--- Execution Configuration ---");
    println!("PrimeRust v{}", VERSION);
    println!(
        "Environment: {} logical processors, {} workers.",
        std::thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or(1),
        coordinator.config().parallelism()
    );
    println!("Digit Count: {}", digits);
    println!("Algorithm: {}", oracle.algorithm());
    if cli.no_history {
        println!("History: disabled (in-memory)");
    } else {
        println!("History: {}", cli.history.display());
    }

    let repeat = cli.repeat_count();
    for run in 1..=repeat {
        if repeat > 1 {
            println!();
            println!("=== Run {}/{} ===", run, repeat);
        }

        let sink = SpinnerSink::new();
        let outcome = run_session(&request, &coordinator, store.as_mut(), &sink, policy);
        sink.finish();

        let report = match outcome {
            Ok(report) => report,
            Err(SearchError::Interrupted) => {
                println!();
                println!("Interrupted by user.");
                return Ok(ExitCode::SUCCESS);
            }
            Err(e) => return Err(anyhow!(e).context(format!("{}-digit search failed", digits))),
        };

        print_report(&report, io::stdout().is_terminal());
        if cli.beep {
            print!("\x07");
            io::stdout().flush()?;
        }

        if let Some(e) = report.history_error {
            let hint = if e.is_corrupt() && !cli.overwrite_corrupt_history {
                " (use --overwrite-corrupt-history to start a new log)"
            } else {
                ""
            };
            return Err(anyhow!(e).context(format!("result was not recorded{}", hint)));
        }
        if report.persisted && !cli.no_history {
            println!("Result logged to {}", cli.history.display());
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Renders progress snapshots on a single spinner line.
struct SpinnerSink {
    bar: ProgressBar,
}

impl SpinnerSink {
    fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(style);
        bar.set_message("Searching...");
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressSink for SpinnerSink {
    fn on_progress(&self, s: &ProgressSnapshot) {
        let eta = s
            .eta_seconds
            .map(format_time)
            .unwrap_or_else(|| "--:--.-".to_string());
        self.bar.set_message(format!(
            "Attempts: {} | Elapsed: {} | Speed: {:.2} n/s | CPU: {:.1}% | ETA: {}",
            s.attempts,
            format_time(s.elapsed_seconds),
            s.numbers_per_second,
            s.cpu_percent,
            eta
        ));
    }

    fn on_found(&self, metrics: &RunMetrics) {
        self.bar.set_message(format!(
            "Found after {} attempts",
            metrics.attempts
        ));
    }
}

fn print_report(report: &RunReport, color: bool) {
    let rows = match &report.comparison {
        Some(rows) => rows.clone(),
        None => compare(&report.metrics, None),
    };

    println!();
    println!("Results:");
    let header = format!(
        "{:<15} {:<20} {:<20} {:<15}",
        "Label", "Current", "Best", "Variation (%)"
    );
    println!("{}", header);
    println!("{}", "-".repeat(header.len()));
    for row in &rows {
        println!(
            "{:<15} {:<20} {:<20} {}",
            row.metric.label(),
            format_metric(row.metric, row.current),
            row.best
                .map(|b| format_metric(row.metric, b))
                .unwrap_or_else(|| "N/A".to_string()),
            format_variation(row, color)
        );
    }

    let scientific = format_scientific(
        &report.metrics.prime_value,
        primerust_core::format::SCIENTIFIC_PRECISION,
    );
    if color {
        println!("{:<15} \x1b[1m{}\x1b[0m", "Prime Found", scientific);
    } else {
        println!("{:<15} {}", "Prime Found", scientific);
    }
    println!("{:<15} {}", "Algorithm", report.metrics.algorithm);

    println!();
    if let Some(current) = report.ratio.current_ms {
        println!("Performance Ratio: {:.3} ms/attempt", current);
    }
    if let Some(best) = report.ratio.best_ms {
        println!("Previous best ratio: {:.3} ms/attempt", best);
    }
}

fn format_metric(metric: Metric, value: f64) -> String {
    match metric {
        Metric::Attempts => format!("{}", value as u64),
        Metric::Time => format_time(value),
        Metric::NumbersPerSecond => format!("{:.2}", value),
        Metric::CpuUsage => format!("{:.2}%", value),
    }
}

fn format_variation(row: &ComparisonRow, color: bool) -> String {
    match row.variation {
        Variation::NotAvailable => "N/A".to_string(),
        Variation::Percent(p) => {
            let text = format!("{:.2}", p);
            match (color, p.partial_cmp(&0.0)) {
                (true, Some(std::cmp::Ordering::Greater)) => format!("\x1b[32m{}\x1b[0m", text),
                (true, Some(std::cmp::Ordering::Less)) => format!("\x1b[31m{}\x1b[0m", text),
                _ => text,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn prompt(input: &str) -> (anyhow::Result<u32>, String) {
        let mut out = Vec::new();
        let result = prompt_digits(input.as_bytes(), &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn repeat_without_value_uses_default() {
        let cli = Cli::try_parse_from(["primerust", "5", "-r"]).unwrap();
        assert_eq!(cli.repeat_count(), search::DEFAULT_REPEAT);
        let cli = Cli::try_parse_from(["primerust", "5", "--repeat", "3"]).unwrap();
        assert_eq!(cli.repeat_count(), 3);
        let cli = Cli::try_parse_from(["primerust", "5"]).unwrap();
        assert_eq!(cli.repeat_count(), 1);
        assert!(Cli::try_parse_from(["primerust", "5", "--repeat", "0"]).is_err());
    }

    #[test]
    fn digits_out_of_range_are_rejected() {
        assert!(Cli::try_parse_from(["primerust", "0"]).is_err());
        assert!(Cli::try_parse_from(["primerust", "1000001"]).is_err());
        assert!(Cli::try_parse_from(["primerust", "1000000"]).is_ok());
    }

    #[test]
    fn prompt_accepts_valid_input() {
        let (result, out) = prompt("12\n");
        assert_eq!(result.unwrap(), 12);
        assert_eq!(out, "Digit Count: ");
    }

    #[test]
    fn prompt_retries_on_bad_input() {
        let (result, out) = prompt("abc\n-4\n0\n7\n");
        assert_eq!(result.unwrap(), 7);
        assert_eq!(out.matches("Invalid input. Please enter an integer.").count(), 1);
        assert_eq!(out.matches("Enter a positive integer.").count(), 2);
    }

    #[test]
    fn prompt_fails_on_eof() {
        let (result, _) = prompt("");
        assert!(result.is_err());
    }

    #[test]
    fn variation_formatting() {
        let row = ComparisonRow {
            metric: Metric::Time,
            current: 1.0,
            best: Some(2.0),
            variation: Variation::Percent(50.0),
        };
        assert_eq!(format_variation(&row, false), "50.00");
        assert_eq!(format_variation(&row, true), "\x1b[32m50.00\x1b[0m");
        assert_eq!(format_metric(Metric::CpuUsage, 42.0), "42.00%");
        assert_eq!(format_metric(Metric::Time, 65.5), "01:05.5");
    }
}
