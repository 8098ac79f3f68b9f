//! CTG Monitor CLI
//!
//! Replays CTG recordings through the analysis pipeline, either behind an
//! HTTP API for a dashboard or straight to the terminal.

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use ctg_monitor::{
    config::Config,
    core::{AnalysisSession, ReportEntry, SessionSettings},
    record::load_or_synthesize,
    SampleSeries, CLINICAL_DISCLAIMER, VERSION,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ctg-monitor")]
#[command(version = VERSION)]
#[command(about = "Streaming CTG analysis and flag annotation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the analysis API for a polling dashboard
    Serve {
        /// Recording to replay (CSV with seconds, fhr, uc)
        #[arg(long)]
        data: Option<PathBuf>,

        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
    },

    /// Replay a recording in the terminal and print the flag report
    Replay {
        /// Recording to replay (CSV with seconds, fhr, uc)
        #[arg(long)]
        data: Option<PathBuf>,

        /// Delay between ticks in milliseconds
        #[arg(long, default_value = "0")]
        interval_ms: u64,

        /// Write the final report as JSON to the export directory
        #[arg(long)]
        export: bool,
    },

    /// Show configuration
    Config,

    /// Display the clinical-use disclaimer
    Disclaimer,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Commands::Serve { data, port } => cmd_serve(data, port),
        Commands::Replay {
            data,
            interval_ms,
            export,
        } => cmd_replay(data, interval_ms, export),
        Commands::Config => cmd_config(),
        Commands::Disclaimer => {
            println!("{CLINICAL_DISCLAIMER}");
            Ok(())
        }
    }
}

/// Log to stderr so report tables on stdout stay clean.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config() -> Config {
    Config::load().unwrap_or_else(|e| {
        tracing::warn!("Could not read config, using defaults: {}", e);
        Config::default()
    })
}

fn load_recording(config: &Config, data: Option<PathBuf>) -> anyhow::Result<Arc<SampleSeries>> {
    let path = data.unwrap_or_else(|| config.dataset_path.clone());
    let series = load_or_synthesize(&path, config.sampling_rate_hz)
        .with_context(|| format!("Failed to load recording {path:?}"))?;
    tracing::info!(
        path = ?path,
        samples = series.len(),
        duration_secs = series.total_duration(),
        "Recording loaded"
    );
    Ok(Arc::new(series))
}

#[cfg(feature = "server")]
fn cmd_serve(data: Option<PathBuf>, port: Option<u16>) -> anyhow::Result<()> {
    use ctg_monitor::core::create_shared_session;
    use ctg_monitor::server::{self, ServerConfig};

    let config = load_config();
    let series = load_recording(&config, data)?;
    let session = create_shared_session(series, &config);
    let server_config = ServerConfig::new(
        port.unwrap_or(config.server.port),
        config.server.allowed_origins.clone(),
    );

    println!("CTG Monitor v{VERSION}");
    println!();

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(async {
        let (addr, shutdown_tx) = server::run(server_config, session).await?;
        println!("Serving on http://{addr}");
        println!("Press Ctrl+C to stop.");

        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl+C")?;
        println!();
        println!("Stopping...");
        let _ = shutdown_tx.send(());
        Ok(())
    })
}

#[cfg(not(feature = "server"))]
fn cmd_serve(_data: Option<PathBuf>, _port: Option<u16>) -> anyhow::Result<()> {
    anyhow::bail!("this build has no HTTP server; rebuild with `--features server`")
}

fn cmd_replay(data: Option<PathBuf>, interval_ms: u64, export: bool) -> anyhow::Result<()> {
    let config = load_config();
    let series = load_recording(&config, data)?;
    let mut session = AnalysisSession::new(series, SessionSettings::from_config(&config));

    println!("CTG Monitor v{VERSION}");
    println!();
    println!("Replaying {:.1}s of recording...", session.cursor().total_duration());
    println!("Press Ctrl+C to stop early.");
    println!();

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone());

    let mut last_status: Option<String> = None;
    while running.load(Ordering::SeqCst) {
        let chunk = session.advance_and_report();
        if chunk.finished {
            break;
        }

        let outcome = session.analyze()?;
        if let Some(metrics) = outcome.metrics {
            if last_status.as_deref() != Some(metrics.status.as_str()) {
                println!(
                    "[{:>7.1}s] {:>5.1}%  Category {:<3} {} (baseline {:.1} bpm, variability {:.1})",
                    chunk.time.last().copied().unwrap_or_default(),
                    chunk.progress,
                    metrics.category,
                    metrics.status,
                    metrics.baseline_bpm,
                    metrics.variability,
                );
                last_status = Some(metrics.status);
            }
        }

        if interval_ms > 0 {
            thread::sleep(Duration::from_millis(interval_ms));
        }
    }

    if !running.load(Ordering::SeqCst) {
        println!();
        println!("Replay stopped early.");
    }

    let report = session.report();
    print_report(&report);

    if export {
        export_report(&config, &report)?;
    }
    Ok(())
}

fn print_report(report: &[ReportEntry]) {
    println!();
    println!("Flag Report");
    println!("===========");
    println!();

    if report.is_empty() {
        println!("No flagged intervals.");
        return;
    }

    println!(
        "{:>8} {:>8} {:>8}  {:<4} {:<8} Condition",
        "Start", "End", "Dur(s)", "Cat", "Severity"
    );
    for entry in report {
        println!(
            "{:>8.1} {:>8.1} {:>8.1}  {:<4} {:<8} {}",
            entry.start_time,
            entry.end_time,
            entry.duration,
            entry.category,
            entry.severity,
            entry.condition
        );
    }
    println!();
    println!("Total: {} interval(s)", report.len());
}

fn export_report(config: &Config, report: &[ReportEntry]) -> anyhow::Result<()> {
    config
        .ensure_directories()
        .context("Failed to create export directory")?;

    let output_path = config.export_path.join(format!(
        "report_{}.json",
        Utc::now().format("%Y%m%d_%H%M%S")
    ));
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    std::fs::write(&output_path, json)
        .with_context(|| format!("Failed to write {output_path:?}"))?;

    println!("Exported to {output_path:?}");
    Ok(())
}

fn cmd_config() -> anyhow::Result<()> {
    let config = load_config();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl+C handler");
}
