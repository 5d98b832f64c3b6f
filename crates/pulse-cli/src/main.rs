mod config;
mod error;
mod io;
mod report;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pulse_core::signal::summarize;
use pulse_core::Pipeline;

use crate::config::AppConfig;

pub use crate::error::{AppError, AppResult};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ipo_pulse=info,pulse_core=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .init();

    println!("================================================");
    println!("          IPO PULSE - Signal Builder            ");
    println!("================================================");

    let mut config =
        AppConfig::load().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
    config.load_name_tables()?;

    // First positional argument overrides the configured input file
    if let Some(path) = std::env::args().nth(1) {
        config.input.path = path;
    }

    println!("[CONFIG] Input: {}", config.input.path);
    println!("[CONFIG] Output dir: {}", config.output.dir);
    println!(
        "[CONFIG] Similarity threshold: {}",
        config.pipeline.similarity_threshold
    );

    let batch = io::read_records(&config.input.path)?;
    if batch.unreadable_rows > 0 {
        println!("[INPUT] WARNING: {} unreadable rows skipped", batch.unreadable_rows);
    }
    println!("[INPUT] {} records loaded", batch.records.len());

    let pipeline = Pipeline::new(config.pipeline.clone())?;
    let output = pipeline.run(&batch.records)?;

    let written = io::write_outputs(
        &config.output.dir,
        &output.aggregates,
        &output.trends,
        &output.signals,
        config.output.write_json,
    )?;

    println!("[OUTPUT] {}", written.summary.display());
    println!("[OUTPUT] {}", written.trend.display());
    println!("[OUTPUT] {}", written.signals.display());
    if let Some(json) = &written.signals_json {
        println!("[OUTPUT] {}", json.display());
    }

    report::print_signals(&output.signals);
    report::print_summary(&summarize(&output.signals), &output.stats);

    tracing::info!(
        signals = output.stats.signals,
        generated_at = ?output.stats.generated_at,
        "Run complete"
    );

    Ok(())
}
