//! RfmForge: Customer Segmentation CLI using quintile-scored RFM analysis
//!
//! This is the main entrypoint that orchestrates ingestion, scoring,
//! export and the segment report.

use anyhow::{Context, Result};
use clap::Parser;
use rfmforge::{read_export, report, run, write_export, Args, SegmentSummary, SegmentationRun};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();
    init_tracing(args.verbose);

    if let Some(ref path) = args.verify {
        run_verify_mode(path)?;
    } else {
        run_full_pipeline(&args)?;
    }

    Ok(())
}

/// Initialize tracing from RFMFORGE_LOG, defaulting to info (debug when verbose)
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env("RFMFORGE_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Re-read an export and check it row by row
fn run_verify_mode(path: &str) -> Result<()> {
    let customers =
        read_export(path).with_context(|| format!("export {} failed validation", path))?;

    println!("✓ {} rows verified in {}", customers.len(), path);
    println!("\n{}", SegmentSummary::from_customers(&customers));
    Ok(())
}

/// Run the full segmentation pipeline
fn run_full_pipeline(args: &Args) -> Result<()> {
    let start_time = Instant::now();

    let config = args.pipeline_config().context("invalid arguments")?;
    let segment = args.segment_filter()?;

    info!(input = %args.input, period_days = config.period_days, "starting RFM segmentation");
    let result = run(&args.input, &config)
        .with_context(|| format!("failed to segment customers from {}", args.input))?;

    write_export(&result.customers, &args.output)
        .with_context(|| format!("failed to write export to {}", args.output))?;

    print_run_summary(&result);

    if let Some(segment) = segment {
        let listed = report::list_segment(&result.customers, segment, args.listing());

        println!("\n=== {} ({}) ===", segment, segment.description());
        for customer in &listed {
            println!("{}", report::format_customer(customer));
        }
    }

    println!("\nExport saved to: {}", args.output);
    info!(
        elapsed_secs = start_time.elapsed().as_secs_f64(),
        "pipeline complete"
    );

    Ok(())
}

fn print_run_summary(result: &SegmentationRun) {
    println!(
        "✓ Window: {} days after {} (now = {})",
        result.window.period_days, result.window.threshold, result.window.now
    );
    println!(
        "✓ Orders in window: {} ({} malformed rows skipped)",
        result.windowed_orders, result.skipped_rows
    );
    println!("✓ Customers scored: {}", result.customers.len());

    let extremes = report::extremes(&result.customers);
    for customer in &extremes.top_monetary {
        println!("  Top monetary:  {}", report::format_customer(customer));
    }
    for customer in &extremes.top_frequency {
        println!("  Top frequency: {}", report::format_customer(customer));
    }

    println!("\n=== Segment Summary ===");
    println!("{}", SegmentSummary::from_customers(&result.customers));
}
