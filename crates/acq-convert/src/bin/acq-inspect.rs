//! acq-inspect: list a converted output directory and check its binaries

use std::path::PathBuf;
use std::process::ExitCode;

use acq_convert::logging::init_logging;
use acq_core::Dataset;
use anyhow::Context;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "acq-inspect", version)]
#[command(about = "Summarise metadata.json in a converted output directory")]
struct Args {
    /// Directory holding metadata.json
    #[arg(value_name = "OUTPUT_DIR")]
    output_dir: PathBuf,

    /// Check that every channel binary exists with the recorded length
    #[arg(long)]
    verify: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    init_logging(args.verbose);

    let dataset = Dataset::open(&args.output_dir)
        .with_context(|| format!("failed to open {}", args.output_dir.display()))?;
    let store = dataset.store();

    println!("Metadata: {}", args.output_dir.join("metadata.json").display());
    println!("Created: {}", store.created);
    if let Some(updated) = &store.last_updated {
        println!("Last updated: {updated}");
    }
    println!("Files: {}", store.total_files_processed);

    for file in dataset.files() {
        println!(
            "\n{} ({}, {}/{} channels)",
            file.source_file,
            file.processed_timestamp,
            file.channels.len(),
            file.num_channels
        );
        for channel in &file.channels {
            println!(
                "  [{}] {:<16} {:>10} samples @ {} Hz  min {:.4} max {:.4}  -> {}",
                channel.index,
                channel.name,
                channel.num_samples,
                channel.sample_rate,
                channel.statistics.min,
                channel.statistics.max,
                channel.binary_file
            );
        }
    }

    if !args.verify {
        return Ok(ExitCode::SUCCESS);
    }

    let problems = dataset.verify();
    if problems.is_empty() {
        println!("\nAll {} channel binaries verified", store.total_channels());
        return Ok(ExitCode::SUCCESS);
    }

    eprintln!();
    for problem in &problems {
        eprintln!("ERROR: {problem}");
    }
    eprintln!("{} problem(s) found", problems.len());
    Ok(ExitCode::FAILURE)
}
