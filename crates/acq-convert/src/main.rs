//! acq-convert: batch-convert ACQ recordings to JSON metadata plus raw
//! float32 channel binaries

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use acq_convert::config::DEFAULT_PYTHON;
use acq_convert::logging::init_logging;
use acq_convert::{
    BatchConverter, BatchError, BatchEvent, BatchSummary, CommandDecoder, ConvertConfig,
    DecoderConfig,
};
use acq_core::{FileRecord, StoreOrigin};
use anyhow::Context;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use tracing::debug;

const RULE: &str = "============================================================";

const EXAMPLES: &str = "\
Examples:
  # Convert a single file
  acq-convert ./output data/sample.acq

  # Convert multiple files
  acq-convert ./output data/file1.acq data/file2.acq data/file3.acq

  # Convert all ACQ files in a directory (using shell expansion)
  acq-convert ./output data/*.acq";

/// Convert ACQ files to JSON metadata and binary channel data.
///
/// The JSON file is cumulative and updates with each new ACQ file.
/// Binary files are saved separately for each channel.
#[derive(Parser, Debug)]
#[command(name = "acq-convert", version, arg_required_else_help = true)]
#[command(after_help = EXAMPLES)]
struct Cli {
    /// Directory receiving metadata.json and the channel binaries
    #[arg(value_name = "OUTPUT_DIR")]
    output_dir: PathBuf,

    /// ACQ files to convert, in order
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<PathBuf>,

    /// Python interpreter with the bioread package installed
    #[arg(long, value_name = "PATH", default_value = DEFAULT_PYTHON)]
    python: PathBuf,

    /// Program printing a recording as JSON, used instead of bioread
    #[arg(long, value_name = "PROGRAM", conflicts_with = "python")]
    decoder: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => return usage_error(err),
    };

    init_logging(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("ERROR: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Help and version exit cleanly; any other argument problem exits 1
fn usage_error(err: clap::Error) -> ExitCode {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = err.print();
            ExitCode::SUCCESS
        }
        ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
            let _ = err.print();
            ExitCode::FAILURE
        }
        _ => {
            let _ = err.print();
            eprintln!();
            eprintln!("{}", Cli::command().render_help());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let decoder_config = match cli.decoder {
        Some(program) => DecoderConfig::Command { program },
        None => DecoderConfig::Bioread { python: cli.python },
    };
    let config = ConvertConfig::new(&cli.output_dir).with_decoder(decoder_config);
    debug!("configuration: {:?}", config);

    println!("Output directory: {}", cli.output_dir.display());
    println!("Input files: {}", cli.inputs.len());

    let converter = BatchConverter::new(CommandDecoder::from_config(&config.decoder), config);
    match converter.run_with_progress(&cli.inputs, print_event) {
        Ok(_) => Ok(ExitCode::SUCCESS),
        Err(BatchError::NothingConverted { .. }) => {
            eprintln!("\nERROR: No files were successfully processed");
            Ok(ExitCode::FAILURE)
        }
        Err(err) => Err(err).with_context(|| {
            format!("conversion into '{}' aborted", cli.output_dir.display())
        }),
    }
}

fn print_event(event: BatchEvent<'_>) {
    match event {
        BatchEvent::StoreReady { path, origin, files } => match origin {
            StoreOrigin::Loaded => {
                println!("Loading existing metadata from: {} ({files} files)", path.display())
            }
            StoreOrigin::Created => println!("Creating new metadata file"),
        },
        BatchEvent::FileStarted { path, position, total } => {
            println!("\n{RULE}");
            println!("[{position}/{total}] Reading ACQ file: {}", path.display());
            println!("{RULE}");
        }
        BatchEvent::UnexpectedExtension { .. } => {}
        BatchEvent::FileConverted { record, .. } => print_file(record),
        BatchEvent::FileSkipped { path, reason } => {
            println!("\nSkipped {}: {reason}", path.display());
        }
        BatchEvent::PersistFailed { .. } => {}
        BatchEvent::Finished { summary } => print_summary(summary),
    }
}

fn print_file(record: &FileRecord) {
    for channel in &record.channels {
        println!("\nChannel {}: {}", channel.index, channel.name);
        println!("  Sample rate: {} Hz", channel.sample_rate);
        println!("  Samples: {}", channel.num_samples);
        println!("  Units: {}", channel.units.as_deref().unwrap_or("-"));
        println!("  Duration: {:.2} seconds", channel.duration_seconds);
        println!(
            "  Saved binary: {} ({} bytes)",
            channel.binary_file,
            channel.expected_byte_len()
        );
    }
    println!(
        "\nSuccessfully processed: {} ({} channels)",
        record.source_file,
        record.channels.len()
    );
}

fn print_summary(summary: &BatchSummary) {
    println!("\n{RULE}");
    println!("CONVERSION COMPLETE");
    println!("{RULE}");
    println!(
        "Total files processed: {}/{}",
        summary.converted, summary.total_inputs
    );
    println!("Output directory: {}", absolute(&summary.output_dir).display());
    println!(
        "Metadata file: {}",
        summary
            .metadata_path
            .file_name()
            .map(|name| name.to_string_lossy())
            .unwrap_or_default()
    );
    println!("Total binary files: {}", summary.total_channels);
}

fn absolute(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
