//! Channel extraction: one decoded recording to binaries plus a [`FileRecord`]

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use acq_core::format::{binary_file_name, narrow_samples, write_channel_binary};
use acq_core::{AcqError, AcqResult, Channel, ChannelRecord, ChannelStats, FileRecord, Recording};
use thiserror::Error;
use tracing::{debug, warn};

/// File-level extraction failure
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Every channel was skipped; the file contributes nothing
    #[error("no valid channels in {source_file} ({skipped} of {total} skipped)")]
    NoValidChannels {
        source_file: String,
        skipped: usize,
        total: usize,
    },

    #[error("cannot create output directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A channel left out of the output, with the reason
#[derive(Debug)]
pub struct ChannelSkip {
    pub index: usize,
    pub reason: AcqError,
}

impl fmt::Display for ChannelSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel {}: {}", self.index, self.reason)
    }
}

/// Result of a successful extraction
#[derive(Debug)]
pub struct Extraction {
    pub record: FileRecord,
    pub skipped: Vec<ChannelSkip>,
}

/// Make a file stem safe for use in binary names
///
/// Anything other than alphanumerics, `-` and `_` becomes `_`.
pub fn safe_prefix(stem: &str) -> String {
    stem.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// Binary name prefix for an input path, from its file name without extension
pub fn prefix_for(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    safe_prefix(&stem)
}

/// Convert every valid channel of `recording` into `output_dir`
///
/// Channels are visited in order. Each one either yields a [`ChannelRecord`]
/// and a `{prefix}_channel_{index}.bin` file, or is skipped with a warning.
/// Returns [`ExtractError::NoValidChannels`] when nothing survives.
pub fn extract(
    recording: &Recording,
    output_dir: &Path,
    prefix: &str,
    source_file: &str,
) -> Result<Extraction, ExtractError> {
    fs::create_dir_all(output_dir).map_err(|source| ExtractError::OutputDir {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let mut record = FileRecord::new(source_file, recording.channel_count());
    let mut skipped = Vec::new();

    for (index, slot) in recording.slots() {
        match extract_channel(index, slot, output_dir, prefix) {
            Ok(channel) => {
                debug!(
                    "{}: channel {} '{}' -> {} ({} samples @ {} Hz)",
                    source_file,
                    index,
                    channel.name,
                    channel.binary_file,
                    channel.num_samples,
                    channel.sample_rate
                );
                record.channels.push(channel);
            }
            Err(reason) => {
                warn!("{}: skipping channel {}: {}", source_file, index, reason);
                skipped.push(ChannelSkip { index, reason });
            }
        }
    }

    if record.channels.is_empty() {
        return Err(ExtractError::NoValidChannels {
            source_file: source_file.to_owned(),
            skipped: skipped.len(),
            total: recording.channel_count(),
        });
    }

    Ok(Extraction { record, skipped })
}

/// Validate, summarise and write one channel slot
///
/// Statistics are computed before anything touches the disk, so a channel
/// rejected at any step leaves no binary behind.
pub fn extract_channel(
    index: usize,
    slot: Option<&Channel>,
    output_dir: &Path,
    prefix: &str,
) -> AcqResult<ChannelRecord> {
    let channel = slot.ok_or(AcqError::MissingChannel)?;
    let valid = channel.validate()?;

    let data = narrow_samples(valid.samples);
    let statistics = ChannelStats::calculate(&data)?;

    let binary_file = binary_file_name(prefix, index);
    write_channel_binary(&output_dir.join(&binary_file), &data)?;

    Ok(ChannelRecord::new(index, &valid, binary_file, statistics))
}
