//! Cumulative conversion metadata
//!
//! One `metadata.json` per output directory describes every file converted
//! into it, across any number of runs. The document only ever grows: records
//! are appended, never replaced or deduplicated.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{AcqError, AcqResult};
use crate::format::{expected_byte_len, DataType};
use crate::recording::{null_as_empty, ValidChannel};
use crate::stats::ChannelStats;

/// File name of the cumulative document inside an output directory
pub const METADATA_FILE_NAME: &str = "metadata.json";

/// Local wall-clock time in ISO-8601 form, microsecond precision
pub fn timestamp_now() -> String {
    chrono::Local::now()
        .naive_local()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

/// Description of one converted channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelRecord {
    /// Position in the source recording; gaps mark skipped channels
    pub index: usize,
    /// Channel label; `null` in a stored document reads as empty
    #[serde(deserialize_with = "null_as_empty")]
    pub name: String,
    pub units: Option<String>,
    /// Samples per second
    pub sample_rate: f64,
    pub num_samples: usize,
    pub duration_seconds: f64,
    /// Binary file name relative to the output directory
    pub binary_file: String,
    pub data_type: DataType,
    pub statistics: ChannelStats,
}

impl ChannelRecord {
    pub fn new(
        index: usize,
        channel: &ValidChannel<'_>,
        binary_file: String,
        statistics: ChannelStats,
    ) -> Self {
        ChannelRecord {
            index,
            name: channel.name.to_owned(),
            units: channel.units.map(str::to_owned),
            sample_rate: channel.sample_rate,
            num_samples: channel.len(),
            duration_seconds: channel.duration_seconds(),
            binary_file,
            data_type: DataType::Float32,
            statistics,
        }
    }

    /// Length the binary file must have on disk
    pub fn expected_byte_len(&self) -> u64 {
        expected_byte_len(self.num_samples)
    }
}

/// Description of one converted input file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Base name of the input file
    pub source_file: String,
    pub processed_timestamp: String,
    /// Channel slots in the recording, skipped ones included
    pub num_channels: usize,
    pub channels: Vec<ChannelRecord>,
}

impl FileRecord {
    /// Start a record stamped with the current time
    pub fn new(source_file: impl Into<String>, num_channels: usize) -> Self {
        FileRecord {
            source_file: source_file.into(),
            processed_timestamp: timestamp_now(),
            num_channels,
            channels: Vec::new(),
        }
    }
}

/// Whether a store was read from disk or started fresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOrigin {
    Loaded,
    Created,
}

/// The cumulative metadata document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataStore {
    /// Set once when the document is first created
    pub created: String,
    /// Always `files.len()` after an append
    pub total_files_processed: usize,
    /// Absent until the first file is accepted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub files: Vec<FileRecord>,
}

impl MetadataStore {
    /// Empty store created now
    pub fn new() -> Self {
        MetadataStore {
            created: timestamp_now(),
            total_files_processed: 0,
            last_updated: None,
            files: Vec::new(),
        }
    }

    /// Path of the document inside an output directory
    pub fn path_in(output_dir: &Path) -> PathBuf {
        output_dir.join(METADATA_FILE_NAME)
    }

    /// Read an existing document
    pub fn load(path: &Path) -> AcqResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| AcqError::io(path, e))?;
        serde_json::from_str(&content).map_err(|source| AcqError::MalformedMetadata {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the document at `path`, or start a fresh one if there is none
    ///
    /// Nothing is written here; a fresh store reaches disk on its first
    /// [`MetadataStore::persist`].
    pub fn load_or_create(path: &Path) -> AcqResult<(Self, StoreOrigin)> {
        if path.exists() {
            let store = Self::load(path)?;
            info!(
                "loaded metadata from {} ({} files)",
                path.display(),
                store.files.len()
            );
            Ok((store, StoreOrigin::Loaded))
        } else {
            info!("creating new metadata store for {}", path.display());
            Ok((Self::new(), StoreOrigin::Created))
        }
    }

    /// Append a converted file and refresh the derived fields
    pub fn append(&mut self, record: FileRecord) {
        self.files.push(record);
        self.total_files_processed = self.files.len();
        self.last_updated = Some(timestamp_now());
    }

    /// Rewrite the whole document at `path`
    ///
    /// The JSON is written to a sibling temporary file and renamed into
    /// place, so an interrupted write leaves the previous document intact.
    pub fn persist(&self, path: &Path) -> AcqResult<()> {
        let content = serde_json::to_string_pretty(self).map_err(AcqError::MetadataEncoding)?;

        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        fs::write(&tmp_path, content).map_err(|e| AcqError::io(&tmp_path, e))?;
        if let Err(err) = fs::rename(&tmp_path, path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(AcqError::io(path, err));
        }

        debug!("persisted {} files to {}", self.files.len(), path.display());
        Ok(())
    }

    /// Channel binaries referenced across all files
    pub fn total_channels(&self) -> usize {
        self.files.iter().map(|f| f.channels.len()).sum()
    }
}

impl Default for MetadataStore {
    fn default() -> Self {
        Self::new()
    }
}
