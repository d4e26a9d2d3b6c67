//! Conversion configuration

use std::path::{Path, PathBuf};

use acq_core::MetadataStore;
use serde::{Deserialize, Serialize};

/// Interpreter used for the bioread bridge when none is given
pub const DEFAULT_PYTHON: &str = "python3";

/// Settings for one batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertConfig {
    /// Directory receiving `metadata.json` and the channel binaries
    pub output_dir: PathBuf,
    /// How input files are decoded
    pub decoder: DecoderConfig,
}

/// Decoder selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecoderConfig {
    /// Python interpreter running the built-in bioread bridge
    Bioread { python: PathBuf },
    /// Program invoked as `<program> <input>` that prints a recording as JSON
    Command { program: PathBuf },
}

impl ConvertConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        ConvertConfig {
            output_dir: output_dir.into(),
            ..Default::default()
        }
    }

    pub fn with_decoder(mut self, decoder: DecoderConfig) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Location of the cumulative document
    pub fn metadata_path(&self) -> PathBuf {
        MetadataStore::path_in(&self.output_dir)
    }
}

impl Default for ConvertConfig {
    fn default() -> Self {
        ConvertConfig {
            output_dir: PathBuf::from("."),
            decoder: DecoderConfig::default(),
        }
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        DecoderConfig::Bioread {
            python: PathBuf::from(DEFAULT_PYTHON),
        }
    }
}
