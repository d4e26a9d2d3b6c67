//! Reading a converted output directory back

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{AcqError, AcqResult};
use crate::format::read_channel_binary;
use crate::metadata::{ChannelRecord, FileRecord, MetadataStore};

/// A converted output directory: the metadata store plus its binaries
#[derive(Debug, Clone)]
pub struct Dataset {
    root: PathBuf,
    store: MetadataStore,
}

impl Dataset {
    /// Load `metadata.json` from an output directory
    pub fn open(root: impl Into<PathBuf>) -> AcqResult<Self> {
        let root = root.into();
        let store = MetadataStore::load(&MetadataStore::path_in(&root))?;
        Ok(Dataset { root, store })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn store(&self) -> &MetadataStore {
        &self.store
    }

    pub fn files(&self) -> &[FileRecord] {
        &self.store.files
    }

    /// Absolute path of a channel's binary
    pub fn binary_path(&self, channel: &ChannelRecord) -> PathBuf {
        self.root.join(&channel.binary_file)
    }

    /// Load a channel's samples
    ///
    /// A length that disagrees with `num_samples` is logged, and whatever
    /// whole samples the file holds are returned.
    pub fn read_channel(&self, channel: &ChannelRecord) -> AcqResult<Vec<f32>> {
        let path = self.binary_path(channel);
        let data = read_channel_binary(&path)?;
        if data.len() != channel.num_samples {
            warn!(
                "{}: expected {} samples, found {}",
                path.display(),
                channel.num_samples,
                data.len()
            );
        }
        Ok(data)
    }

    /// Check that every referenced binary exists with its exact length
    ///
    /// Returns one error per problem found; an empty list means the
    /// directory is consistent with its metadata.
    pub fn verify(&self) -> Vec<AcqError> {
        let mut problems = Vec::new();
        for channel in self.files().iter().flat_map(|f| f.channels.iter()) {
            let path = self.binary_path(channel);
            match fs::metadata(&path) {
                Ok(meta) if meta.len() == channel.expected_byte_len() => {}
                Ok(meta) => problems.push(AcqError::BinarySizeMismatch {
                    path,
                    expected_bytes: channel.expected_byte_len(),
                    actual_bytes: meta.len(),
                }),
                Err(err) => problems.push(AcqError::io(path, err)),
            }
        }
        problems
    }
}
