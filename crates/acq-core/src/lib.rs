//! ACQ-Core: data model and on-disk layout for converted ACQ recordings
//!
//! Decoded recordings, channel statistics, the raw float32 channel binaries
//! and the cumulative `metadata.json` document.

pub mod dataset;
pub mod error;
pub mod format;
pub mod metadata;
pub mod recording;
pub mod stats;

pub use dataset::Dataset;
pub use error::{AcqError, AcqResult};
pub use format::DataType;
pub use metadata::{ChannelRecord, FileRecord, MetadataStore, StoreOrigin, METADATA_FILE_NAME};
pub use recording::{Channel, Recording, ValidChannel};
pub use stats::ChannelStats;
