//! ACQ-Convert: batch conversion of ACQ recordings
//!
//! Decodes each input through an external [`Decoder`], writes one float32
//! binary per valid channel and accumulates a cumulative `metadata.json`.

pub mod batch;
pub mod config;
pub mod decoder;
pub mod extractor;
pub mod logging;

pub use batch::{BatchConverter, BatchError, BatchEvent, BatchSummary, FileSkip};
pub use config::{ConvertConfig, DecoderConfig};
pub use decoder::{CommandDecoder, DecodeError, Decoder, StaticDecoder};
pub use extractor::{extract, safe_prefix, ChannelSkip, ExtractError, Extraction};
