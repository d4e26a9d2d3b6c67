//! Raw float32 channel binaries
//!
//! Each converted channel is stored as a headerless array of little-endian
//! IEEE-754 single precision values: `4 * num_samples` bytes, no length
//! prefix, no padding. Files are named `{prefix}_channel_{index}.bin`.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AcqError, AcqResult};

/// Size of one stored sample
pub const BYTES_PER_SAMPLE: u64 = 4;

/// Sample encoding recorded in the metadata `data_type` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[default]
    Float32,
}

/// Binary file name for a channel
pub fn binary_file_name(prefix: &str, channel_index: usize) -> String {
    format!("{prefix}_channel_{channel_index}.bin")
}

/// Expected binary length for a sample count
pub fn expected_byte_len(num_samples: usize) -> u64 {
    num_samples as u64 * BYTES_PER_SAMPLE
}

/// Narrow decoder samples to the stored precision
pub fn narrow_samples(samples: &[f64]) -> Vec<f32> {
    samples.iter().map(|&x| x as f32).collect()
}

/// Encode samples as contiguous little-endian f32
pub fn encode_f32_le(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * BYTES_PER_SAMPLE as usize);
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    bytes
}

/// Decode a little-endian f32 array; a trailing partial value is ignored
pub fn decode_f32_le(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(BYTES_PER_SAMPLE as usize)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Write a channel binary, replacing any existing file
///
/// Returns the number of bytes written. If writing fails part way, the
/// partial file is removed before the error is returned.
pub fn write_channel_binary(path: &Path, samples: &[f32]) -> AcqResult<u64> {
    let result = write_all(path, samples);
    if result.is_err() && path.exists() {
        if let Err(err) = fs::remove_file(path) {
            tracing::warn!("could not remove partial binary {}: {}", path.display(), err);
        }
    }
    result
}

fn write_all(path: &Path, samples: &[f32]) -> AcqResult<u64> {
    let file = File::create(path).map_err(|e| AcqError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    for sample in samples {
        writer
            .write_all(&sample.to_le_bytes())
            .map_err(|e| AcqError::io(path, e))?;
    }
    writer.flush().map_err(|e| AcqError::io(path, e))?;
    Ok(expected_byte_len(samples.len()))
}

/// Read a channel binary back into memory
pub fn read_channel_binary(path: &Path) -> AcqResult<Vec<f32>> {
    let bytes = fs::read(path).map_err(|e| AcqError::io(path, e))?;
    Ok(decode_f32_le(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_naming() {
        assert_eq!(binary_file_name("subject_01", 3), "subject_01_channel_3.bin");
        assert_eq!(expected_byte_len(1000), 4000);
    }

    #[test]
    fn test_little_endian_layout() {
        let bytes = encode_f32_le(&[1.0, -2.5]);
        assert_eq!(bytes.len(), 8);
        assert_eq!(&bytes[..4], &[0x00, 0x00, 0x80, 0x3f]);
        assert_eq!(&bytes[4..], &(-2.5f32).to_le_bytes());
    }

    #[test]
    fn test_partial_trailing_value_is_dropped() {
        let mut bytes = encode_f32_le(&[3.0, 4.0]);
        bytes.push(0xff);
        assert_eq!(decode_f32_le(&bytes), vec![3.0, 4.0]);
    }

    #[test]
    fn test_write_overwrites_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(binary_file_name("rec", 0));
        fs::write(&path, vec![0u8; 64]).unwrap();

        let samples = narrow_samples(&[0.5, 1.5, 2.5]);
        let written = write_channel_binary(&path, &samples).unwrap();

        assert_eq!(written, 12);
        assert_eq!(fs::metadata(&path).unwrap().len(), 12);
        assert_eq!(read_channel_binary(&path).unwrap(), vec![0.5, 1.5, 2.5]);
    }

    #[test]
    fn test_write_into_missing_directory_fails_cleanly() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("rec_channel_0.bin");

        let err = write_channel_binary(&path, &[1.0]).unwrap_err();
        assert!(matches!(err, AcqError::Io { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_data_type_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&DataType::Float32).unwrap(), "\"float32\"");
    }
}
