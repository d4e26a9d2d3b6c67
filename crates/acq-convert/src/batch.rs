//! Batch accumulation across input files
//!
//! Files are converted one at a time, in the order given. Every accepted
//! [`FileRecord`] is appended to the cumulative store and the store is
//! rewritten before the next file starts, so an interrupted batch loses at
//! most the file in progress.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use acq_core::{AcqError, FileRecord, MetadataStore, StoreOrigin};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::ConvertConfig;
use crate::decoder::{DecodeError, Decoder};
use crate::extractor::{extract, prefix_for, ChannelSkip, ExtractError};

/// Fatal batch errors, or a batch that converted nothing
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("cannot create output directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The existing metadata store cannot be loaded
    #[error("cannot load metadata store: {0}")]
    Store(#[source] AcqError),

    /// None of the inputs produced a file record
    #[error("no files were successfully converted ({} given)", .summary.total_inputs)]
    NothingConverted { summary: BatchSummary },
}

/// Why an input file was left out of the store
#[derive(Debug, Error)]
pub enum FileSkip {
    #[error("file not found")]
    NotFound,

    #[error("failed to decode: {0}")]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Extract(#[from] ExtractError),
}

/// Outcome counts of a batch run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    /// Inputs converted in this run
    pub converted: usize,
    /// Inputs given to this run
    pub total_inputs: usize,
    /// Files recorded in the store, earlier runs included
    pub files_in_store: usize,
    /// Channel binaries referenced by the store, earlier runs included
    pub total_channels: usize,
    pub output_dir: PathBuf,
    pub metadata_path: PathBuf,
}

/// Progress notifications emitted while a batch runs
#[derive(Debug)]
pub enum BatchEvent<'a> {
    StoreReady {
        path: &'a Path,
        origin: StoreOrigin,
        files: usize,
    },
    FileStarted {
        path: &'a Path,
        position: usize,
        total: usize,
    },
    /// Advisory only; the file is still converted
    UnexpectedExtension { path: &'a Path },
    FileConverted {
        path: &'a Path,
        record: &'a FileRecord,
        skipped: &'a [ChannelSkip],
    },
    FileSkipped {
        path: &'a Path,
        reason: &'a FileSkip,
    },
    /// The record stays in memory and is written with the next success
    PersistFailed { error: &'a AcqError },
    Finished { summary: &'a BatchSummary },
}

/// Case-insensitive `.acq` suffix check
pub fn has_acq_extension(path: &Path) -> bool {
    path.to_string_lossy().to_lowercase().ends_with(".acq")
}

/// Drives decoding and extraction over a list of inputs
pub struct BatchConverter<D> {
    decoder: D,
    config: ConvertConfig,
}

impl<D: Decoder> BatchConverter<D> {
    pub fn new(decoder: D, config: ConvertConfig) -> Self {
        BatchConverter { decoder, config }
    }

    /// Convert `inputs` without progress reporting
    pub fn run<P: AsRef<Path>>(&self, inputs: &[P]) -> Result<BatchSummary, BatchError> {
        self.run_with_progress(inputs, |_| {})
    }

    /// Convert `inputs`, reporting each step to `on_event`
    ///
    /// Succeeds when at least one input was converted. Individual inputs
    /// that are missing, fail to decode, or have no valid channel are
    /// skipped; only an unreadable existing store aborts the run.
    pub fn run_with_progress<P, F>(
        &self,
        inputs: &[P],
        mut on_event: F,
    ) -> Result<BatchSummary, BatchError>
    where
        P: AsRef<Path>,
        F: FnMut(BatchEvent<'_>),
    {
        let output_dir = self.config.output_dir();
        fs::create_dir_all(output_dir).map_err(|source| BatchError::OutputDir {
            path: output_dir.to_path_buf(),
            source,
        })?;

        let metadata_path = self.config.metadata_path();
        let (mut store, origin) =
            MetadataStore::load_or_create(&metadata_path).map_err(BatchError::Store)?;
        on_event(BatchEvent::StoreReady {
            path: &metadata_path,
            origin,
            files: store.files.len(),
        });

        let mut converted = 0;
        for (position, input) in inputs.iter().enumerate() {
            let path = input.as_ref();
            on_event(BatchEvent::FileStarted {
                path,
                position: position + 1,
                total: inputs.len(),
            });

            // A path that vanishes after this check surfaces as a decode error
            let outcome = if path.exists() {
                if !has_acq_extension(path) {
                    warn!("file does not have .acq extension: {}", path.display());
                    on_event(BatchEvent::UnexpectedExtension { path });
                }
                self.convert_file(path)
            } else {
                Err(FileSkip::NotFound)
            };

            match outcome {
                Ok((record, skipped)) => {
                    converted += 1;
                    info!(
                        "converted {} ({} channels)",
                        record.source_file,
                        record.channels.len()
                    );
                    on_event(BatchEvent::FileConverted {
                        path,
                        record: &record,
                        skipped: &skipped,
                    });

                    store.append(record);
                    if let Err(err) = store.persist(&metadata_path) {
                        error!("failed to save metadata: {}", err);
                        on_event(BatchEvent::PersistFailed { error: &err });
                    }
                }
                Err(reason) => {
                    warn!("skipping {}: {}", path.display(), reason);
                    on_event(BatchEvent::FileSkipped {
                        path,
                        reason: &reason,
                    });
                }
            }
        }

        let summary = BatchSummary {
            converted,
            total_inputs: inputs.len(),
            files_in_store: store.files.len(),
            total_channels: store.total_channels(),
            output_dir: output_dir.to_path_buf(),
            metadata_path,
        };
        on_event(BatchEvent::Finished { summary: &summary });

        if converted == 0 {
            return Err(BatchError::NothingConverted { summary });
        }
        Ok(summary)
    }

    fn convert_file(&self, path: &Path) -> Result<(FileRecord, Vec<ChannelSkip>), FileSkip> {
        let recording = self.decoder.decode(path)?;

        let source_file = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extraction = extract(
            &recording,
            self.config.output_dir(),
            &prefix_for(path),
            &source_file,
        )?;

        Ok((extraction.record, extraction.skipped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::StaticDecoder;
    use acq_core::{Channel, Recording};
    use tempfile::{tempdir, TempDir};

    struct Fixture {
        inputs: TempDir,
        output: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Fixture {
                inputs: tempdir().unwrap(),
                output: tempdir().unwrap(),
            }
        }

        /// Create an input file on disk so the existence check passes
        fn input(&self, name: &str) -> PathBuf {
            let path = self.inputs.path().join(name);
            fs::write(&path, b"ACQ").unwrap();
            path
        }

        fn config(&self) -> ConvertConfig {
            ConvertConfig::new(self.output.path())
        }

        fn metadata_path(&self) -> PathBuf {
            self.output.path().join("metadata.json")
        }

        fn load_store(&self) -> MetadataStore {
            MetadataStore::load(&self.metadata_path()).unwrap()
        }
    }

    fn good_recording(channels: usize) -> Recording {
        Recording::new(
            (0..channels)
                .map(|i| Some(Channel::new(format!("CH{i}"), Some("V"), 100.0, vec![i as f64; 50])))
                .collect(),
        )
    }

    fn dead_recording() -> Recording {
        let mut channel = Channel::new("Dead", None, 100.0, vec![]);
        channel.samples = None;
        Recording::new(vec![Some(channel), None])
    }

    #[test]
    fn test_first_file_fails_second_succeeds() {
        let fx = Fixture::new();
        let a = fx.input("a.acq");
        let b = fx.input("b.acq");
        let decoder = StaticDecoder::new()
            .with_recording(&a, dead_recording())
            .with_recording(&b, good_recording(1));

        let summary = BatchConverter::new(decoder, fx.config()).run(&[&a, &b]).unwrap();

        assert_eq!(summary.converted, 1);
        assert_eq!(summary.total_inputs, 2);
        let store = fx.load_store();
        assert_eq!(store.files.len(), 1);
        assert_eq!(store.total_files_processed, 1);
        assert_eq!(store.files[0].source_file, "b.acq");
        assert!(!fx.output.path().join("a_channel_0.bin").exists());
    }

    #[test]
    fn test_rerun_appends_duplicate_record() {
        let fx = Fixture::new();
        let a = fx.input("a.acq");
        let decoder = StaticDecoder::new().with_recording(&a, good_recording(2));
        let converter = BatchConverter::new(decoder, fx.config());

        converter.run(&[&a]).unwrap();
        let created = fx.load_store().created;
        let summary = converter.run(&[&a]).unwrap();

        let store = fx.load_store();
        assert_eq!(store.files.len(), 2);
        assert_eq!(store.total_files_processed, 2);
        assert_eq!(store.created, created);
        assert_eq!(store.files[0].source_file, store.files[1].source_file);
        assert_eq!(summary.files_in_store, 2);
        assert_eq!(summary.total_channels, 4);
    }

    #[test]
    fn test_all_decoder_failures_leave_no_metadata() {
        let fx = Fixture::new();
        let a = fx.input("a.acq");
        let b = fx.input("b.acq");
        let decoder = StaticDecoder::new()
            .with_failure(&a, "bad header")
            .with_failure(&b, "truncated");

        let err = BatchConverter::new(decoder, fx.config())
            .run(&[&a, &b])
            .unwrap_err();

        match err {
            BatchError::NothingConverted { summary } => {
                assert_eq!(summary.converted, 0);
                assert_eq!(summary.total_inputs, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!fx.metadata_path().exists());
    }

    #[test]
    fn test_missing_input_is_skipped() {
        let fx = Fixture::new();
        let present = fx.input("present.acq");
        let missing = fx.inputs.path().join("missing.acq");
        let decoder = StaticDecoder::new()
            .with_recording(&present, good_recording(1))
            .with_recording(&missing, good_recording(1));

        let mut skipped = Vec::new();
        let summary = BatchConverter::new(decoder, fx.config())
            .run_with_progress(&[&missing, &present], |event| {
                if let BatchEvent::FileSkipped { path, reason } = event {
                    assert!(matches!(reason, FileSkip::NotFound));
                    skipped.push(path.to_path_buf());
                }
            })
            .unwrap();

        assert_eq!(summary.converted, 1);
        assert_eq!(skipped, vec![missing]);
    }

    #[test]
    fn test_missing_file_gets_no_extension_warning() {
        let fx = Fixture::new();
        let missing = fx.inputs.path().join("notes.txt");
        let present = fx.input("present.acq");
        let decoder = StaticDecoder::new().with_recording(&present, good_recording(1));

        let mut extension_warnings = 0;
        let mut not_found = 0;
        BatchConverter::new(decoder, fx.config())
            .run_with_progress(&[&missing, &present], |event| match event {
                BatchEvent::UnexpectedExtension { .. } => extension_warnings += 1,
                BatchEvent::FileSkipped {
                    reason: FileSkip::NotFound,
                    ..
                } => not_found += 1,
                _ => {}
            })
            .unwrap();

        assert_eq!(extension_warnings, 0);
        assert_eq!(not_found, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_finite_channel_skipped_through_command_decoder() {
        use crate::decoder::CommandDecoder;

        let fx = Fixture::new();
        let input = fx.inputs.path().join("mixed.acq");
        fs::write(
            &input,
            r#"{"channels": [
                {"name": "ECG", "units": "mV", "samples_per_second": 100.0, "data": [1.0, null]},
                {"name": "RSP", "units": "V", "samples_per_second": 50.0, "data": [1.0, 2.0]}
            ]}"#,
        )
        .unwrap();

        let mut skipped_channels = Vec::new();
        let summary = BatchConverter::new(CommandDecoder::new("cat"), fx.config())
            .run_with_progress(&[&input], |event| {
                if let BatchEvent::FileConverted { skipped, .. } = event {
                    skipped_channels.extend(skipped.iter().map(|skip| skip.index));
                    assert!(matches!(
                        skipped[0].reason,
                        AcqError::NonFiniteStatistics
                    ));
                }
            })
            .unwrap();

        assert_eq!(summary.converted, 1);
        assert_eq!(skipped_channels, vec![0]);
        let store = fx.load_store();
        assert_eq!(store.files[0].channels.len(), 1);
        assert_eq!(store.files[0].channels[0].index, 1);
        assert!(!fx.output.path().join("mixed_channel_0.bin").exists());
        assert_eq!(
            fs::metadata(fx.output.path().join("mixed_channel_1.bin"))
                .unwrap()
                .len(),
            8
        );
    }

    #[test]
    fn test_extension_check_is_advisory() {
        let fx = Fixture::new();
        let input = fx.input("session.dat");
        let decoder = StaticDecoder::new().with_recording(&input, good_recording(1));

        let mut warned = false;
        let summary = BatchConverter::new(decoder, fx.config())
            .run_with_progress(&[&input], |event| {
                if let BatchEvent::UnexpectedExtension { .. } = event {
                    warned = true;
                }
            })
            .unwrap();

        assert!(warned);
        assert_eq!(summary.converted, 1);
        assert!(fx.output.path().join("session_channel_0.bin").exists());
    }

    #[test]
    fn test_count_matches_files_at_every_persist() {
        let fx = Fixture::new();
        let inputs: Vec<PathBuf> = (0..4).map(|i| fx.input(&format!("f{i}.acq"))).collect();
        let mut decoder = StaticDecoder::new();
        for (i, input) in inputs.iter().enumerate() {
            decoder = if i == 2 {
                decoder.with_failure(input, "corrupt")
            } else {
                decoder.with_recording(input, good_recording(i + 1))
            };
        }

        let metadata_path = fx.metadata_path();
        let mut checked = 0;
        BatchConverter::new(decoder, fx.config())
            .run_with_progress(&inputs, |event| {
                // The previous file's rewrite is on disk when the next one starts
                if let BatchEvent::FileStarted { position, .. } = event {
                    if metadata_path.exists() {
                        let store = MetadataStore::load(&metadata_path).unwrap();
                        assert_eq!(store.total_files_processed, store.files.len());
                        checked += 1;
                        assert!(position > 1);
                    }
                }
            })
            .unwrap();

        assert_eq!(checked, 3);
        let store = fx.load_store();
        assert_eq!(store.files.len(), 3);
        assert_eq!(store.total_channels(), 1 + 2 + 4);
    }

    #[test]
    fn test_malformed_store_is_fatal() {
        let fx = Fixture::new();
        fs::write(fx.metadata_path(), "[1, 2").unwrap();
        let a = fx.input("a.acq");
        let decoder = StaticDecoder::new().with_recording(&a, good_recording(1));

        let err = BatchConverter::new(decoder, fx.config()).run(&[&a]).unwrap_err();
        assert!(matches!(
            err,
            BatchError::Store(AcqError::MalformedMetadata { .. })
        ));
        assert!(!fx.output.path().join("a_channel_0.bin").exists());
    }

    #[test]
    fn test_persist_failure_is_retried_with_next_file() {
        let fx = Fixture::new();
        // A directory where the temporary document goes blocks the first rewrite
        let blocker = fx.output.path().join("metadata.json.tmp");
        fs::create_dir(&blocker).unwrap();
        let a = fx.input("a.acq");
        let b = fx.input("b.acq");
        let decoder = StaticDecoder::new()
            .with_recording(&a, good_recording(1))
            .with_recording(&b, good_recording(1));

        let metadata_path = fx.metadata_path();
        let mut failures = 0;
        let summary = BatchConverter::new(decoder, fx.config())
            .run_with_progress(&[&a, &b], |event| {
                if let BatchEvent::PersistFailed { .. } = event {
                    failures += 1;
                    assert!(!metadata_path.exists());
                    fs::remove_dir(&blocker).unwrap();
                }
            })
            .unwrap();

        assert_eq!(failures, 1);
        assert_eq!(summary.converted, 2);
        let store = fx.load_store();
        assert_eq!(store.files.len(), 2);
        assert_eq!(store.total_files_processed, 2);
    }

    #[test]
    fn test_has_acq_extension() {
        assert!(has_acq_extension(Path::new("a.acq")));
        assert!(has_acq_extension(Path::new("dir/B.ACQ")));
        assert!(has_acq_extension(Path::new("c.Acq")));
        assert!(!has_acq_extension(Path::new("d.acq.bak")));
        assert!(!has_acq_extension(Path::new("acq")));
    }
}
