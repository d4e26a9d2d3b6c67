//! Decoders turning an input file into a [`Recording`]
//!
//! Container parsing is not done here. [`CommandDecoder`] runs an external
//! program that prints the recording as JSON on stdout:
//!
//! ```json
//! {"channels": [null, {"name": "ECG", "units": "mV", "samples_per_second": 1000.0, "data": [0.1, 0.2]}]}
//! ```
//!
//! By default that program is a Python interpreter running a short bridge
//! over the `bioread` package.

use std::collections::HashMap;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use acq_core::Recording;
use thiserror::Error;
use tracing::debug;

use crate::config::DecoderConfig;

/// Bridge script passed to the interpreter with `-c`; the input path is `argv[1]`
///
/// Non-finite numbers are sent as `null`. A channel whose attributes cannot
/// be read becomes a `null` slot, with the reason on stderr.
pub const BIOREAD_BRIDGE: &str = r#"
import json, math, sys
import bioread

def number(x):
    if x is None:
        return None
    x = float(x)
    return x if math.isfinite(x) else None

def channel(i, c):
    if c is None:
        return None
    try:
        data = getattr(c, "data", None)
        name = getattr(c, "name", None)
        units = getattr(c, "units", None)
        return {
            "name": None if name is None else str(name),
            "units": None if units is None else str(units),
            "samples_per_second": number(getattr(c, "samples_per_second", None)),
            "data": None if data is None else [number(x) for x in data],
        }
    except Exception as e:
        print("channel %d unreadable: %s" % (i, e), file=sys.stderr)
        return None

recording = bioread.read_file(sys.argv[1])
channels = [channel(i, c) for i, c in enumerate(recording.channels)]
json.dump({"channels": channels}, sys.stdout, allow_nan=False)
"#;

/// Why a file could not be decoded
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The decoder program could not be started
    #[error("failed to launch decoder '{}': {source}", .program.display())]
    Launch {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The decoder ran and reported failure
    #[error("decoder exited with {status}: {reason}")]
    Failed { status: ExitStatus, reason: String },

    /// The decoder's output is not a recording document
    #[error("decoder produced an unreadable recording: {0}")]
    InvalidOutput(#[from] serde_json::Error),

    /// Failure reported by an in-process decoder
    #[error("{0}")]
    Rejected(String),
}

/// Anything able to decode an input path into a recording
pub trait Decoder {
    fn decode(&self, path: &Path) -> Result<Recording, DecodeError>;
}

/// Decoder delegating to an external program
#[derive(Debug, Clone)]
pub struct CommandDecoder {
    program: PathBuf,
    args: Vec<OsString>,
}

impl CommandDecoder {
    /// Run `program <input>`
    pub fn new(program: impl Into<PathBuf>) -> Self {
        CommandDecoder {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Run the bioread bridge through the given interpreter
    pub fn bioread(python: impl Into<PathBuf>) -> Self {
        Self::new(python).arg("-c").arg(BIOREAD_BRIDGE)
    }

    pub fn from_config(config: &DecoderConfig) -> Self {
        match config {
            DecoderConfig::Bioread { python } => Self::bioread(python),
            DecoderConfig::Command { program } => Self::new(program),
        }
    }

    /// Add an argument placed before the input path
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Decoder for CommandDecoder {
    fn decode(&self, path: &Path) -> Result<Recording, DecodeError> {
        debug!("decoding {} with {}", path.display(), self.program.display());

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| DecodeError::Launch {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(DecodeError::Failed {
                status: output.status,
                reason: failure_reason(&output.stderr),
            });
        }

        Ok(serde_json::from_slice(&output.stdout)?)
    }
}

/// Last non-empty stderr line, which for a Python traceback is the exception
fn failure_reason(stderr: &[u8]) -> String {
    String::from_utf8_lossy(stderr)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .map(str::to_owned)
        .unwrap_or_else(|| "no diagnostic output".to_owned())
}

/// In-memory decoder keyed by path, for driving conversions without files
/// in a real container format
#[derive(Debug, Clone, Default)]
pub struct StaticDecoder {
    entries: HashMap<PathBuf, Result<Recording, String>>,
}

impl StaticDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `path` to `recording`
    pub fn with_recording(mut self, path: impl Into<PathBuf>, recording: Recording) -> Self {
        self.entries.insert(path.into(), Ok(recording));
        self
    }

    /// Fail decoding `path` with `reason`
    pub fn with_failure(mut self, path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        self.entries.insert(path.into(), Err(reason.into()));
        self
    }
}

impl Decoder for StaticDecoder {
    fn decode(&self, path: &Path) -> Result<Recording, DecodeError> {
        match self.entries.get(path) {
            Some(Ok(recording)) => Ok(recording.clone()),
            Some(Err(reason)) => Err(DecodeError::Rejected(reason.clone())),
            None => Err(DecodeError::Rejected(format!(
                "no recording registered for {}",
                path.display()
            ))),
        }
    }
}
