//! Recording: decoded channels as handed over by a decoder

use crate::error::{AcqError, AcqResult};
use serde::{Deserialize, Deserializer, Serialize};

/// A decoded multi-channel recording
///
/// Slots keep the decoder's channel order. A `None` slot stands for a channel
/// reference the decoder could not provide; it still counts towards
/// [`Recording::channel_count`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Recording {
    /// Channel slots in acquisition order
    #[serde(default)]
    pub channels: Vec<Option<Channel>>,
}

impl Recording {
    /// Create recording from channel slots
    pub fn new(channels: Vec<Option<Channel>>) -> Self {
        Recording { channels }
    }

    /// Number of channel slots, including absent ones
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Iterate over slots with their original position
    pub fn slots(&self) -> impl Iterator<Item = (usize, Option<&Channel>)> {
        self.channels.iter().enumerate().map(|(i, c)| (i, c.as_ref()))
    }
}

/// One named time series within a recording
///
/// Every field except `name` may be missing in what the decoder produced;
/// [`Channel::validate`] decides whether the channel can be converted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    /// Channel label, possibly empty
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    /// Physical units
    #[serde(default)]
    pub units: Option<String>,
    /// Samples per second
    #[serde(default, alias = "samples_per_second")]
    pub sample_rate: Option<f64>,
    /// Sample values; a `null` element reads as NaN
    #[serde(default, alias = "data", deserialize_with = "nullable_samples")]
    pub samples: Option<Vec<f64>>,
}

/// Borrowed view of a channel that passed validation
#[derive(Debug, Clone, Copy)]
pub struct ValidChannel<'a> {
    pub name: &'a str,
    pub units: Option<&'a str>,
    pub sample_rate: f64,
    pub samples: &'a [f64],
}

impl Channel {
    /// Create a fully populated channel
    pub fn new(
        name: impl Into<String>,
        units: Option<&str>,
        sample_rate: f64,
        samples: Vec<f64>,
    ) -> Self {
        Channel {
            name: name.into(),
            units: units.map(str::to_owned),
            sample_rate: Some(sample_rate),
            samples: Some(samples),
        }
    }

    /// Check sample data and sample rate
    ///
    /// Samples are checked first, so a channel missing both reports
    /// [`AcqError::MissingSamples`].
    pub fn validate(&self) -> AcqResult<ValidChannel<'_>> {
        let samples = self.samples.as_deref().ok_or(AcqError::MissingSamples)?;
        let sample_rate = self.sample_rate.ok_or(AcqError::MissingSampleRate)?;
        Self::validate_sampling_rate(sample_rate)?;

        Ok(ValidChannel {
            name: &self.name,
            units: self.units.as_deref(),
            sample_rate,
            samples,
        })
    }

    /// Reject zero, negative and NaN rates
    pub fn validate_sampling_rate(rate: f64) -> AcqResult<()> {
        // NaN fails the comparison too
        if rate > 0.0 {
            Ok(())
        } else {
            Err(AcqError::InvalidSamplingRate { rate })
        }
    }
}

impl ValidChannel<'_> {
    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Signal duration in seconds
    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate
    }
}

pub(crate) fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// JSON has no NaN or infinity; decoders send `null` for such samples
fn nullable_samples<'de, D>(deserializer: D) -> Result<Option<Vec<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    let samples = Option::<Vec<Option<f64>>>::deserialize(deserializer)?;
    Ok(samples.map(|values| {
        values
            .into_iter()
            .map(|x| x.unwrap_or(f64::NAN))
            .collect()
    }))
}
