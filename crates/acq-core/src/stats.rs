//! Summary statistics over float32 channel data

use crate::error::{AcqError, AcqResult};
use serde::{Deserialize, Deserializer, Serialize};

/// Basic statistics for a converted channel
///
/// Computed over the samples as stored on disk (narrowed to `f32`), with the
/// accumulation carried out in `f64`. `std` is the population standard
/// deviation.
///
/// A `null` field in a stored document reads back as NaN.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelStats {
    #[serde(deserialize_with = "null_as_nan")]
    pub min: f64,
    #[serde(deserialize_with = "null_as_nan")]
    pub max: f64,
    #[serde(deserialize_with = "null_as_nan")]
    pub mean: f64,
    #[serde(deserialize_with = "null_as_nan")]
    pub std: f64,
}

impl ChannelStats {
    pub fn calculate(data: &[f32]) -> AcqResult<Self> {
        if data.is_empty() {
            return Err(AcqError::EmptySignal);
        }

        let n = data.len() as f64;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0f64;
        let mut has_nan = false;

        for &x in data {
            let x = f64::from(x);
            has_nan |= x.is_nan();
            min = min.min(x);
            max = max.max(x);
            sum += x;
        }

        let mean = sum / n;
        let variance = data
            .iter()
            .map(|&x| (f64::from(x) - mean).powi(2))
            .sum::<f64>()
            / n;
        let std = variance.sqrt();

        let stats = ChannelStats { min, max, mean, std };
        if has_nan || !stats.is_finite() {
            return Err(AcqError::NonFiniteStatistics);
        }
        Ok(stats)
    }

    fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.mean.is_finite() && self.std.is_finite()
    }
}

fn null_as_nan<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}
