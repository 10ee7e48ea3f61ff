//! Counter Aggregation
//!
//! Turns a raw counter series, a time range and an aggregation policy
//! into a numeric series, downsampled to at most the requested number of
//! points.
//!
//! # Pipeline
//!
//! ```text
//! key + range -> resolve bounds -> read buckets -> group -> reduce
//! ```
//!
//! The function is pure with respect to a store snapshot: identical
//! inputs against an unchanged store yield identical output.

use crate::metrics::error::MetricError;
use crate::metrics::types::{Reduction, TimeRange};
use crate::store::{CiStore, CounterSample};

/// Aggregate a counter series into at most `max_points` values.
///
/// Open range bounds are tolerated here and resolved internally (epoch 0
/// and "now"). Without `max_points` the result has one value per
/// recorded bucket, in bucket order; unrecorded buckets are skipped, not
/// emitted as zero. With `max_points = k` and more than `k` buckets in
/// range, contiguous buckets are merged into `k` groups and `reduction`
/// is applied within each group.
///
/// An empty range or unknown key yields an empty series, not an error.
pub async fn aggregate(
    store: &dyn CiStore,
    key: &str,
    range: TimeRange,
    max_points: Option<usize>,
    reduction: Reduction,
) -> Result<Vec<f64>, MetricError> {
    if max_points == Some(0) {
        return Err(MetricError::InvalidMaxPoints);
    }

    let window = range.resolve();
    let samples = store.read_counter(key, window).await?;

    match max_points {
        Some(k) if samples.len() > k => Ok(downsample(&samples, k, reduction)),
        _ => Ok(samples.iter().filter_map(|s| s.value).collect()),
    }
}

/// Merge contiguous buckets into `k` groups and reduce each group.
///
/// Group sizing is floor division with the remainder folded into the
/// final group: 10 buckets at k = 4 become groups of 2, 2, 2 and 4.
/// Buckets with no recorded value are skipped inside a group (an average
/// never counts them as zero); a group with no recorded value at all is
/// dropped from the output.
fn downsample(samples: &[CounterSample], k: usize, reduction: Reduction) -> Vec<f64> {
    let size = samples.len() / k;
    let mut series = Vec::with_capacity(k);

    for i in 0..k {
        let start = i * size;
        let end = if i == k - 1 { samples.len() } else { start + size };

        let recorded: Vec<f64> = samples[start..end].iter().filter_map(|s| s.value).collect();
        if recorded.is_empty() {
            continue;
        }
        if let Some(value) = reduction.apply(&recorded) {
            series.push(value);
        }
    }

    series
}
