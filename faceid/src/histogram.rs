//! Offline distance histogram for tuning `eps`.
//!
//! Not part of the clustering path: it only reads encodings.

use crate::encoding::check_population;
use crate::{FaceIdError, Metric};

/// Distribution of pairwise distances over a set of encodings.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceHistogram {
    pub min: f64,
    pub max: f64,
    /// Pair counts per equal-width bin over `[min, max]`.
    pub bins: Vec<usize>,
    pub pairs: usize,
}

impl DistanceHistogram {
    /// Lower and upper edge of bin `i`.
    pub fn bin_range(&self, i: usize) -> (f64, f64) {
        let width = self.bin_width();
        let lo = self.min + width * i as f64;
        (lo, lo + width)
    }

    fn bin_width(&self) -> f64 {
        if self.bins.is_empty() {
            return 0.0;
        }
        (self.max - self.min) / self.bins.len() as f64
    }
}

/// Computes the histogram of all pairwise distances.
///
/// Returns `None` when there are fewer than two points.
pub fn distance_histogram(
    points: &[&[f64]],
    metric: Metric,
    bins: usize,
) -> Result<Option<DistanceHistogram>, FaceIdError> {
    if bins == 0 {
        return Err(FaceIdError::InvalidConfig("bins must be at least 1".into()));
    }
    check_population(points)?;
    if points.len() < 2 {
        return Ok(None);
    }

    let mut distances = Vec::with_capacity(points.len() * (points.len() - 1) / 2);
    for i in 0..points.len() {
        for j in (i + 1)..points.len() {
            distances.push(metric.distance(points[i], points[j]));
        }
    }

    let min = distances.iter().copied().fold(f64::INFINITY, f64::min);
    let max = distances.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut counts = vec![0usize; bins];
    let span = max - min;
    for d in &distances {
        let idx = if span == 0.0 {
            0
        } else {
            (((d - min) / span) * bins as f64) as usize
        };
        counts[idx.min(bins - 1)] += 1;
    }

    Ok(Some(DistanceHistogram {
        min,
        max,
        bins: counts,
        pairs: distances.len(),
    }))
}
