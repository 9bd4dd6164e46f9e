//! Inverse-squared-accuracy weighted position estimate.
//!
//! Stateless over the sample list: recomputing after every new sample gives
//! the same answer as one call on the final list.

use coordkit_traits::LocationFix;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeightedPosition {
    pub latitude: f64,
    pub longitude: f64,
}

/// Weight of a sample: `1 / accuracy²`. NaN accuracy yields NaN.
#[inline]
pub fn weight(accuracy: f64) -> f64 {
    1.0 / (accuracy * accuracy)
}

/// Admission filter for raw fixes. NaN accuracy is never admitted.
#[inline]
pub fn admits(accuracy: f64, max_accuracy_m: f64) -> bool {
    accuracy <= max_accuracy_m
}

/// Samples whose weight overflows to infinity (accuracy 0 or vanishingly small).
fn is_exact(accuracy: f64) -> bool {
    !accuracy.is_nan() && !weight(accuracy).is_finite()
}

/// Weighted mean of `samples`, or `None` when there is nothing to weigh.
///
/// Samples with infinite weight dominate: if any exist the result is the
/// plain mean of those samples. NaN accuracies are skipped. The mean is
/// accumulated as offsets from the first weighed sample, so identical
/// inputs come back unchanged.
pub fn compute_weighted_average(samples: &[LocationFix]) -> Option<WeightedPosition> {
    let exact: Vec<&LocationFix> = samples.iter().filter(|s| is_exact(s.accuracy)).collect();
    if let Some(first) = exact.first() {
        #[allow(clippy::cast_precision_loss)]
        let n = exact.len() as f64;
        let dlat = exact.iter().map(|s| s.latitude - first.latitude).sum::<f64>() / n;
        let dlon = exact.iter().map(|s| s.longitude - first.longitude).sum::<f64>() / n;
        return Some(WeightedPosition {
            latitude: first.latitude + dlat,
            longitude: first.longitude + dlon,
        });
    }

    let mut weighed = samples
        .iter()
        .map(|s| (s, weight(s.accuracy)))
        .filter(|(_, w)| w.is_finite() && *w > 0.0);
    let (origin, w0) = weighed.next()?;
    let mut total = w0;
    let mut dlat = 0.0;
    let mut dlon = 0.0;
    for (s, w) in weighed {
        total += w;
        dlat = (s.latitude - origin.latitude).mul_add(w, dlat);
        dlon = (s.longitude - origin.longitude).mul_add(w, dlon);
    }
    Some(WeightedPosition {
        latitude: origin.latitude + dlat / total,
        longitude: origin.longitude + dlon / total,
    })
}
