use serde::{Deserialize, Serialize};

use crate::errors::PipelineError;

/// Values folded into an edge bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierFold {
    pub count: usize,
    /// True extremes of the folded values, for labelling.
    pub min: f64,
    pub max: f64,
}

/// Fixed-width histogram whose edge bins absorb clipped outliers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub lower: f64,
    pub upper: f64,
    /// `bins + 1` edges from `lower` to `upper`.
    pub edges: Vec<f64>,
    /// Per-bin counts, folded outliers included.
    pub counts: Vec<usize>,
    pub lower_outliers: Option<OutlierFold>,
    pub upper_outliers: Option<OutlierFold>,
}

impl Histogram {
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

/// Build a histogram over `[lower, upper]` and fold values outside the clip
/// bounds into the first/last bin.
///
/// A bound that is absent or lies beyond the data falls back to the data
/// extreme and folds nothing. Non-finite values are ignored.
pub fn outlier_aware_histogram(
    data: &[f64],
    lower: Option<f64>,
    upper: Option<f64>,
    bins: usize,
) -> Result<Histogram, PipelineError> {
    if bins == 0 {
        return Err(PipelineError::InvalidHistogram("bin count must be at least 1".into()));
    }
    let values: Vec<f64> = data.iter().copied().filter(|v| v.is_finite()).collect();
    if values.is_empty() {
        return Err(PipelineError::InvalidHistogram("no finite values".into()));
    }

    let data_min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let data_max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let (clip_lo, clip_low) = match lower {
        Some(l) if l.is_finite() && l >= data_min => (l, true),
        _ => (data_min, false),
    };
    let (clip_hi, clip_high) = match upper {
        Some(u) if u.is_finite() && u <= data_max => (u, true),
        _ => (data_max, false),
    };
    if clip_lo > clip_hi {
        return Err(PipelineError::InvalidHistogram(format!(
            "lower bound {clip_lo} exceeds upper bound {clip_hi}"
        )));
    }
    // Only the bin edges are widened; folding still uses the clip bounds.
    let (lo, hi) = if clip_lo == clip_hi {
        (clip_lo - 0.5, clip_hi + 0.5)
    } else {
        (clip_lo, clip_hi)
    };

    let width = (hi - lo) / bins as f64;
    let edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64).collect();
    let mut counts = vec![0usize; bins];
    let mut below = Vec::new();
    let mut above = Vec::new();

    for &v in &values {
        if clip_low && v < clip_lo {
            below.push(v);
        } else if clip_high && v > clip_hi {
            above.push(v);
        } else {
            // the top edge is inclusive
            let idx = (((v - lo) / width) as usize).min(bins - 1);
            counts[idx] += 1;
        }
    }

    let lower_outliers = fold(&below);
    let upper_outliers = fold(&above);
    if let Some(f) = &lower_outliers {
        counts[0] += f.count;
    }
    if let Some(f) = &upper_outliers {
        counts[bins - 1] += f.count;
    }

    Ok(Histogram {
        lower: lo,
        upper: hi,
        edges,
        counts,
        lower_outliers,
        upper_outliers,
    })
}

fn fold(values: &[f64]) -> Option<OutlierFold> {
    if values.is_empty() {
        return None;
    }
    Some(OutlierFold {
        count: values.len(),
        min: values.iter().copied().fold(f64::INFINITY, f64::min),
        max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upper_outlier_folds_into_last_bin() {
        let h = outlier_aware_histogram(&[1.0, 2.0, 3.0, 100.0], None, Some(10.0), 50).unwrap();
        let fold = h.upper_outliers.as_ref().unwrap();
        assert_eq!(fold.count, 1);
        assert_eq!(fold.max, 100.0);
        assert_eq!(h.counts[49], 1);
        assert_eq!(h.total(), 4);
        assert_eq!(h.upper, 10.0);
        assert!(h.lower_outliers.is_none());
    }

    #[test]
    fn test_lower_outliers_record_true_min() {
        let h = outlier_aware_histogram(&[-50.0, -20.0, 0.0, 1.0, 2.0], Some(-1.0), None, 3).unwrap();
        let fold = h.lower_outliers.as_ref().unwrap();
        assert_eq!(fold.count, 2);
        assert_eq!(fold.min, -50.0);
        assert_eq!(fold.max, -20.0);
        assert_eq!(h.counts[0], 3);
        assert_eq!(h.total(), 5);
    }

    #[test]
    fn test_bounds_outside_data_fall_back() {
        let h = outlier_aware_histogram(&[1.0, 2.0, 3.0], Some(-10.0), Some(10.0), 2).unwrap();
        assert_eq!(h.lower, 1.0);
        assert_eq!(h.upper, 3.0);
        assert!(h.lower_outliers.is_none());
        assert!(h.upper_outliers.is_none());
        assert_eq!(h.counts, vec![1, 2]);
        assert_eq!(h.edges, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_constant_data() {
        let h = outlier_aware_histogram(&[4.0, 4.0], None, None, 4).unwrap();
        assert_eq!(h.total(), 2);
        assert_eq!(h.lower, 3.5);
    }

    #[test]
    fn test_equal_bounds_fold_against_caller_bounds() {
        let h = outlier_aware_histogram(&[2.8, 3.0, 100.0], Some(3.0), Some(3.0), 4).unwrap();
        assert_eq!(h.lower, 2.5);
        assert_eq!(h.upper, 3.5);
        let low = h.lower_outliers.as_ref().unwrap();
        assert_eq!(low.count, 1);
        assert_eq!(low.min, 2.8);
        let high = h.upper_outliers.as_ref().unwrap();
        assert_eq!(high.count, 1);
        assert_eq!(high.max, 100.0);
        // 3.0 sits in bin 2 of [2.5, 2.75, 3.0, 3.25, 3.5]
        assert_eq!(h.counts, vec![1, 0, 1, 1]);
        assert_eq!(h.total(), 3);
    }

    #[test]
    fn test_invalid_input() {
        assert!(outlier_aware_histogram(&[], None, None, 10).is_err());
        assert!(outlier_aware_histogram(&[1.0], None, None, 0).is_err());
        assert!(outlier_aware_histogram(&[1.0, 5.0], Some(4.0), Some(2.0), 10).is_err());
    }
}
