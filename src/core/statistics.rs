//! Window statistics: baseline, variability and the display median filter.

use crate::error::AnalysisError;
use statrs::statistics::{Data, Median, Statistics};

/// Baseline FHR: the median of the window.
///
/// Returns `InsufficientData` for windows shorter than `min_len` and
/// `InvalidWindow` when the window holds a non-finite value.
pub fn baseline(fhr: &[f64], min_len: usize) -> Result<f64, AnalysisError> {
    ensure_usable(fhr, min_len)?;
    Ok(Data::new(fhr.to_vec()).median())
}

/// Variability: population standard deviation of the window.
pub fn variability(fhr: &[f64], min_len: usize) -> Result<f64, AnalysisError> {
    ensure_usable(fhr, min_len)?;
    Ok(fhr.iter().population_std_dev())
}

fn ensure_usable(values: &[f64], min_len: usize) -> Result<(), AnalysisError> {
    if values.is_empty() || values.len() < min_len {
        return Err(AnalysisError::InsufficientData {
            len: values.len(),
            min: min_len.max(1),
        });
    }
    if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
        return Err(AnalysisError::InvalidWindow(format!(
            "non-finite value {} at offset {}",
            values[pos], pos
        )));
    }
    Ok(())
}

/// Median filter with an odd kernel and zero padding past both edges.
///
/// Even kernels are widened by one.
pub fn median_filter(values: &[f64], kernel: usize) -> Vec<f64> {
    let kernel = if kernel % 2 == 0 { kernel + 1 } else { kernel };
    let half = kernel / 2;
    let mut buf = Vec::with_capacity(kernel);

    (0..values.len())
        .map(|i| {
            buf.clear();
            for k in 0..kernel {
                let offset = i + k;
                let value = if offset < half || offset - half >= values.len() {
                    0.0
                } else {
                    values[offset - half]
                };
                buf.push(value);
            }
            buf.sort_by(|a, b| a.total_cmp(b));
            buf[half]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_is_median() {
        let fhr = [150.0, 130.0, 140.0, 160.0, 120.0];
        assert!((baseline(&fhr, 1).unwrap() - 140.0).abs() < 1e-9);

        let even = [130.0, 140.0, 150.0, 160.0];
        assert!((baseline(&even, 1).unwrap() - 145.0).abs() < 1e-9);
    }

    #[test]
    fn test_variability_is_population_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((variability(&values, 1).unwrap() - 2.0).abs() < 1e-9);

        let flat = vec![140.0; 60];
        assert_eq!(variability(&flat, 50).unwrap(), 0.0);
    }

    #[test]
    fn test_short_window_rejected() {
        let fhr = vec![140.0; 49];
        assert_eq!(
            baseline(&fhr, 50),
            Err(AnalysisError::InsufficientData { len: 49, min: 50 })
        );
        assert!(matches!(
            variability(&[], 0),
            Err(AnalysisError::InsufficientData { len: 0, .. })
        ));
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut fhr = vec![140.0; 60];
        fhr[7] = f64::NAN;
        assert!(matches!(
            baseline(&fhr, 50),
            Err(AnalysisError::InvalidWindow(_))
        ));
    }

    #[test]
    fn test_median_filter_zero_padded() {
        let filtered = median_filter(&[140.0, 141.0, 180.0, 142.0, 143.0], 5);
        // Edges see two padding zeros.
        assert_eq!(filtered, vec![140.0, 141.0, 142.0, 142.0, 142.0]);

        let short = median_filter(&[140.0, 150.0], 5);
        assert_eq!(short, vec![0.0, 0.0]);
        assert!(median_filter(&[], 5).is_empty());
    }
}
