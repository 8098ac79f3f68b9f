//! Sample and window types for a two-channel CTG recording.

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A single reading of both channels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Seconds from the start of the recording
    pub time: f64,
    /// Fetal heart rate (bpm)
    pub fhr: f64,
    /// Uterine contraction intensity
    pub uc: f64,
}

impl Sample {
    pub fn new(time: f64, fhr: f64, uc: f64) -> Self {
        Self { time, fhr, uc }
    }
}

/// The full, immutable recording of one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleSeries {
    samples: Vec<Sample>,
    /// Nominal sampling rate (Hz)
    sampling_rate_hz: f64,
}

impl SampleSeries {
    /// Wrap an already time-ordered list of samples.
    pub fn new(samples: Vec<Sample>, sampling_rate_hz: f64) -> Self {
        Self {
            samples,
            sampling_rate_hz,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sampling_rate_hz(&self) -> f64 {
        self.sampling_rate_hz
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Time of the last sample, or 0 for an empty recording.
    pub fn total_duration(&self) -> f64 {
        self.samples.last().map(|s| s.time).unwrap_or(0.0)
    }

    /// Borrow `[range.start, range.end)`, clamped to the recording.
    pub fn window(&self, range: Range<usize>) -> Window<'_> {
        let end = range.end.min(self.samples.len());
        let start = range.start.min(end);
        Window {
            start,
            end,
            samples: &self.samples[start..end],
        }
    }

    /// Index of the sample whose time is closest to `target`.
    ///
    /// Ties resolve to the lower index. Targets outside the recording clamp
    /// to the first or last sample.
    pub fn nearest_index(&self, target: f64) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (idx, sample) in self.samples.iter().enumerate() {
            let distance = (sample.time - target).abs();
            match best {
                Some((_, d)) if distance >= d => {}
                _ => best = Some((idx, distance)),
            }
        }
        best.map(|(idx, _)| idx)
    }
}

/// A contiguous slice of the recording, `[start, end)` in sample indices.
#[derive(Debug, Clone, Copy)]
pub struct Window<'a> {
    pub start: usize,
    pub end: usize,
    pub samples: &'a [Sample],
}

impl<'a> Window<'a> {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn fhr(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.fhr).collect()
    }

    pub fn uc(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.uc).collect()
    }

    pub fn times(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.time).collect()
    }

    /// Time of the last sample in the window.
    pub fn end_time(&self) -> Option<f64> {
        self.samples.last().map(|s| s.time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(times: &[f64]) -> SampleSeries {
        SampleSeries::new(
            times.iter().map(|&t| Sample::new(t, 140.0, 10.0)).collect(),
            4.0,
        )
    }

    #[test]
    fn test_window_is_clamped() {
        let s = series(&[0.0, 0.25, 0.5, 0.75]);
        let w = s.window(2..10);
        assert_eq!(w.start, 2);
        assert_eq!(w.end, 4);
        assert_eq!(w.len(), 2);
        assert_eq!(w.end_time(), Some(0.75));

        let empty = s.window(8..10);
        assert!(empty.is_empty());
    }

    #[test]
    fn test_nearest_index_ties_go_low() {
        let s = series(&[0.0, 1.0, 2.0, 3.0]);
        assert_eq!(s.nearest_index(1.5), Some(1));
        assert_eq!(s.nearest_index(1.6), Some(2));
        assert_eq!(s.nearest_index(-10.0), Some(0));
        assert_eq!(s.nearest_index(99.0), Some(3));
    }

    #[test]
    fn test_empty_series() {
        let s = series(&[]);
        assert_eq!(s.total_duration(), 0.0);
        assert_eq!(s.nearest_index(3.0), None);
    }
}
