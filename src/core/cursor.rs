//! Read cursor over a session's recording.

use crate::error::AnalysisError;
use crate::record::types::SampleSeries;
use std::ops::Range;
use std::sync::Arc;

/// Outcome of advancing the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// Sample range handed out by this step
    Chunk(Range<usize>),
    EndOfStream,
}

/// Tracks the read position over a shared, immutable recording.
#[derive(Debug, Clone)]
pub struct StreamCursor {
    series: Arc<SampleSeries>,
    position: usize,
    chunk_size: usize,
}

impl StreamCursor {
    /// Create a cursor at position 0. A zero chunk size is raised to 1.
    pub fn new(series: Arc<SampleSeries>, chunk_size: usize) -> Self {
        Self {
            series,
            position: 0,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn total_duration(&self) -> f64 {
        self.series.total_duration()
    }

    pub fn series(&self) -> &SampleSeries {
        &self.series
    }

    pub fn is_finished(&self) -> bool {
        self.position >= self.series.len()
    }

    /// Hand out the next chunk and move past it.
    ///
    /// The last chunk may be shorter than `chunk_size`; the position still
    /// moves by a full chunk.
    pub fn advance(&mut self) -> Advance {
        if self.is_finished() {
            return Advance::EndOfStream;
        }
        let start = self.position;
        let end = (start + self.chunk_size).min(self.series.len());
        self.position += self.chunk_size;
        Advance::Chunk(start..end)
    }

    /// Move to the sample closest in time to `target_time`.
    ///
    /// Targets outside the recording clamp to its first or last sample.
    pub fn jump(&mut self, target_time: f64) -> Result<usize, AnalysisError> {
        let idx = self
            .series
            .nearest_index(target_time)
            .ok_or(AnalysisError::EmptySequence)?;
        self.position = idx;
        Ok(idx)
    }

    /// Move back to the start of the recording.
    pub fn reset(&mut self) -> Result<(), AnalysisError> {
        if self.series.is_empty() {
            return Err(AnalysisError::EmptySequence);
        }
        self.position = 0;
        Ok(())
    }

    /// The `len` samples preceding the cursor, clamped to the recording.
    pub fn trailing(&self, len: usize) -> Range<usize> {
        let end = self.position.min(self.series.len());
        end.saturating_sub(len)..end
    }

    /// Progress through the recording as a percentage, rounded to one decimal.
    pub fn progress(&self) -> f64 {
        if self.series.is_empty() {
            return 100.0;
        }
        round1(self.position as f64 / self.series.len() as f64 * 100.0)
    }

    /// Playback time implied by the cursor position.
    pub fn current_time(&self) -> f64 {
        if self.series.is_empty() {
            return 0.0;
        }
        self.position as f64 / self.series.len() as f64 * self.series.total_duration()
    }
}

/// Round to one decimal place, halves away from zero.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::types::Sample;

    fn cursor(len: usize, chunk: usize) -> StreamCursor {
        let samples = (0..len)
            .map(|i| Sample::new(i as f64 * 0.25, 140.0, 10.0))
            .collect();
        StreamCursor::new(Arc::new(SampleSeries::new(samples, 4.0)), chunk)
    }

    #[test]
    fn test_advance_until_end() {
        let mut c = cursor(12, 5);
        assert_eq!(c.advance(), Advance::Chunk(0..5));
        assert_eq!(c.advance(), Advance::Chunk(5..10));
        assert_eq!(c.advance(), Advance::Chunk(10..12));
        assert_eq!(c.position(), 15);
        assert_eq!(c.advance(), Advance::EndOfStream);
        assert_eq!(c.position(), 15);
    }

    #[test]
    fn test_advance_is_monotonic() {
        let mut c = cursor(100, 7);
        let mut last = c.position();
        for _ in 0..30 {
            c.advance();
            assert!(c.position() >= last);
            last = c.position();
        }
    }

    #[test]
    fn test_jump_is_idempotent_and_clamped() {
        let mut c = cursor(40, 5);
        assert_eq!(c.jump(2.1).unwrap(), 8);
        assert_eq!(c.jump(2.1).unwrap(), 8);
        assert_eq!(c.position(), 8);

        // Exactly between samples 8 (2.0 s) and 9 (2.25 s) goes low.
        assert_eq!(c.jump(2.125).unwrap(), 8);
        assert_eq!(c.jump(-5.0).unwrap(), 0);
        assert_eq!(c.jump(1e6).unwrap(), 39);
    }

    #[test]
    fn test_reset() {
        let mut c = cursor(40, 5);
        c.advance();
        c.advance();
        c.reset().unwrap();
        assert_eq!(c.position(), 0);
    }

    #[test]
    fn test_empty_recording() {
        let mut c = cursor(0, 5);
        assert_eq!(c.advance(), Advance::EndOfStream);
        assert_eq!(c.jump(1.0), Err(AnalysisError::EmptySequence));
        assert_eq!(c.reset(), Err(AnalysisError::EmptySequence));
        assert_eq!(c.progress(), 100.0);
    }

    #[test]
    fn test_trailing_window() {
        let mut c = cursor(1000, 5);
        assert_eq!(c.trailing(300), 0..0);
        for _ in 0..20 {
            c.advance();
        }
        assert_eq!(c.trailing(300), 0..100);
        c.jump(200.0).unwrap();
        assert_eq!(c.trailing(300), 500..800);
    }

    #[test]
    fn test_progress_and_time() {
        let mut c = cursor(8, 3);
        c.advance();
        assert_eq!(c.progress(), 37.5);
        // 3 of 8 samples through a 1.75 s recording.
        assert!((c.current_time() - 0.65625).abs() < 1e-12);
        assert_eq!(round1(0.65625), 0.7);
    }
}
