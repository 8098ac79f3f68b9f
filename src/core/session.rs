//! Streaming analysis session.
//!
//! A session owns one recording, its read cursor and its flag set. Every
//! public operation is one indivisible step against that state; sharing a
//! session between tasks goes through [`SharedSession`], which serializes
//! steps behind a mutex.

use crate::config::Config;
use crate::core::classifier::{classify, Category, ClassificationResult, Severity};
use crate::core::cursor::{round1, Advance, StreamCursor};
use crate::core::events::{DetectorConfig, EventDetector};
use crate::core::flags::{Flag, FlagAnnotator, FlagPolicy};
use crate::core::statistics;
use crate::error::AnalysisError;
use crate::record::types::SampleSeries;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// Kernel of the display median filter applied to streamed FHR.
pub const DISPLAY_FILTER_KERNEL: usize = 5;

/// Window sizing for analysis ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSettings {
    /// Samples of history analysed per tick
    pub trailing_samples: usize,
    /// Ticks with less history report no metrics
    pub min_samples: usize,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            trailing_samples: 300,
            min_samples: 50,
        }
    }
}

/// Everything needed to build a session over a recording.
#[derive(Debug, Clone, Default)]
pub struct SessionSettings {
    pub chunk_size: usize,
    pub window: WindowSettings,
    pub flags: FlagPolicy,
    pub detector: DetectorConfig,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            chunk_size: config.chunk_size,
            window: WindowSettings {
                trailing_samples: config.trailing_window_samples,
                min_samples: config.min_window_samples,
            },
            flags: config.flags.clone(),
            detector: config.detector.clone(),
        }
    }
}

/// One streamed chunk of the recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamChunk {
    pub finished: bool,
    /// Percentage of the recording streamed before this chunk
    pub progress: f64,
    pub time: Vec<f64>,
    pub raw_fhr: Vec<f64>,
    pub filtered_fhr: Vec<f64>,
    pub uc_signal: Vec<f64>,
}

impl StreamChunk {
    fn finished() -> Self {
        Self {
            finished: true,
            progress: 100.0,
            time: Vec::new(),
            raw_fhr: Vec::new(),
            filtered_fhr: Vec::new(),
            uc_signal: Vec::new(),
        }
    }
}

/// Result of one analysis tick.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutcome {
    /// Absent until enough history has been streamed
    pub metrics: Option<ClassificationResult>,
    pub flags: Vec<Flag>,
}

/// One row of the flag report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub start_time: f64,
    pub end_time: f64,
    #[serde(rename = "duration_sec")]
    pub duration: f64,
    #[serde(rename = "ctg_category")]
    pub category: Category,
    pub condition: String,
    /// Upper-cased severity
    pub severity: String,
    #[serde(rename = "clinical_notes")]
    pub rationale: String,
}

impl ReportEntry {
    fn from_flag(flag: &Flag) -> Self {
        Self {
            start_time: round1(flag.start),
            end_time: round1(flag.end),
            duration: round1(flag.end - flag.start),
            category: flag.category,
            condition: flag.status.clone(),
            severity: flag.severity.as_str().to_uppercase(),
            rationale: flag.rationale.clone(),
        }
    }
}

/// Full flag set plus the recording length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagListing {
    pub flags: Vec<Flag>,
    pub total_duration: f64,
}

/// A single streaming analysis session.
#[derive(Debug)]
pub struct AnalysisSession {
    id: Uuid,
    cursor: StreamCursor,
    annotator: FlagAnnotator,
    detector: EventDetector,
    window: WindowSettings,
}

impl AnalysisSession {
    /// Create a session at position 0 with no flags.
    ///
    /// The detector runs at the recording's own sampling rate; the rate in
    /// `settings.detector` is only used when the recording's is unusable.
    pub fn new(series: Arc<SampleSeries>, mut settings: SessionSettings) -> Self {
        let id = Uuid::new_v4();
        let rate = series.sampling_rate_hz();
        if rate.is_finite() && rate > 0.0 {
            settings.detector.sampling_rate_hz = rate;
        } else {
            tracing::warn!(
                session = %id,
                rate,
                fallback = settings.detector.sampling_rate_hz,
                "Recording has no usable sampling rate"
            );
        }
        tracing::info!(
            session = %id,
            samples = series.len(),
            duration_secs = series.total_duration(),
            sampling_rate_hz = settings.detector.sampling_rate_hz,
            "Session created"
        );
        Self {
            id,
            cursor: StreamCursor::new(series, settings.chunk_size),
            annotator: FlagAnnotator::new(settings.flags),
            detector: EventDetector::new(settings.detector),
            window: settings.window,
        }
    }

    pub fn cursor(&self) -> &StreamCursor {
        &self.cursor
    }

    pub fn flags(&self) -> &[Flag] {
        self.annotator.flags()
    }

    /// Hand out the next chunk with its display-filtered FHR.
    pub fn advance_and_report(&mut self) -> StreamChunk {
        let progress = self.cursor.progress();
        let range = match self.cursor.advance() {
            Advance::Chunk(range) => range,
            Advance::EndOfStream => return StreamChunk::finished(),
        };

        let window = self.cursor.series().window(range);
        let raw_fhr = window.fhr();
        StreamChunk {
            finished: false,
            progress,
            time: window.times(),
            filtered_fhr: statistics::median_filter(&raw_fhr, DISPLAY_FILTER_KERNEL),
            raw_fhr,
            uc_signal: window.uc(),
        }
    }

    /// Classify the trailing window and fold the result into the flag set.
    pub fn analyze(&mut self) -> Result<AnalysisOutcome, AnalysisError> {
        let range = self.cursor.trailing(self.window.trailing_samples);
        let window = self.cursor.series().window(range);

        let (current_time, metrics) = match window.end_time() {
            Some(t) if window.len() >= self.window.min_samples => {
                let fhr = window.fhr();
                let uc = window.uc();
                (t, Some(classify_window(&self.detector, &fhr, &uc, self.window.min_samples)?))
            }
            _ => {
                tracing::debug!(
                    samples = window.len(),
                    min = self.window.min_samples,
                    "Not enough history for metrics yet"
                );
                return Ok(AnalysisOutcome {
                    metrics: None,
                    flags: self.annotator.flags().to_vec(),
                });
            }
        };

        let flags = self
            .annotator
            .apply(current_time, metrics.as_ref())
            .to_vec();
        Ok(AnalysisOutcome { metrics, flags })
    }

    /// Flags that have started by the current playback time, rounded for display.
    pub fn report(&self) -> Vec<ReportEntry> {
        let now = self.cursor.current_time();
        self.annotator
            .flags()
            .iter()
            .filter(|flag| flag.start <= now)
            .map(ReportEntry::from_flag)
            .collect()
    }

    pub fn list_flags(&self) -> FlagListing {
        FlagListing {
            flags: self.annotator.flags().to_vec(),
            total_duration: self.cursor.total_duration(),
        }
    }

    /// Reposition the cursor to the sample nearest `target_time`.
    pub fn jump(&mut self, target_time: f64) -> Result<(), AnalysisError> {
        let idx = self.cursor.jump(target_time)?;
        tracing::info!(session = %self.id, target_time, position = idx, "Jumped");
        Ok(())
    }

    /// Rewind to the start and drop every flag.
    pub fn reset(&mut self) -> Result<(), AnalysisError> {
        self.cursor.reset()?;
        self.annotator.clear();
        tracing::info!(session = %self.id, "Session reset");
        Ok(())
    }
}

/// Run statistics, detection and classification over one window.
pub fn classify_window(
    detector: &EventDetector,
    fhr: &[f64],
    uc: &[f64],
    min_samples: usize,
) -> Result<ClassificationResult, AnalysisError> {
    let baseline = statistics::baseline(fhr, min_samples)?;
    let variability = statistics::variability(fhr, min_samples)?;
    if let Some(pos) = uc.iter().position(|v| !v.is_finite()) {
        return Err(AnalysisError::InvalidWindow(format!(
            "non-finite UC value at offset {pos}"
        )));
    }

    let events = detector.detect_all(fhr, uc);
    let result = classify(baseline, variability, &events);
    tracing::debug!(
        baseline,
        variability,
        events = events.len(),
        finding = result.status.as_str(),
        high = result.severity == Severity::High,
        "Window classified"
    );
    Ok(result)
}

/// Thread-safe shared session handle.
#[derive(Debug, Clone)]
pub struct SharedSession(Arc<Mutex<AnalysisSession>>);

impl SharedSession {
    pub fn new(session: AnalysisSession) -> Self {
        Self(Arc::new(Mutex::new(session)))
    }

    /// Lock the session for one operation.
    ///
    /// Every operation replaces state wholesale, so a panic in another
    /// holder cannot leave a half-applied update behind; a poisoned lock is
    /// recovered.
    pub fn lock(&self) -> MutexGuard<'_, AnalysisSession> {
        self.0.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Session lock poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

/// Build a session from configuration and wrap it for sharing.
pub fn create_shared_session(series: Arc<SampleSeries>, config: &Config) -> SharedSession {
    SharedSession::new(AnalysisSession::new(
        series,
        SessionSettings::from_config(config),
    ))
}
