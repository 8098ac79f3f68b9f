//! Morphological event detection on FHR/UC windows.
//!
//! All thresholds are expressed in seconds or bpm and converted to samples
//! through the configured sampling rate.

use crate::core::peaks::{find_extrema, PeakCriteria, Polarity};
use crate::core::statistics;
use serde::{Deserialize, Serialize};

/// Kind of a detected event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Acceleration,
    EarlyDecel,
    LateDecel,
    VariableDecel,
    ProlongedDecel,
}

impl EventKind {
    /// Short label used by display consumers ("Early", "Late", ...).
    pub fn short_label(self) -> &'static str {
        match self {
            EventKind::Acceleration => "Reactive",
            EventKind::EarlyDecel => "Early",
            EventKind::LateDecel => "Late",
            EventKind::VariableDecel => "Variable",
            EventKind::ProlongedDecel => "Prolonged",
        }
    }
}

/// A detected event, local to one analysis window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    /// Seconds from the start of the window
    pub time: f64,
    /// Width at half prominence, in seconds
    pub duration: f64,
    /// Depth below baseline (prolonged decelerations only)
    pub magnitude: Option<f64>,
}

/// Counts of detected events by kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventSummary {
    pub accelerations: usize,
    /// Early/late/variable decelerations, in detection order
    pub decelerations: Vec<EventKind>,
    pub prolonged: usize,
}

impl EventSummary {
    pub fn from_events(events: &[Event]) -> Self {
        let mut summary = Self::default();
        for event in events {
            match event.kind {
                EventKind::Acceleration => summary.accelerations += 1,
                EventKind::ProlongedDecel => summary.prolonged += 1,
                kind => summary.decelerations.push(kind),
            }
        }
        summary
    }

    pub fn has(&self, kind: EventKind) -> bool {
        match kind {
            EventKind::Acceleration => self.accelerations > 0,
            EventKind::ProlongedDecel => self.prolonged > 0,
            kind => self.decelerations.contains(&kind),
        }
    }
}

/// Thresholds for event detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Sampling rate of the analysed signals (Hz), taken from the recording
    #[serde(skip)]
    pub sampling_rate_hz: f64,

    /// Rise above baseline for an acceleration (bpm)
    pub acceleration_rise_bpm: f64,
    pub acceleration_min_prominence: f64,
    pub acceleration_min_secs: f64,
    pub acceleration_max_secs: f64,
    /// Windows shorter than this never report accelerations
    pub acceleration_min_samples: usize,

    /// Minimum UC level for a contraction peak
    pub contraction_min_height: f64,
    pub contraction_min_separation_secs: f64,
    /// FHR dips must fall to or below this value (bpm)
    pub deceleration_ceiling_bpm: f64,
    pub deceleration_min_prominence: f64,
    pub deceleration_min_secs: f64,
    /// Dips lagging the contraction peak by more than this are late
    pub late_offset_secs: f64,
    /// Dips within this distance of the contraction peak are early
    pub early_offset_secs: f64,

    /// Drop below baseline for a prolonged deceleration (bpm)
    pub prolonged_drop_bpm: f64,
    pub prolonged_min_prominence: f64,
    pub prolonged_min_secs: f64,
    pub prolonged_max_secs: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            sampling_rate_hz: 4.0,
            acceleration_rise_bpm: 15.0,
            acceleration_min_prominence: 10.0,
            acceleration_min_secs: 15.0,
            acceleration_max_secs: 120.0,
            acceleration_min_samples: 60,
            contraction_min_height: 20.0,
            contraction_min_separation_secs: 50.0,
            deceleration_ceiling_bpm: 100.0,
            deceleration_min_prominence: 10.0,
            deceleration_min_secs: 10.0,
            late_offset_secs: 20.0,
            early_offset_secs: 15.0,
            prolonged_drop_bpm: 30.0,
            prolonged_min_prominence: 20.0,
            prolonged_min_secs: 90.0,
            prolonged_max_secs: 600.0,
        }
    }
}

/// Detects accelerations and decelerations in a window.
#[derive(Debug, Clone, Default)]
pub struct EventDetector {
    config: DetectorConfig,
}

impl EventDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    fn samples(&self, secs: f64) -> f64 {
        secs * self.config.sampling_rate_hz
    }

    fn secs(&self, samples: f64) -> f64 {
        samples / self.config.sampling_rate_hz
    }

    /// Run every detector over the window.
    pub fn detect_all(&self, fhr: &[f64], uc: &[f64]) -> Vec<Event> {
        let mut events = self.detect_decelerations(fhr, uc);
        events.extend(self.detect_accelerations(fhr));
        events.extend(self.detect_prolonged_decelerations(fhr));
        events
    }

    /// Transient rises of at least `acceleration_rise_bpm` over the window median.
    pub fn detect_accelerations(&self, fhr: &[f64]) -> Vec<Event> {
        let cfg = &self.config;
        if fhr.len() < cfg.acceleration_min_samples {
            return Vec::new();
        }
        let Some(baseline) = window_median(fhr) else {
            return Vec::new();
        };

        let criteria = PeakCriteria {
            height: Some(baseline + cfg.acceleration_rise_bpm),
            min_prominence: Some(cfg.acceleration_min_prominence),
            min_width: Some(self.samples(cfg.acceleration_min_secs)),
            min_distance: None,
        };

        find_extrema(fhr, Polarity::Peaks, &criteria)
            .into_iter()
            .filter_map(|peak| {
                let duration = self.secs(peak.width);
                (cfg.acceleration_min_secs..=cfg.acceleration_max_secs)
                    .contains(&duration)
                    .then(|| Event {
                        kind: EventKind::Acceleration,
                        time: self.secs(peak.index as f64),
                        duration,
                        magnitude: None,
                    })
            })
            .collect()
    }

    /// FHR dips classified by their timing against the nearest contraction peak.
    pub fn detect_decelerations(&self, fhr: &[f64], uc: &[f64]) -> Vec<Event> {
        let cfg = &self.config;

        let contraction_criteria = PeakCriteria {
            height: Some(cfg.contraction_min_height),
            min_distance: Some(self.samples(cfg.contraction_min_separation_secs).ceil() as usize),
            ..Default::default()
        };
        let contractions: Vec<usize> = find_extrema(uc, Polarity::Peaks, &contraction_criteria)
            .into_iter()
            .map(|peak| peak.index)
            .collect();

        let dip_criteria = PeakCriteria {
            height: Some(cfg.deceleration_ceiling_bpm),
            min_prominence: Some(cfg.deceleration_min_prominence),
            min_width: Some(self.samples(cfg.deceleration_min_secs)),
            min_distance: None,
        };

        find_extrema(fhr, Polarity::Dips, &dip_criteria)
            .into_iter()
            .map(|dip| {
                let kind = match nearest(&contractions, dip.index) {
                    None => EventKind::VariableDecel,
                    Some(peak) => {
                        let offset = self.secs(dip.index as f64 - peak as f64);
                        if offset > cfg.late_offset_secs {
                            EventKind::LateDecel
                        } else if (-cfg.early_offset_secs..=cfg.early_offset_secs).contains(&offset)
                        {
                            EventKind::EarlyDecel
                        } else {
                            EventKind::VariableDecel
                        }
                    }
                };
                Event {
                    kind,
                    time: self.secs(dip.index as f64),
                    duration: self.secs(dip.width),
                    magnitude: None,
                }
            })
            .collect()
    }

    /// Deep, long dips of at least `prolonged_drop_bpm` below the window median.
    pub fn detect_prolonged_decelerations(&self, fhr: &[f64]) -> Vec<Event> {
        let cfg = &self.config;
        let Some(baseline) = window_median(fhr) else {
            return Vec::new();
        };

        let criteria = PeakCriteria {
            height: Some(baseline - cfg.prolonged_drop_bpm),
            min_prominence: Some(cfg.prolonged_min_prominence),
            min_width: Some(self.samples(cfg.prolonged_min_secs)),
            min_distance: None,
        };

        find_extrema(fhr, Polarity::Dips, &criteria)
            .into_iter()
            .filter_map(|dip| {
                let duration = self.secs(dip.width);
                (cfg.prolonged_min_secs..=cfg.prolonged_max_secs)
                    .contains(&duration)
                    .then(|| Event {
                        kind: EventKind::ProlongedDecel,
                        time: self.secs(dip.index as f64),
                        duration,
                        magnitude: Some((dip.value - baseline).abs()),
                    })
            })
            .collect()
    }
}

fn window_median(fhr: &[f64]) -> Option<f64> {
    statistics::baseline(fhr, 1).ok()
}

/// Nearest contraction peak by sample distance; ties go to the earlier peak.
fn nearest(peaks: &[usize], idx: usize) -> Option<usize> {
    let mut best: Option<usize> = None;
    for &peak in peaks {
        match best {
            Some(b) if peak.abs_diff(idx) >= b.abs_diff(idx) => {}
            _ => best = Some(peak),
        }
    }
    best
}
