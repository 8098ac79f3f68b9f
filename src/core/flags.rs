//! Flag annotation: a time-ordered, non-overlapping set of concern intervals.
//!
//! Each classification either paints a new interval over the recent past
//! (merging with every interval it touches) or, when reassuring, erases the
//! recent past from existing intervals. The live set is sorted by start,
//! free of overlaps, and holds no interval of `min_flag_width_secs` or less.

use crate::core::classifier::{Category, ClassificationResult, Severity};
use serde::{Deserialize, Serialize};

/// A flagged interval of the recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flag {
    pub start: f64,
    pub end: f64,
    #[serde(rename = "type")]
    pub status: String,
    pub category: Category,
    pub severity: Severity,
    #[serde(rename = "details")]
    pub rationale: String,
}

impl Flag {
    pub fn width(&self) -> f64 {
        self.end - self.start
    }

    fn with_span(&self, start: f64, end: f64) -> Self {
        Self {
            start,
            end,
            ..self.clone()
        }
    }
}

/// A half-open time span `[start, end)` in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSpan {
    pub start: f64,
    pub end: f64,
}

impl TimeSpan {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Overlap with `[start, end)`, if it has positive width.
    fn overlap(&self, start: f64, end: f64) -> Option<TimeSpan> {
        let lo = self.start.max(start);
        let hi = self.end.min(end);
        (lo < hi).then_some(TimeSpan::new(lo, hi))
    }
}

/// Policy knobs for flag annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlagPolicy {
    /// Length of the recent past each tick paints or erases (seconds)
    pub active_window_secs: f64,
    /// Flags this wide or narrower are dropped (seconds)
    pub min_flag_width_secs: f64,
}

impl Default for FlagPolicy {
    fn default() -> Self {
        Self {
            active_window_secs: 5.0,
            min_flag_width_secs: 0.5,
        }
    }
}

/// A single update to the flag set.
#[derive(Debug, Clone, PartialEq)]
pub enum FlagOp {
    /// Remove the span from every flag, splitting where needed.
    Erase(TimeSpan),
    /// Add the flag, absorbing every flag it touches.
    Paint(Flag),
}

impl FlagOp {
    /// The update implied by a classification made at `current_time`.
    pub fn for_result(current_time: f64, result: &ClassificationResult, policy: &FlagPolicy) -> Self {
        let span = TimeSpan::new(current_time - policy.active_window_secs, current_time);
        if result.severity == Severity::Low {
            FlagOp::Erase(span)
        } else {
            FlagOp::Paint(Flag {
                start: span.start,
                end: span.end,
                status: result.status.clone(),
                category: result.category,
                severity: result.severity,
                rationale: result.rationale.clone(),
            })
        }
    }

    /// Apply this update to `flags`, returning the unsorted, unfiltered result.
    fn apply_to(self, flags: Vec<Flag>) -> Vec<Flag> {
        match self {
            FlagOp::Erase(span) => erase(flags, span),
            FlagOp::Paint(flag) => paint(flags, flag),
        }
    }
}

fn erase(flags: Vec<Flag>, span: TimeSpan) -> Vec<Flag> {
    let mut out = Vec::with_capacity(flags.len() + 1);
    for flag in flags {
        match span.overlap(flag.start, flag.end) {
            None => out.push(flag),
            Some(cut) => {
                if flag.start < cut.start {
                    out.push(flag.with_span(flag.start, cut.start));
                }
                if flag.end > cut.end {
                    out.push(flag.with_span(cut.end, flag.end));
                }
            }
        }
    }
    out
}

fn paint(flags: Vec<Flag>, mut new_flag: Flag) -> Vec<Flag> {
    let (lo, hi) = (new_flag.start, new_flag.end);
    let mut out = Vec::with_capacity(flags.len() + 1);
    for flag in flags {
        // Touching counts as intersecting.
        if flag.start <= hi && flag.end >= lo {
            new_flag.start = new_flag.start.min(flag.start);
            new_flag.end = new_flag.end.max(flag.end);
            if flag.severity == Severity::High {
                new_flag.severity = Severity::High;
            }
        } else {
            out.push(flag);
        }
    }
    out.push(new_flag);
    out
}

/// Owns the live flag set of one session.
#[derive(Debug, Clone, Default)]
pub struct FlagAnnotator {
    flags: Vec<Flag>,
    policy: FlagPolicy,
}

impl FlagAnnotator {
    pub fn new(policy: FlagPolicy) -> Self {
        Self {
            flags: Vec::new(),
            policy,
        }
    }

    pub fn flags(&self) -> &[Flag] {
        &self.flags
    }

    /// Apply the classification made at `current_time`.
    ///
    /// An absent result leaves the set unchanged.
    pub fn apply(&mut self, current_time: f64, result: Option<&ClassificationResult>) -> &[Flag] {
        if let Some(result) = result {
            let op = FlagOp::for_result(current_time, result, &self.policy);
            tracing::debug!(
                current_time,
                severity = %result.severity,
                erase = matches!(op, FlagOp::Erase(_)),
                "Applying flag update"
            );
            self.apply_op(op);
        }
        &self.flags
    }

    /// Apply an explicit update and restore the set invariants.
    pub fn apply_op(&mut self, op: FlagOp) -> &[Flag] {
        let mut flags = op.apply_to(std::mem::take(&mut self.flags));
        flags.sort_by(|a, b| a.start.total_cmp(&b.start));
        flags.retain(|f| f.width() > self.policy.min_flag_width_secs);
        self.flags = flags;
        &self.flags
    }

    /// Drop every flag.
    pub fn clear(&mut self) {
        self.flags.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classifier::Finding;
    use crate::core::events::EventSummary;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn result(severity: Severity) -> ClassificationResult {
        let (category, finding) = match severity {
            Severity::Low => (Category::I, Finding::Reassuring),
            Severity::Medium => (Category::II, Finding::MinimalVariability),
            Severity::High => (Category::III, Finding::Bradycardia),
        };
        ClassificationResult {
            baseline_bpm: 140.0,
            variability: 10.0,
            category,
            finding,
            status: finding.label().to_string(),
            severity,
            rationale: format!("{} rationale", finding.label()),
            event_summary: EventSummary::default(),
        }
    }

    fn spans(flags: &[Flag]) -> Vec<(f64, f64)> {
        flags.iter().map(|f| (f.start, f.end)).collect()
    }

    fn assert_invariants(flags: &[Flag]) {
        for flag in flags {
            assert!(flag.width() > 0.5, "flag too narrow: {flag:?}");
        }
        for pair in flags.windows(2) {
            assert!(pair[0].start <= pair[1].start, "unsorted: {pair:?}");
            assert!(pair[0].end <= pair[1].start, "overlap: {pair:?}");
        }
    }

    #[test]
    fn test_absent_result_is_noop() {
        let mut annotator = FlagAnnotator::default();
        annotator.apply(12.0, Some(&result(Severity::High)));
        let before = annotator.flags().to_vec();
        assert_eq!(annotator.apply(30.0, None), before.as_slice());
    }

    #[test]
    fn test_overlapping_paints_merge() {
        let mut annotator = FlagAnnotator::default();
        annotator.apply(12.0, Some(&result(Severity::High)));
        annotator.apply(14.0, Some(&result(Severity::High)));
        assert_eq!(spans(annotator.flags()), vec![(7.0, 14.0)]);
    }

    #[test]
    fn test_repeated_paint_is_idempotent() {
        let mut annotator = FlagAnnotator::default();
        let high = result(Severity::High);
        let once = annotator.apply(12.0, Some(&high)).to_vec();
        let twice = annotator.apply(12.0, Some(&high)).to_vec();
        assert_eq!(once, twice);
        assert_eq!(twice.len(), 1);
    }

    #[test]
    fn test_touching_paints_merge() {
        let mut annotator = FlagAnnotator::default();
        annotator.apply(10.0, Some(&result(Severity::Medium)));
        annotator.apply(15.0, Some(&result(Severity::Medium)));
        assert_eq!(spans(annotator.flags()), vec![(5.0, 15.0)]);
    }

    #[test]
    fn test_merge_keeps_high_severity_and_takes_new_rationale() {
        let mut annotator = FlagAnnotator::default();
        annotator.apply(12.0, Some(&result(Severity::High)));
        let medium = result(Severity::Medium);
        let flags = annotator.apply(14.0, Some(&medium));

        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].severity, Severity::High);
        assert_eq!(flags[0].rationale, medium.rationale);
        assert_eq!(flags[0].status, medium.status);
        assert_eq!(flags[0].category, Category::II);
    }

    #[test]
    fn test_medium_merge_stays_medium() {
        let mut annotator = FlagAnnotator::default();
        annotator.apply(12.0, Some(&result(Severity::Medium)));
        let flags = annotator.apply(14.0, Some(&result(Severity::Medium)));
        assert_eq!(flags[0].severity, Severity::Medium);
    }

    #[test]
    fn test_erase_trims_front() {
        let mut annotator = FlagAnnotator::default();
        annotator.apply_op(FlagOp::Paint(Flag {
            start: 10.0,
            end: 20.0,
            status: "Bradycardia".to_string(),
            category: Category::III,
            severity: Severity::High,
            rationale: String::new(),
        }));
        annotator.apply(15.0, Some(&result(Severity::Low)));
        assert_eq!(spans(annotator.flags()), vec![(15.0, 20.0)]);
    }

    #[test]
    fn test_erase_splits_and_removes() {
        let mut annotator = FlagAnnotator::default();
        for t in [5.0, 8.0, 11.0, 14.0, 17.0, 20.0] {
            annotator.apply(t, Some(&result(Severity::High)));
        }
        assert_eq!(spans(annotator.flags()), vec![(0.0, 20.0)]);

        annotator.apply(12.0, Some(&result(Severity::Low)));
        assert_eq!(spans(annotator.flags()), vec![(0.0, 7.0), (12.0, 20.0)]);

        // A window covering a whole flag deletes it.
        annotator.apply(7.0, Some(&result(Severity::Low)));
        assert_eq!(spans(annotator.flags()), vec![(0.0, 2.0), (12.0, 20.0)]);
        annotator.apply(5.0, Some(&result(Severity::Low)));
        assert_eq!(spans(annotator.flags()), vec![(12.0, 20.0)]);
    }

    #[test]
    fn test_erase_on_empty_set() {
        let mut annotator = FlagAnnotator::default();
        assert!(annotator.apply(50.0, Some(&result(Severity::Low))).is_empty());

        annotator.apply(12.0, Some(&result(Severity::High)));
        let before = annotator.flags().to_vec();
        annotator.apply(100.0, Some(&result(Severity::Low)));
        assert_eq!(annotator.flags(), before.as_slice());
    }

    #[test]
    fn test_narrow_remnants_are_dropped() {
        let mut annotator = FlagAnnotator::default();
        annotator.apply(10.0, Some(&result(Severity::High)));
        // Leaves [5, 5.4) in front: 0.4 s wide.
        annotator.apply(10.4, Some(&result(Severity::Low)));
        assert!(annotator.flags().is_empty());
    }

    #[test]
    fn test_clear() {
        let mut annotator = FlagAnnotator::default();
        annotator.apply(12.0, Some(&result(Severity::High)));
        annotator.clear();
        assert!(annotator.flags().is_empty());
    }

    #[test]
    fn test_random_updates_preserve_invariants() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..50 {
            let mut annotator = FlagAnnotator::default();
            let mut now = 0.0;
            for _ in 0..200 {
                // Mostly forward, sometimes back as after a jump.
                now = if rng.gen_bool(0.1) {
                    rng.gen_range(0.0..300.0)
                } else {
                    now + rng.gen_range(0.0..4.0)
                };
                let severity = match rng.gen_range(0..3) {
                    0 => Severity::Low,
                    1 => Severity::Medium,
                    _ => Severity::High,
                };
                annotator.apply(now, Some(&result(severity)));
                assert_invariants(annotator.flags());
            }
        }
    }
}
