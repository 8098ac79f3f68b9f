//! End-to-end replay of generated recordings through an analysis session.

use ctg_monitor::core::{AnalysisSession, Finding, Flag, SessionSettings, Severity};
use ctg_monitor::record::load_csv;
use ctg_monitor::{Sample, SampleSeries};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use std::io::Write;
use std::sync::Arc;

const FS: f64 = 4.0;
const LEN: usize = 4800;

/// 140 bpm with a 10 bpm swing every 25 s, except a 95 bpm episode in `brady`.
fn trace(brady: std::ops::Range<f64>) -> SampleSeries {
    let samples = (0..LEN)
        .map(|i| {
            let t = i as f64 / FS;
            let base = if brady.contains(&t) { 95.0 } else { 140.0 };
            Sample::new(t, base + 10.0 * (2.0 * PI * t / 25.0).sin(), 10.0)
        })
        .collect();
    SampleSeries::new(samples, FS)
}

fn session(series: SampleSeries) -> AnalysisSession {
    let settings = SessionSettings {
        chunk_size: 5,
        ..Default::default()
    };
    AnalysisSession::new(Arc::new(series), settings)
}

/// Stream a full window of history, then advance and analyze until the end.
fn replay(session: &mut AnalysisSession) -> Vec<Finding> {
    for _ in 0..60 {
        session.advance_and_report();
    }
    let mut findings = Vec::new();
    while !session.advance_and_report().finished {
        let outcome = session.analyze().unwrap();
        if let Some(metrics) = outcome.metrics {
            findings.push(metrics.finding);
        }
    }
    findings
}

fn assert_well_formed(flags: &[Flag]) {
    for flag in flags {
        assert!(flag.width() > 0.5, "flag too narrow: {flag:?}");
    }
    for pair in flags.windows(2) {
        assert!(pair[0].start <= pair[1].start, "unsorted: {pair:?}");
        assert!(pair[0].end <= pair[1].start, "overlap: {pair:?}");
    }
}

#[test]
fn test_reassuring_trace_raises_no_flags() {
    let mut session = session(trace(0.0..0.0));
    let findings = replay(&mut session);

    assert!(!findings.is_empty());
    assert!(findings.iter().all(|f| *f == Finding::Reassuring));
    assert!(session.flags().is_empty());
    assert!(session.report().is_empty());
}

#[test]
fn test_bradycardia_episode_is_flagged() {
    let mut session = session(trace(400.0..800.0));
    let findings = replay(&mut session);
    assert!(findings.contains(&Finding::Bradycardia));

    let flags = session.flags();
    assert!(!flags.is_empty());
    assert_well_formed(flags);

    // Reassuring windows on either side erase everything outside the episode.
    for flag in flags {
        assert!(flag.start > 395.0, "flag before episode: {flag:?}");
        assert!(flag.end < 875.0, "flag after recovery: {flag:?}");
    }
    let covering = flags
        .iter()
        .find(|f| f.start <= 600.0 && f.end >= 600.0)
        .expect("episode should be flagged");
    assert_eq!(covering.severity, Severity::High);

    let listing = session.list_flags();
    assert_eq!(listing.flags, flags.to_vec());
    assert_eq!(listing.total_duration, (LEN - 1) as f64 / FS);
}

#[test]
fn test_reset_and_replay_is_deterministic() {
    let mut session = session(trace(400.0..800.0));
    replay(&mut session);
    let first = session.flags().to_vec();

    session.reset().unwrap();
    assert!(session.flags().is_empty());
    replay(&mut session);
    assert_eq!(session.flags(), first.as_slice());
}

#[test]
fn test_random_jumps_keep_flags_well_formed() {
    let mut rng = StdRng::seed_from_u64(0xc7a6);
    let samples = (0..LEN)
        .map(|i| {
            let t = i as f64 / FS;
            let drift = 30.0 * (2.0 * PI * t / 600.0).sin();
            Sample::new(t, 130.0 + drift + rng.gen_range(-8.0..8.0), rng.gen_range(0.0..40.0))
        })
        .collect();
    let mut session = session(SampleSeries::new(samples, FS));

    for _ in 0..2000 {
        if rng.gen_bool(0.02) {
            session.jump(rng.gen_range(-50.0..1300.0)).unwrap();
        }
        if session.advance_and_report().finished {
            session.reset().unwrap();
        }
        session.analyze().unwrap();
        assert_well_formed(session.flags());
    }
}

#[test]
fn test_csv_recording_with_signal_loss() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "seconds,fhr,uc").unwrap();
    for i in 0..800 {
        let t = i as f64 / FS;
        // Every 50th reading drops out.
        let fhr = if i % 50 == 7 {
            0.0
        } else {
            140.0 + 10.0 * (2.0 * PI * t / 25.0).sin()
        };
        writeln!(file, "{t},{fhr},10").unwrap();
    }
    file.flush().unwrap();

    let series = load_csv(file.path(), FS).unwrap();
    assert_eq!(series.len(), 800);
    assert!(series.samples().iter().all(|s| s.fhr > 120.0));

    let mut session = session(series);
    let findings = replay(&mut session);
    assert!(findings.iter().all(|f| *f == Finding::Reassuring));

    let done = session.advance_and_report();
    assert!(done.finished);
    assert_eq!(done.progress, 100.0);
}
