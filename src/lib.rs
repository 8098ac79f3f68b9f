//! CTG Monitor - streaming analysis of cardiotocography recordings.
//!
//! This library replays a two-channel recording (fetal heart rate and
//! uterine contractions), classifies a trailing window of history on every
//! tick, and keeps a timeline of flagged intervals.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         CTG Monitor                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐         │
//! │  │   Record    │──▶│   Cursor    │──▶│  Statistics │         │
//! │  │ (CSV load)  │   │ (chunks)    │   │  + Events   │         │
//! │  └─────────────┘   └─────────────┘   └─────────────┘         │
//! │                                             │                │
//! │                                             ▼                │
//! │  ┌─────────────┐                     ┌─────────────┐         │
//! │  │    Flags    │◀────────────────────│ Classifier  │         │
//! │  │ (timeline)  │                     │ (rules)     │         │
//! │  └─────────────┘                     └─────────────┘         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use ctg_monitor::{config::Config, core::create_shared_session, record};
//! use std::sync::Arc;
//!
//! let config = Config::default();
//! let series = record::load_or_synthesize(&config.dataset_path, config.sampling_rate_hz)
//!     .expect("Failed to load recording");
//! let session = create_shared_session(Arc::new(series), &config);
//!
//! let mut session = session.lock();
//! let chunk = session.advance_and_report();
//! let outcome = session.analyze().expect("Analysis failed");
//! println!("{} samples, metrics: {:?}", chunk.time.len(), outcome.metrics);
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod record;

#[cfg(feature = "server")]
pub mod server;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError, ServerSettings};
pub use core::{
    AnalysisOutcome, AnalysisSession, ClassificationResult, Flag, FlagAnnotator, SharedSession,
    StreamChunk, StreamCursor,
};
pub use error::AnalysisError;
pub use record::{LoadError, Sample, SampleSeries};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Clinical-use disclaimer that can be displayed to users.
pub const CLINICAL_DISCLAIMER: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║               CTG MONITOR - CLINICAL USE DISCLAIMER              ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  This tool replays recorded CTG traces for research and          ║
║  teaching.                                                       ║
║                                                                  ║
║  ✓ WHAT IT DOES:                                                 ║
║    • Estimates baseline heart rate and variability               ║
║    • Detects accelerations and decelerations by shape            ║
║    • Applies a fixed rule table to suggest a category            ║
║                                                                  ║
║  ✗ WHAT IT IS NOT:                                               ║
║    • A certified medical device                                  ║
║    • A substitute for review by a qualified clinician            ║
║    • A source of real-time alarms                                ║
║                                                                  ║
║  Every flag is a heuristic suggestion. Clinical decisions must   ║
║  rest on the full trace and the clinical picture.                ║
║                                                                  ║
║  Print this notice anytime with:                                 ║
║    ctg-monitor disclaimer                                        ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;
