//! Core analysis pipeline.
//!
//! This module contains:
//! - Signal statistics and the shared peak finder
//! - Event detection and rule-based classification
//! - Flag annotation over the recording timeline
//! - The stream cursor and the session that ties them together

pub mod classifier;
pub mod cursor;
pub mod events;
pub mod flags;
pub mod peaks;
pub mod session;
pub mod statistics;

// Re-export commonly used types
pub use classifier::{classify, Category, ClassificationResult, Finding, Severity};
pub use cursor::{Advance, StreamCursor};
pub use events::{DetectorConfig, Event, EventDetector, EventKind, EventSummary};
pub use flags::{Flag, FlagAnnotator, FlagOp, FlagPolicy, TimeSpan};
pub use session::{
    create_shared_session, AnalysisOutcome, AnalysisSession, FlagListing, ReportEntry,
    SessionSettings, SharedSession, StreamChunk, WindowSettings,
};
