//! Recording input for the CTG monitor.
//!
//! A recording is a fixed, time-ordered sequence of FHR/UC samples loaded
//! once per session and never mutated afterwards.

pub mod loader;
pub mod types;

// Re-export commonly used types
pub use loader::{load_csv, load_or_synthesize, synthetic_series, LoadError};
pub use types::{Sample, SampleSeries, Window};
