//! CSV loading with signal-loss cleaning, plus a synthetic fallback recording.
//!
//! Recordings exported from monitoring archives mark signal loss with `0` or
//! an empty cell. Those gaps are filled by linear interpolation so the
//! analysis core never sees non-finite values.

use crate::record::types::{Sample, SampleSeries};
use std::path::Path;
use thiserror::Error;

/// Number of samples in the synthetic fallback recording.
pub const SYNTHETIC_SAMPLES: usize = 4800;

/// Duration of the synthetic fallback recording (seconds).
pub const SYNTHETIC_DURATION_SECS: f64 = 1200.0;

/// Errors that can occur while loading a recording.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("missing column '{0}'")]
    MissingColumn(&'static str),
    #[error("no usable {0} readings in recording")]
    NoUsableSamples(&'static str),
}

/// Column positions of the three channels.
#[derive(Debug, Clone, Copy)]
struct Columns {
    seconds: usize,
    fhr: usize,
    uc: usize,
}

impl Columns {
    const POSITIONAL: Columns = Columns {
        seconds: 0,
        fhr: 1,
        uc: 2,
    };

    fn from_header(record: &csv::StringRecord) -> Result<Self, LoadError> {
        let find = |name: &'static str| {
            record
                .iter()
                .position(|field| field.trim().eq_ignore_ascii_case(name))
                .ok_or(LoadError::MissingColumn(name))
        };
        Ok(Columns {
            seconds: find("seconds")?,
            fhr: find("fhr")?,
            uc: find("uc")?,
        })
    }
}

/// Load the recording at `path`, or synthesize a flat trace if it does not exist.
pub fn load_or_synthesize(path: &Path, sampling_rate_hz: f64) -> Result<SampleSeries, LoadError> {
    if path.exists() {
        load_csv(path, sampling_rate_hz)
    } else {
        tracing::warn!(
            "Recording {:?} not found, using synthetic flat trace",
            path
        );
        Ok(synthetic_series(sampling_rate_hz))
    }
}

/// Load a CSV recording.
///
/// A header naming `fhr` selects columns by name (`seconds`, `fhr`, `uc`).
/// Otherwise the first three columns are `seconds, fhr, uc`; a first row that
/// does not parse as numbers is treated as an unnamed header.
pub fn load_csv(path: &Path, sampling_rate_hz: f64) -> Result<SampleSeries, LoadError> {
    let file = std::fs::File::open(path)?;
    let reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);
    read_series(reader, sampling_rate_hz)
}

fn read_series<R: std::io::Read>(
    mut reader: csv::Reader<R>,
    sampling_rate_hz: f64,
) -> Result<SampleSeries, LoadError> {
    let mut records = reader.records();

    let first = match records.next() {
        Some(record) => record?,
        None => return Ok(SampleSeries::new(Vec::new(), sampling_rate_hz)),
    };

    let names_fhr = first
        .iter()
        .any(|field| field.trim().eq_ignore_ascii_case("fhr"));
    let (columns, first_data) = if names_fhr {
        (Columns::from_header(&first)?, None)
    } else if first.iter().take(3).all(|f| f.parse::<f64>().is_ok()) {
        (Columns::POSITIONAL, Some(first))
    } else {
        (Columns::POSITIONAL, None)
    };

    let mut times = Vec::new();
    let mut fhr = Vec::new();
    let mut uc = Vec::new();
    let mut skipped = 0usize;

    let rows = first_data.into_iter().map(Ok).chain(records);
    for record in rows {
        let record = record?;
        let time = parse_field(&record, columns.seconds);
        if !time.is_finite() {
            skipped += 1;
            continue;
        }
        times.push(time);
        fhr.push(parse_field(&record, columns.fhr));
        uc.push(parse_field(&record, columns.uc));
    }

    if skipped > 0 {
        tracing::debug!("Skipped {} rows without a valid timestamp", skipped);
    }

    if times.is_empty() {
        return Ok(SampleSeries::new(Vec::new(), sampling_rate_hz));
    }

    fill_gaps(&mut fhr).ok_or(LoadError::NoUsableSamples("fhr"))?;
    fill_gaps(&mut uc).ok_or(LoadError::NoUsableSamples("uc"))?;

    let samples = times
        .into_iter()
        .zip(fhr)
        .zip(uc)
        .map(|((time, fhr), uc)| Sample::new(time, fhr, uc))
        .collect::<Vec<_>>();

    tracing::info!("Loaded {} samples", samples.len());
    Ok(SampleSeries::new(samples, sampling_rate_hz))
}

fn parse_field(record: &csv::StringRecord, idx: usize) -> f64 {
    record
        .get(idx)
        .and_then(|field| field.parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

fn is_gap(value: f64) -> bool {
    !value.is_finite() || value == 0.0
}

/// Replace gaps by linear interpolation between valid neighbours.
///
/// Leading and trailing gaps take the nearest valid value. Returns `None`
/// when the channel has no valid value at all.
fn fill_gaps(values: &mut [f64]) -> Option<()> {
    let valid: Vec<usize> = (0..values.len()).filter(|&i| !is_gap(values[i])).collect();
    let (&first, &last) = (valid.first()?, valid.last()?);

    let (head, tail) = (values[first], values[last]);
    values[..first].fill(head);
    values[last + 1..].fill(tail);
    for pair in valid.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        let span = (hi - lo) as f64;
        for i in lo + 1..hi {
            let frac = (i - lo) as f64 / span;
            values[i] = values[lo] + (values[hi] - values[lo]) * frac;
        }
    }
    Some(())
}

/// Flat synthetic recording: FHR 140, UC 10, evenly spaced over 20 minutes.
pub fn synthetic_series(sampling_rate_hz: f64) -> SampleSeries {
    let last = (SYNTHETIC_SAMPLES - 1) as f64;
    let samples = (0..SYNTHETIC_SAMPLES)
        .map(|i| Sample::new(i as f64 * SYNTHETIC_DURATION_SECS / last, 140.0, 10.0))
        .collect();
    SampleSeries::new(samples, sampling_rate_hz)
}
