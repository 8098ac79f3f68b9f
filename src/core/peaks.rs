//! Peak and dip search shared by every event detector.
//!
//! Semantics follow the usual signal-processing definition of a peak:
//!
//! 1. Local maxima, with flat tops reduced to their middle sample (rounded
//!    down, so the leftmost of two middles wins).
//! 2. Height filter.
//! 3. Distance filter: higher peaks first, ties to the lower index; every
//!    peak closer than `min_distance` samples to a kept peak is dropped.
//! 4. Prominence: height over the higher of the two lowest points between
//!    the peak and the next strictly higher sample (or the signal edge) on
//!    each side.
//! 5. Width at half prominence, with linear interpolation at both crossings.
//!
//! Dips are found by inverting the signal.

/// Whether to search for maxima or minima.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Peaks,
    Dips,
}

impl Polarity {
    fn orient(self, value: f64) -> f64 {
        match self {
            Polarity::Peaks => value,
            Polarity::Dips => -value,
        }
    }
}

/// Constraints every reported extremum must satisfy.
///
/// `height` is in signal units: a floor for peaks, a ceiling for dips.
/// `prominence` and `width` are magnitudes and apply to both polarities.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PeakCriteria {
    pub height: Option<f64>,
    pub min_prominence: Option<f64>,
    /// Minimum width in samples, measured at half prominence.
    pub min_width: Option<f64>,
    /// Minimum separation between kept extrema, in samples.
    pub min_distance: Option<usize>,
}

/// A located extremum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub index: usize,
    /// Signal value at `index`
    pub value: f64,
    pub prominence: f64,
    /// Width at half prominence, in samples
    pub width: f64,
    /// Interpolated crossing positions bounding `width`
    pub left_ip: f64,
    pub right_ip: f64,
}

/// Find all extrema of `signal` satisfying `criteria`, ordered by index.
pub fn find_extrema(signal: &[f64], polarity: Polarity, criteria: &PeakCriteria) -> Vec<Peak> {
    let x: Vec<f64> = signal.iter().map(|&v| polarity.orient(v)).collect();
    let height = criteria.height.map(|h| polarity.orient(h));

    let mut candidates = local_maxima(&x);

    if let Some(h) = height {
        candidates.retain(|&i| x[i] >= h);
    }

    if let Some(distance) = criteria.min_distance {
        if distance > 1 {
            candidates = select_by_distance(&x, &candidates, distance);
        }
    }

    let mut found = Vec::with_capacity(candidates.len());
    for idx in candidates {
        let (prominence, left_base, right_base) = prominence(&x, idx);
        if criteria.min_prominence.is_some_and(|p| prominence < p) {
            continue;
        }

        let (width, left_ip, right_ip) = width(&x, idx, prominence, left_base, right_base);
        if criteria.min_width.is_some_and(|w| width < w) {
            continue;
        }

        found.push(Peak {
            index: idx,
            value: signal[idx],
            prominence,
            width,
            left_ip,
            right_ip,
        });
    }

    found
}

/// Indices of strict local maxima; plateaus report their middle sample.
fn local_maxima(x: &[f64]) -> Vec<usize> {
    let mut maxima = Vec::new();
    if x.len() < 3 {
        return maxima;
    }

    let last = x.len() - 1;
    let mut i = 1;
    while i < last {
        if x[i - 1] < x[i] {
            let mut ahead = i + 1;
            while ahead < last && x[ahead] == x[i] {
                ahead += 1;
            }
            if x[ahead] < x[i] {
                let right = ahead - 1;
                maxima.push((i + right) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    maxima
}

/// Keep the highest peaks first, dropping neighbours closer than `distance`.
fn select_by_distance(x: &[f64], peaks: &[usize], distance: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..peaks.len()).collect();
    order.sort_by(|&a, &b| x[peaks[b]].total_cmp(&x[peaks[a]]).then(a.cmp(&b)));

    let mut keep = vec![true; peaks.len()];
    for &j in &order {
        if !keep[j] {
            continue;
        }
        let mut k = j;
        while k > 0 && peaks[j] - peaks[k - 1] < distance {
            keep[k - 1] = false;
            k -= 1;
        }
        let mut k = j + 1;
        while k < peaks.len() && peaks[k] - peaks[j] < distance {
            keep[k] = false;
            k += 1;
        }
    }

    peaks
        .iter()
        .zip(keep)
        .filter_map(|(&p, kept)| kept.then_some(p))
        .collect()
}

/// Prominence of the peak at `idx`, with its left and right bases.
fn prominence(x: &[f64], idx: usize) -> (f64, usize, usize) {
    let peak = x[idx];

    let mut left_base = idx;
    let mut left_min = peak;
    let mut i = idx;
    while i > 0 && x[i - 1] <= peak {
        i -= 1;
        if x[i] < left_min {
            left_min = x[i];
            left_base = i;
        }
    }

    let mut right_base = idx;
    let mut right_min = peak;
    let mut i = idx;
    while i + 1 < x.len() && x[i + 1] <= peak {
        i += 1;
        if x[i] < right_min {
            right_min = x[i];
            right_base = i;
        }
    }

    (peak - left_min.max(right_min), left_base, right_base)
}

/// Width at half prominence: `(width, left_ip, right_ip)`.
fn width(x: &[f64], idx: usize, prominence: f64, left_base: usize, right_base: usize) -> (f64, f64, f64) {
    let height = x[idx] - prominence * 0.5;

    let mut i = idx;
    while left_base < i && height < x[i] {
        i -= 1;
    }
    let mut left_ip = i as f64;
    if x[i] < height {
        left_ip += (height - x[i]) / (x[i + 1] - x[i]);
    }

    let mut i = idx;
    while i < right_base && height < x[i] {
        i += 1;
    }
    let mut right_ip = i as f64;
    if x[i] < height {
        right_ip -= (height - x[i]) / (x[i - 1] - x[i]);
    }

    (right_ip - left_ip, left_ip, right_ip)
}
