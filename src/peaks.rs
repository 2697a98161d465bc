//! Peak model and automatic peak detection.
//!
//! `detect_peaks` is a pure function over the sample sequence: no shared
//! scan state, identical input always yields the identical ordered result.
//! That makes it safe to run on a worker thread and merge the returned list
//! back over a channel; the merge itself must stay serialized with other
//! mutation of the owning document's peak set.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::data::document::Sample;

/// Identifier of one peak annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeakId(Uuid);

impl PeakId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for PeakId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a peak came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeakOrigin {
    Manual,
    Auto,
}

/// One peak annotation on a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Peak {
    pub id: PeakId,
    /// x-coordinate in data space.
    pub position: f64,
    /// y at `position`, interpolated for manual peaks.
    pub amplitude: f64,
    pub origin: PeakOrigin,
    /// In `[0, 1]`; always `1.0` for manual peaks.
    pub confidence: f64,
}

impl Peak {
    /// A user-placed peak. No proximity or merge logic against existing
    /// peaks is applied anywhere — duplicates are allowed.
    pub fn manual(position: f64, amplitude: f64) -> Self {
        Self {
            id: PeakId::new(),
            position,
            amplitude,
            origin: PeakOrigin::Manual,
            confidence: 1.0,
        }
    }

    fn auto(position: f64, amplitude: f64, confidence: f64) -> Self {
        Self {
            id: PeakId::new(),
            position,
            amplitude,
            origin: PeakOrigin::Auto,
            confidence,
        }
    }
}

/// Parameters for the automatic detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakPickParams {
    /// Minimum prominence (amplitude above the higher of the two nearest
    /// lower bounding minima) for a local maximum to count.
    pub min_prominence: f64,
    /// Among accepted candidates closer than this in x, only the
    /// highest-amplitude one survives (ties broken by leftmost position).
    pub min_separation: f64,
}

impl Default for PeakPickParams {
    fn default() -> Self {
        Self {
            min_prominence: 0.0,
            min_separation: 0.0,
        }
    }
}

/// Scan `samples` (restricted to `range` when given) for local maxima and
/// return the surviving peaks ordered by ascending position.
///
/// O(N) over the scanned window apart from the final sorts; deterministic.
pub fn detect_peaks(
    samples: &[Sample],
    range: Option<(f64, f64)>,
    params: &PeakPickParams,
) -> Vec<Peak> {
    let win = match range {
        Some((lo, hi)) => {
            let start = samples.partition_point(|s| s.x < lo);
            let end = samples.partition_point(|s| s.x <= hi);
            &samples[start..end]
        }
        None => samples,
    };
    let n = win.len();
    if n < 3 {
        return Vec::new();
    }

    let min_y = win.iter().map(|s| s.y).fold(f64::INFINITY, f64::min);
    let max_y = win.iter().map(|s| s.y).fold(f64::NEG_INFINITY, f64::max);
    let span = max_y - min_y;

    // Local maxima (strictly above both neighbors), filtered by prominence.
    let mut candidates: Vec<(usize, f64)> = Vec::new();
    for i in 1..n - 1 {
        let y = win[i].y;
        if y > win[i - 1].y && y > win[i + 1].y {
            let prom = prominence(win, i);
            if prom >= params.min_prominence {
                candidates.push((i, prom));
            }
        }
    }

    // Strongest-first selection under the separation constraint, the same
    // scheme as keeping only the tallest line of a cluster.
    let mut by_height = candidates.clone();
    by_height.sort_by(|a, b| {
        win[b.0]
            .y
            .total_cmp(&win[a.0].y)
            .then(win[a.0].x.total_cmp(&win[b.0].x))
    });
    let mut selected: Vec<(usize, f64)> = Vec::new();
    for (i, prom) in by_height {
        let too_close = selected
            .iter()
            .any(|&(s, _)| (win[i].x - win[s].x).abs() < params.min_separation);
        if !too_close {
            selected.push((i, prom));
        }
    }
    selected.sort_by(|a, b| a.0.cmp(&b.0));

    selected
        .into_iter()
        .map(|(i, prom)| {
            let confidence = if span > 0.0 {
                (prom / span).clamp(0.0, 1.0)
            } else {
                0.0
            };
            Peak::auto(win[i].x, win[i].y, confidence)
        })
        .collect()
}

/// Height of `win[i]` above the higher of the two nearest lower bounding
/// minima. The walk on each side stops at the first sample at least as
/// tall as the candidate; running off the edge counts the edge-side
/// minimum.
fn prominence(win: &[Sample], i: usize) -> f64 {
    let y = win[i].y;

    let mut left_min = f64::INFINITY;
    for j in (0..i).rev() {
        if win[j].y >= y {
            break;
        }
        left_min = left_min.min(win[j].y);
    }

    let mut right_min = f64::INFINITY;
    for s in &win[i + 1..] {
        if s.y >= y {
            break;
        }
        right_min = right_min.min(s.y);
    }

    y - left_min.max(right_min).min(y)
}
