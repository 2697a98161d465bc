//! Spectrum document: one loaded curve plus the annotations it owns.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;
use crate::integration::{IntegrationRegion, IntegrationStore, RegionId};
use crate::peaks::{Peak, PeakId};

/// One (x, y) point of a sampled spectrum curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub x: f64,
    pub y: f64,
}

impl Sample {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Identifier of one loaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(Uuid);

impl DocumentId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One spectrum and its user annotations.
///
/// The sample sequence is immutable once loaded: a reload replaces it
/// wholesale via [`replace_samples`](Self::replace_samples), never mutates
/// it in place. Integration regions and peaks belong to the document, not
/// to any global registry, so switching the active document elsewhere
/// leaves them untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpectrumDocument {
    id: DocumentId,
    name: String,
    samples: Vec<Sample>,
    loaded_at: DateTime<Local>,
    integrations: IntegrationStore,
    peaks: Vec<Peak>,
}

fn validate_samples(samples: &[Sample]) -> Result<(), EngineError> {
    if samples.len() < 2 {
        return Err(EngineError::TooFewSamples {
            got: samples.len(),
        });
    }
    for (i, pair) in samples.windows(2).enumerate() {
        if !(pair[0].x < pair[1].x) {
            return Err(EngineError::NonMonotonicSamples { index: i + 1 });
        }
    }
    Ok(())
}

impl SpectrumDocument {
    /// Build a document from a loader-supplied curve. The x values must be
    /// strictly increasing.
    pub fn from_samples(
        name: impl Into<String>,
        samples: Vec<Sample>,
    ) -> Result<Self, EngineError> {
        validate_samples(&samples)?;
        let doc = Self {
            id: DocumentId::new(),
            name: name.into(),
            samples,
            loaded_at: Local::now(),
            integrations: IntegrationStore::new(),
            peaks: Vec::new(),
        };
        log::info!(
            "loaded spectrum '{}' ({} samples, x ∈ [{:.4}, {:.4}])",
            doc.name,
            doc.samples.len(),
            doc.samples[0].x,
            doc.samples[doc.samples.len() - 1].x
        );
        Ok(doc)
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn loaded_at(&self) -> DateTime<Local> {
        self.loaded_at
    }

    /// x-extent of the curve as `(min, max)`.
    pub fn domain(&self) -> (f64, f64) {
        (self.samples[0].x, self.samples[self.samples.len() - 1].x)
    }

    /// Replace the curve after a reload. Annotations are kept; every cached
    /// integral is invalidated.
    pub fn replace_samples(&mut self, samples: Vec<Sample>) -> Result<(), EngineError> {
        validate_samples(&samples)?;
        self.samples = samples;
        self.loaded_at = Local::now();
        self.integrations.mark_all_dirty();
        log::info!("reloaded spectrum '{}' ({} samples)", self.name, self.samples.len());
        Ok(())
    }

    /// y at an arbitrary x, linearly interpolated between the bracketing
    /// samples. `None` outside the domain.
    pub fn amplitude_at(&self, x: f64) -> Option<f64> {
        let (lo, hi) = self.domain();
        if x < lo || x > hi {
            return None;
        }
        let right = self.samples.partition_point(|s| s.x < x);
        if right == 0 {
            return Some(self.samples[0].y);
        }
        let b = self.samples[right.min(self.samples.len() - 1)];
        let a = self.samples[right - 1];
        if b.x == a.x {
            return Some(a.y);
        }
        Some(a.y + (x - a.x) / (b.x - a.x) * (b.y - a.y))
    }

    // ── Integration regions ──

    pub fn regions(&self) -> &[IntegrationRegion] {
        self.integrations.regions()
    }

    pub fn integrations(&self) -> &IntegrationStore {
        &self.integrations
    }

    pub fn set_reference_scale(&mut self, scale: f64) {
        self.integrations.set_reference_scale(scale);
    }

    pub fn create_region(&mut self, start: f64, end: f64) -> Result<RegionId, EngineError> {
        let id = self.integrations.create_region(start, end)?;
        log::debug!("created integration region [{:.4}, {:.4}] on '{}'", start, end, self.name);
        Ok(id)
    }

    pub fn resize_region(
        &mut self,
        id: RegionId,
        new_start: f64,
        new_end: f64,
    ) -> Result<(), EngineError> {
        self.integrations.resize_region(id, new_start, new_end)
    }

    pub fn remove_region(&mut self, id: RegionId) -> Result<IntegrationRegion, EngineError> {
        self.integrations.remove_region(id)
    }

    /// Remove the region containing `x`, if any.
    pub fn remove_region_at(&mut self, x: f64) -> Option<RegionId> {
        let id = self.integrations.region_at(x)?;
        // The id was just looked up, so removal cannot fail.
        self.integrations.remove_region(id).ok()?;
        Some(id)
    }

    pub fn reset_regions(&mut self) {
        log::debug!("reset {} integration regions on '{}'", self.integrations.len(), self.name);
        self.integrations.reset_all();
    }

    pub fn region_integral(&mut self, id: RegionId) -> Result<f64, EngineError> {
        self.integrations.integral(id, &self.samples)
    }

    pub fn region_relative_integral(&mut self, id: RegionId) -> Result<f64, EngineError> {
        self.integrations.relative_integral(id, &self.samples)
    }

    // ── Peaks ──

    pub fn peaks(&self) -> &[Peak] {
        &self.peaks
    }

    /// Place a manual peak at `x` with interpolated amplitude. `None` when
    /// `x` is outside the domain; no dedup against existing peaks.
    pub fn add_manual_peak(&mut self, x: f64) -> Option<PeakId> {
        let amplitude = self.amplitude_at(x)?;
        let peak = Peak::manual(x, amplitude);
        let id = peak.id;
        self.peaks.push(peak);
        self.peaks.sort_by(|a, b| a.position.total_cmp(&b.position));
        Some(id)
    }

    /// Merge detector output into the peak set, keeping ascending position
    /// order. Duplicates against existing peaks are allowed.
    pub fn merge_peaks(&mut self, found: Vec<Peak>) {
        self.peaks.extend(found);
        self.peaks.sort_by(|a, b| a.position.total_cmp(&b.position));
    }

    pub fn remove_peak(&mut self, id: PeakId) -> Option<Peak> {
        let pos = self.peaks.iter().position(|p| p.id == id)?;
        Some(self.peaks.remove(pos))
    }

    pub fn clear_peaks(&mut self) {
        self.peaks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples() -> Vec<Sample> {
        [(0.0, 0.0), (1.0, 5.0), (2.0, 1.0), (3.0, 6.0), (4.0, 0.0)]
            .iter()
            .map(|&(x, y)| Sample::new(x, y))
            .collect()
    }

    #[test]
    fn test_rejects_non_monotonic_samples() {
        let bad = vec![
            Sample::new(0.0, 1.0),
            Sample::new(2.0, 1.0),
            Sample::new(2.0, 3.0),
        ];
        let err = SpectrumDocument::from_samples("bad", bad).unwrap_err();
        assert_eq!(err, EngineError::NonMonotonicSamples { index: 2 });
    }

    #[test]
    fn test_rejects_too_few_samples() {
        let err = SpectrumDocument::from_samples("tiny", vec![Sample::new(0.0, 0.0)]).unwrap_err();
        assert_eq!(err, EngineError::TooFewSamples { got: 1 });
    }

    #[test]
    fn test_amplitude_interpolation() {
        let doc = SpectrumDocument::from_samples("s", samples()).unwrap();
        assert_eq!(doc.amplitude_at(0.5), Some(2.5));
        assert_eq!(doc.amplitude_at(1.0), Some(5.0));
        assert_eq!(doc.amplitude_at(4.0), Some(0.0));
        assert_eq!(doc.amplitude_at(4.1), None);
        assert_eq!(doc.amplitude_at(-0.1), None);
    }

    #[test]
    fn test_manual_peak_interpolated_and_sorted() {
        let mut doc = SpectrumDocument::from_samples("s", samples()).unwrap();
        doc.add_manual_peak(3.0).unwrap();
        doc.add_manual_peak(0.5).unwrap();
        assert_eq!(doc.peaks().len(), 2);
        assert_eq!(doc.peaks()[0].position, 0.5);
        assert_eq!(doc.peaks()[0].amplitude, 2.5);
        assert_eq!(doc.peaks()[1].amplitude, 6.0);
        assert!(doc.add_manual_peak(9.0).is_none(), "outside domain");
    }

    #[test]
    fn test_reload_invalidates_integrals() {
        let mut doc = SpectrumDocument::from_samples("s", samples()).unwrap();
        let id = doc.create_region(1.0, 3.0).unwrap();
        assert!((doc.region_integral(id).unwrap() - 6.5).abs() < 1e-12);
        let doubled: Vec<Sample> = samples()
            .into_iter()
            .map(|s| Sample::new(s.x, s.y * 2.0))
            .collect();
        doc.replace_samples(doubled).unwrap();
        assert!(doc.regions()[0].is_dirty());
        assert!((doc.region_integral(id).unwrap() - 13.0).abs() < 1e-12);
    }

    #[test]
    fn test_remove_region_at_click() {
        let mut doc = SpectrumDocument::from_samples("s", samples()).unwrap();
        doc.create_region(1.0, 2.0).unwrap();
        assert!(doc.remove_region_at(0.5).is_none(), "miss is a no-op");
        assert_eq!(doc.regions().len(), 1);
        assert!(doc.remove_region_at(1.5).is_some());
        assert!(doc.regions().is_empty());
    }

    #[test]
    fn test_document_serde_roundtrip() {
        let mut doc = SpectrumDocument::from_samples("s", samples()).unwrap();
        doc.create_region(1.0, 2.0).unwrap();
        doc.add_manual_peak(3.0).unwrap();
        let json = serde_json::to_string(&doc).unwrap();
        let parsed: SpectrumDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id(), doc.id());
        assert_eq!(parsed.regions().len(), 1);
        assert_eq!(parsed.peaks().len(), 1);
    }
}
