//! Integration regions and their store.
//!
//! A store belongs to one document and holds the user-marked x-intervals
//! whose area under the curve is reported. Regions never overlap; attempts
//! to create or resize into an occupied interval are rejected, not merged.
//! Integrals are computed lazily (trapezoidal, with linear interpolation at
//! the region boundaries) and cached until the bounds or the underlying
//! samples change.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::data::document::Sample;
use crate::error::EngineError;

/// Identifier of one integration region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegionId(Uuid);

impl RegionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for RegionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One user-defined integration region, `start < end` in data coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationRegion {
    id: RegionId,
    start: f64,
    end: f64,
    /// Cached trapezoidal integral; `None` means dirty.
    cached_integral: Option<f64>,
}

impl IntegrationRegion {
    pub fn id(&self) -> RegionId {
        self.id
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn is_dirty(&self) -> bool {
        self.cached_integral.is_none()
    }

    fn contains(&self, x: f64) -> bool {
        self.start <= x && x <= self.end
    }
}

/// The set of integration regions for one document, in creation order.
///
/// The first-created region is the reference: relative integrals are
/// reported as `raw / first_raw * reference_scale`, the usual way proton
/// counts are read off an NMR spectrum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationStore {
    regions: Vec<IntegrationRegion>,
    /// Value assigned to the reference (first) region, user-settable.
    reference_scale: f64,
}

impl Default for IntegrationStore {
    fn default() -> Self {
        Self {
            regions: Vec::new(),
            reference_scale: 1.0,
        }
    }
}

impl IntegrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn regions(&self) -> &[IntegrationRegion] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn reference_scale(&self) -> f64 {
        self.reference_scale
    }

    pub fn set_reference_scale(&mut self, scale: f64) {
        self.reference_scale = scale;
    }

    /// Add a region. Fails if `start >= end` or the interval intersects an
    /// existing region; the store is unchanged on failure.
    pub fn create_region(&mut self, start: f64, end: f64) -> Result<RegionId, EngineError> {
        self.validate_bounds(start, end, None)?;
        let id = RegionId::new();
        self.regions.push(IntegrationRegion {
            id,
            start,
            end,
            cached_integral: None,
        });
        Ok(id)
    }

    /// Change a region's bounds. The region itself is excluded from the
    /// overlap check; its cached integral is invalidated.
    pub fn resize_region(
        &mut self,
        id: RegionId,
        new_start: f64,
        new_end: f64,
    ) -> Result<(), EngineError> {
        if !self.regions.iter().any(|r| r.id == id) {
            return Err(EngineError::RegionNotFound(id));
        }
        self.validate_bounds(new_start, new_end, Some(id))?;
        let region = self
            .regions
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(EngineError::RegionNotFound(id))?;
        region.start = new_start;
        region.end = new_end;
        region.cached_integral = None;
        Ok(())
    }

    /// Remove one region by id.
    pub fn remove_region(&mut self, id: RegionId) -> Result<IntegrationRegion, EngineError> {
        let pos = self
            .regions
            .iter()
            .position(|r| r.id == id)
            .ok_or(EngineError::RegionNotFound(id))?;
        Ok(self.regions.remove(pos))
    }

    /// Remove every region. Irreversible — there is no undo at this level.
    pub fn reset_all(&mut self) {
        self.regions.clear();
    }

    /// Id of the region containing `x`, if any (used by remove mode).
    pub fn region_at(&self, x: f64) -> Option<RegionId> {
        self.regions.iter().find(|r| r.contains(x)).map(|r| r.id)
    }

    /// Invalidate every cached integral (after the document is reloaded).
    pub fn mark_all_dirty(&mut self) {
        for r in &mut self.regions {
            r.cached_integral = None;
        }
    }

    /// Raw trapezoidal integral of `samples` over the region, recomputed
    /// only when dirty.
    pub fn integral(&mut self, id: RegionId, samples: &[Sample]) -> Result<f64, EngineError> {
        let region = self
            .regions
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(EngineError::RegionNotFound(id))?;
        if let Some(cached) = region.cached_integral {
            return Ok(cached);
        }
        let value = trapezoid_integral(samples, region.start, region.end);
        region.cached_integral = Some(value);
        Ok(value)
    }

    /// Integral normalized against the reference (first-created) region,
    /// scaled by [`reference_scale`](Self::reference_scale).
    pub fn relative_integral(
        &mut self,
        id: RegionId,
        samples: &[Sample],
    ) -> Result<f64, EngineError> {
        let first_id = self
            .regions
            .first()
            .map(|r| r.id)
            .ok_or(EngineError::RegionNotFound(id))?;
        let first_raw = self.integral(first_id, samples)?.abs().max(1e-12);
        let raw = self.integral(id, samples)?;
        Ok(raw / first_raw * self.reference_scale)
    }

    fn validate_bounds(
        &self,
        start: f64,
        end: f64,
        exclude: Option<RegionId>,
    ) -> Result<(), EngineError> {
        if !(start < end) {
            return Err(EngineError::InvalidRange { start, end });
        }
        // Open-interval intersection: sharing an endpoint is allowed.
        for r in &self.regions {
            if Some(r.id) == exclude {
                continue;
            }
            if start < r.end && r.start < end {
                return Err(EngineError::Overlap {
                    start,
                    end,
                    existing: r.id,
                });
            }
        }
        Ok(())
    }
}

/// Trapezoidal sum of the curve clipped to `[lo, hi]`, with linear
/// interpolation where a sample segment crosses a boundary.
pub fn trapezoid_integral(samples: &[Sample], lo: f64, hi: f64) -> f64 {
    let mut area = 0.0;
    for pair in samples.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if b.x <= lo || a.x >= hi {
            continue;
        }
        let x0 = a.x.max(lo);
        let x1 = b.x.min(hi);
        if x1 <= x0 {
            continue;
        }
        let slope = (b.y - a.y) / (b.x - a.x);
        let y0 = a.y + slope * (x0 - a.x);
        let y1 = a.y + slope * (x1 - a.x);
        area += 0.5 * (y0 + y1) * (x1 - x0);
    }
    area
}
