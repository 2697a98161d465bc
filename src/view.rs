//! Horizontal view transform for a 1D spectrum plot.
//!
//! Maps data x-coordinates to view (pixel) x-coordinates and back. Zoom is
//! anchored: the data coordinate under the anchor stays put. Pan is clamped
//! so the visible window never leaves the document's domain by more than a
//! small overscroll margin, and zooming out stops at the fit-to-viewport
//! scale.

use serde::{Deserialize, Serialize};

/// Factor applied per discrete zoom-step command.
pub const ZOOM_STEP_FACTOR: f64 = 1.25;

/// Horizontal drag distance (view px) that doubles the scale in drag-zoom.
/// Exponential, so small drags feel proportional at any zoom level.
pub const ZOOM_DRAG_DOUBLING_PX: f64 = 120.0;

/// Fraction of the domain span kept visible around the curve on reset.
const FIT_MARGIN: f64 = 0.02;

/// Fraction of the domain span the window may overscroll past the domain.
const OVERSCROLL: f64 = 0.05;

/// Maximum zoom-in relative to the fit scale.
const MAX_ZOOM_IN: f64 = 1.0e5;

/// Scale factor for a drag-zoom gesture of `delta_px` from its origin.
pub fn drag_zoom_factor(delta_px: f64) -> f64 {
    2.0_f64.powf(delta_px / ZOOM_DRAG_DOUBLING_PX)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    /// View px per data unit, clamped to `[fit_scale, max_scale]`.
    scale: f64,
    /// Data coordinate mapped to view x = 0.
    offset_x: f64,
    viewport_px: f64,
    domain_min: f64,
    domain_max: f64,
}

impl ViewTransform {
    /// A transform fitted to the given domain. `domain_max` must exceed
    /// `domain_min` (documents guarantee this).
    pub fn new(domain_min: f64, domain_max: f64, viewport_px: f64) -> Self {
        debug_assert!(domain_max > domain_min);
        debug_assert!(viewport_px > 0.0);
        let mut v = Self {
            scale: 1.0,
            offset_x: 0.0,
            viewport_px,
            domain_min,
            domain_max,
        };
        v.reset();
        v
    }

    fn span(&self) -> f64 {
        self.domain_max - self.domain_min
    }

    fn fit_scale(&self) -> f64 {
        self.viewport_px / (self.span() * (1.0 + 2.0 * FIT_MARGIN))
    }

    fn max_scale(&self) -> f64 {
        self.fit_scale() * MAX_ZOOM_IN
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn viewport_px(&self) -> f64 {
        self.viewport_px
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.domain_min, self.domain_max)
    }

    /// Data range currently visible, `(left, right)`.
    pub fn visible_range(&self) -> (f64, f64) {
        (self.to_data(0.0), self.to_data(self.viewport_px))
    }

    pub fn to_data(&self, view_x: f64) -> f64 {
        self.offset_x + view_x / self.scale
    }

    pub fn to_view(&self, data_x: f64) -> f64 {
        (data_x - self.offset_x) * self.scale
    }

    /// Restore fit-to-viewport: whole domain visible with a small margin.
    pub fn reset(&mut self) {
        self.scale = self.fit_scale();
        self.offset_x = self.domain_min - self.span() * FIT_MARGIN;
    }

    /// Resize the viewport, keeping the left data edge in place.
    pub fn set_viewport(&mut self, viewport_px: f64) {
        debug_assert!(viewport_px > 0.0);
        self.viewport_px = viewport_px;
        self.scale = self.scale.clamp(self.fit_scale(), self.max_scale());
        self.clamp_pan();
    }

    /// Rescale by `factor` about a fixed view anchor: the data coordinate
    /// under `anchor_view_x` is the same before and after.
    pub fn zoom_at(&mut self, anchor_view_x: f64, factor: f64) {
        let anchor_data = self.to_data(anchor_view_x);
        self.scale = (self.scale * factor).clamp(self.fit_scale(), self.max_scale());
        self.offset_x = anchor_data - anchor_view_x / self.scale;
        self.clamp_pan();
    }

    /// One discrete zoom step about the anchor.
    pub fn zoom_step(&mut self, anchor_view_x: f64, zoom_in: bool) {
        let factor = if zoom_in {
            ZOOM_STEP_FACTOR
        } else {
            ZOOM_STEP_FACTOR.recip()
        };
        self.zoom_at(anchor_view_x, factor);
    }

    /// Translate by a view-space delta (drag: content follows the pointer).
    pub fn pan(&mut self, delta_view_px: f64) {
        self.offset_x -= delta_view_px / self.scale;
        self.clamp_pan();
    }

    fn clamp_pan(&mut self) {
        let margin = self.span() * OVERSCROLL;
        let window = self.viewport_px / self.scale;
        let lo = self.domain_min - margin;
        let hi = self.domain_max + margin;
        // scale >= fit_scale keeps window <= hi - lo
        self.offset_x = self.offset_x.min(hi - window).max(lo);
    }
}
