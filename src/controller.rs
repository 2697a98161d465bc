//! Interaction mode state machine and pointer-event routing.
//!
//! Exactly one mode is active at a time: a single enum field, never a set
//! of independent flags, so two simultaneously active modes cannot be
//! represented. Switching mode is a full replace and drops any in-progress
//! gesture. Malformed gestures (a zero-length integration drag, a manual
//! peak outside the domain, a remove click that hits nothing) are
//! swallowed here; only store- and session-level validation errors surface
//! to the caller.

use serde::{Deserialize, Serialize};

use crate::data::session::SpectrumSession;
use crate::error::EngineError;
use crate::peaks::{self, PeakPickParams};
use crate::view;

/// Committed drags narrower than this in data coordinates are discarded.
const DEGENERATE_SPAN: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InteractionMode {
    View,
    ZoomDrag,
    ManualIntegration,
    RemoveIntegral,
    ManualPeak,
    AutoPeak,
}

/// In-progress pointer gesture, if any.
#[derive(Debug, Clone, Copy)]
enum Gesture {
    Idle,
    Pan {
        last_view_x: f64,
    },
    Zoom {
        anchor_view_x: f64,
        origin_view_x: f64,
        start_scale: f64,
    },
    /// Provisional integration region, both ends in data coordinates.
    Region {
        anchor_data_x: f64,
        current_data_x: f64,
    },
}

/// Routes pointer events to the session according to the active mode.
///
/// One controller per session; pointer x-coordinates arrive in view
/// (pixel) space and are converted through the session's view transform
/// where a data coordinate is needed.
#[derive(Debug)]
pub struct InteractionController {
    mode: InteractionMode,
    gesture: Gesture,
    pick_params: PeakPickParams,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionController {
    pub fn new() -> Self {
        Self {
            mode: InteractionMode::View,
            gesture: Gesture::Idle,
            pick_params: PeakPickParams::default(),
        }
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn pick_params(&self) -> PeakPickParams {
        self.pick_params
    }

    pub fn set_pick_params(&mut self, params: PeakPickParams) {
        self.pick_params = params;
    }

    /// Replace the active mode. Any in-progress gesture (including a
    /// provisional region) is discarded, never committed.
    pub fn set_mode(&mut self, mode: InteractionMode) {
        if !matches!(self.gesture, Gesture::Idle) {
            log::debug!("mode change discards in-progress gesture");
        }
        self.gesture = Gesture::Idle;
        self.mode = mode;
    }

    /// Checkable-button semantics: toggling the active mode returns to
    /// `View`, toggling another replaces it. Returns the resulting mode.
    pub fn toggle_mode(&mut self, mode: InteractionMode) -> InteractionMode {
        let next = if self.mode == mode {
            InteractionMode::View
        } else {
            mode
        };
        self.set_mode(next);
        next
    }

    /// The uncommitted region being dragged out, ordered `(lo, hi)`, for
    /// the renderer.
    pub fn provisional_region(&self) -> Option<(f64, f64)> {
        match self.gesture {
            Gesture::Region {
                anchor_data_x,
                current_data_x,
            } => Some((
                anchor_data_x.min(current_data_x),
                anchor_data_x.max(current_data_x),
            )),
            _ => None,
        }
    }

    pub fn pointer_down(
        &mut self,
        session: &mut SpectrumSession,
        view_x: f64,
    ) -> Result<(), EngineError> {
        let view = session.view().ok_or(EngineError::EmptySession)?;
        match self.mode {
            InteractionMode::View => {
                self.gesture = Gesture::Pan {
                    last_view_x: view_x,
                };
            }
            InteractionMode::ZoomDrag => {
                self.gesture = Gesture::Zoom {
                    anchor_view_x: view_x,
                    origin_view_x: view_x,
                    start_scale: view.scale(),
                };
            }
            InteractionMode::ManualIntegration => {
                let x = view.to_data(view_x);
                self.gesture = Gesture::Region {
                    anchor_data_x: x,
                    current_data_x: x,
                };
            }
            InteractionMode::RemoveIntegral => {
                let x = view.to_data(view_x);
                let doc = session.active_document_mut().ok_or(EngineError::EmptySession)?;
                match doc.remove_region_at(x) {
                    Some(id) => log::info!("removed integration region {}", id),
                    None => log::debug!("remove click at {:.4} hit no region", x),
                }
            }
            InteractionMode::ManualPeak => {
                let x = view.to_data(view_x);
                let doc = session.active_document_mut().ok_or(EngineError::EmptySession)?;
                if doc.add_manual_peak(x).is_none() {
                    log::debug!("manual peak at {:.4} outside domain, discarded", x);
                }
            }
            InteractionMode::AutoPeak => {
                let (lo, hi) = view.visible_range();
                let params = self.pick_params;
                let doc = session.active_document_mut().ok_or(EngineError::EmptySession)?;
                let found = peaks::detect_peaks(doc.samples(), Some((lo, hi)), &params);
                log::info!(
                    "auto peak pick found {} peaks in [{:.4}, {:.4}]",
                    found.len(),
                    lo,
                    hi
                );
                doc.merge_peaks(found);
            }
        }
        Ok(())
    }

    pub fn pointer_drag(
        &mut self,
        session: &mut SpectrumSession,
        view_x: f64,
    ) -> Result<(), EngineError> {
        match self.gesture {
            Gesture::Pan { last_view_x } => {
                let view = session.view_mut().ok_or(EngineError::EmptySession)?;
                view.pan(view_x - last_view_x);
                self.gesture = Gesture::Pan {
                    last_view_x: view_x,
                };
            }
            Gesture::Zoom {
                anchor_view_x,
                origin_view_x,
                start_scale,
            } => {
                let view = session.view_mut().ok_or(EngineError::EmptySession)?;
                let target = start_scale * view::drag_zoom_factor(view_x - origin_view_x);
                let factor = target / view.scale();
                view.zoom_at(anchor_view_x, factor);
            }
            Gesture::Region { anchor_data_x, .. } => {
                let view = session.view().ok_or(EngineError::EmptySession)?;
                self.gesture = Gesture::Region {
                    anchor_data_x,
                    current_data_x: view.to_data(view_x),
                };
            }
            Gesture::Idle => {}
        }
        Ok(())
    }

    pub fn pointer_up(
        &mut self,
        session: &mut SpectrumSession,
        view_x: f64,
    ) -> Result<(), EngineError> {
        let gesture = std::mem::replace(&mut self.gesture, Gesture::Idle);
        if let Gesture::Region { anchor_data_x, .. } = gesture {
            let view = session.view().ok_or(EngineError::EmptySession)?;
            let release = view.to_data(view_x);
            let lo = anchor_data_x.min(release);
            let hi = anchor_data_x.max(release);
            if hi - lo < DEGENERATE_SPAN {
                log::debug!("zero-length integration drag discarded");
                return Ok(());
            }
            let doc = session.active_document_mut().ok_or(EngineError::EmptySession)?;
            let id = doc.create_region(lo, hi)?;
            log::info!("committed integration region {} [{:.4}, {:.4}]", id, lo, hi);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::document::{Sample, SpectrumDocument};

    fn session() -> SpectrumSession {
        let _ = env_logger::builder().is_test(true).try_init();
        let samples = [(0.0, 0.0), (1.0, 5.0), (2.0, 1.0), (3.0, 6.0), (4.0, 0.0)]
            .iter()
            .map(|&(x, y)| Sample::new(x, y))
            .collect();
        let mut s = SpectrumSession::new(800.0);
        s.add_document(SpectrumDocument::from_samples("test", samples).unwrap());
        s
    }

    fn view_x_of(session: &SpectrumSession, data_x: f64) -> f64 {
        session.view().unwrap().to_view(data_x)
    }

    #[test]
    fn test_modes_are_mutually_exclusive() {
        let mut c = InteractionController::new();
        assert_eq!(c.mode(), InteractionMode::View);
        c.set_mode(InteractionMode::ManualIntegration);
        c.set_mode(InteractionMode::ZoomDrag);
        assert_eq!(c.mode(), InteractionMode::ZoomDrag, "full replace, no stack");
    }

    #[test]
    fn test_toggle_active_mode_returns_to_view() {
        let mut c = InteractionController::new();
        assert_eq!(c.toggle_mode(InteractionMode::ManualPeak), InteractionMode::ManualPeak);
        assert_eq!(c.toggle_mode(InteractionMode::ManualPeak), InteractionMode::View);
        assert_eq!(c.toggle_mode(InteractionMode::AutoPeak), InteractionMode::AutoPeak);
    }

    #[test]
    fn test_empty_session_surfaces_error() {
        let mut c = InteractionController::new();
        let mut s = SpectrumSession::new(800.0);
        assert_eq!(c.pointer_down(&mut s, 10.0).unwrap_err(), EngineError::EmptySession);
    }

    #[test]
    fn test_integration_drag_commits_region() {
        let mut c = InteractionController::new();
        let mut s = session();
        c.set_mode(InteractionMode::ManualIntegration);
        // drag right-to-left; bounds still come out ordered
        let down_x = view_x_of(&s, 3.0);
        c.pointer_down(&mut s, down_x).unwrap();
        let drag_x = view_x_of(&s, 2.0);
        c.pointer_drag(&mut s, drag_x).unwrap();
        assert_eq!(c.provisional_region(), Some((2.0, 3.0)));
        let up_x = view_x_of(&s, 1.0);
        c.pointer_up(&mut s, up_x).unwrap();
        assert!(c.provisional_region().is_none());
        let regions = s.active_document().unwrap().regions();
        assert_eq!(regions.len(), 1);
        assert!((regions[0].start() - 1.0).abs() < 1e-9);
        assert!((regions[0].end() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_length_drag_discarded_silently() {
        let mut c = InteractionController::new();
        let mut s = session();
        c.set_mode(InteractionMode::ManualIntegration);
        let x = view_x_of(&s, 2.0);
        c.pointer_down(&mut s, x).unwrap();
        c.pointer_up(&mut s, x).unwrap();
        assert!(s.active_document().unwrap().regions().is_empty());
    }

    #[test]
    fn test_overlap_error_surfaces_on_commit() {
        let mut c = InteractionController::new();
        let mut s = session();
        s.active_document_mut().unwrap().create_region(1.0, 2.0).unwrap();
        c.set_mode(InteractionMode::ManualIntegration);
        let down_x = view_x_of(&s, 1.5);
        c.pointer_down(&mut s, down_x).unwrap();
        let up_x = view_x_of(&s, 3.0);
        let err = c.pointer_up(&mut s, up_x).unwrap_err();
        assert!(matches!(err, EngineError::Overlap { .. }));
        assert_eq!(s.active_document().unwrap().regions().len(), 1);
    }

    #[test]
    fn test_mode_switch_mid_drag_discards_provisional() {
        let mut c = InteractionController::new();
        let mut s = session();
        c.set_mode(InteractionMode::ManualIntegration);
        let down_x = view_x_of(&s, 1.0);
        c.pointer_down(&mut s, down_x).unwrap();
        let drag_x = view_x_of(&s, 3.0);
        c.pointer_drag(&mut s, drag_x).unwrap();
        c.set_mode(InteractionMode::RemoveIntegral);
        assert!(c.provisional_region().is_none());
        let up_x = view_x_of(&s, 3.0);
        c.pointer_up(&mut s, up_x).unwrap();
        assert!(s.active_document().unwrap().regions().is_empty(), "no partial commit");
    }

    #[test]
    fn test_remove_mode_click() {
        let mut c = InteractionController::new();
        let mut s = session();
        s.active_document_mut().unwrap().create_region(1.0, 2.0).unwrap();
        c.set_mode(InteractionMode::RemoveIntegral);
        // miss
        let miss_x = view_x_of(&s, 3.5);
        c.pointer_down(&mut s, miss_x).unwrap();
        assert_eq!(s.active_document().unwrap().regions().len(), 1);
        // hit
        let hit_x = view_x_of(&s, 1.5);
        c.pointer_down(&mut s, hit_x).unwrap();
        assert!(s.active_document().unwrap().regions().is_empty());
    }

    #[test]
    fn test_pan_moves_view() {
        let mut c = InteractionController::new();
        let mut s = session();
        s.view_mut().unwrap().zoom_at(400.0, 4.0);
        let before = s.view().unwrap().visible_range();
        c.pointer_down(&mut s, 400.0).unwrap();
        c.pointer_drag(&mut s, 300.0).unwrap();
        c.pointer_up(&mut s, 300.0).unwrap();
        let after = s.view().unwrap().visible_range();
        assert!(after.0 > before.0, "dragging left pans the window right");
    }

    #[test]
    fn test_zoom_drag_scales_about_anchor() {
        let mut c = InteractionController::new();
        let mut s = session();
        c.set_mode(InteractionMode::ZoomDrag);
        let anchor = 200.0;
        let under_anchor = s.view().unwrap().to_data(anchor);
        let start_scale = s.view().unwrap().scale();
        c.pointer_down(&mut s, anchor).unwrap();
        c.pointer_drag(&mut s, anchor + view::ZOOM_DRAG_DOUBLING_PX).unwrap();
        c.pointer_up(&mut s, anchor + view::ZOOM_DRAG_DOUBLING_PX).unwrap();
        let view = s.view().unwrap();
        assert!((view.scale() - start_scale * 2.0).abs() < 1e-9);
        assert!((view.to_data(anchor) - under_anchor).abs() < 1e-9);
    }

    #[test]
    fn test_manual_peak_click() {
        let mut c = InteractionController::new();
        let mut s = session();
        c.set_mode(InteractionMode::ManualPeak);
        let down_x = view_x_of(&s, 0.5);
        c.pointer_down(&mut s, down_x).unwrap();
        let peaks = s.active_document().unwrap().peaks();
        assert_eq!(peaks.len(), 1);
        assert!((peaks[0].amplitude - 2.5).abs() < 1e-9);
        assert_eq!(peaks[0].confidence, 1.0);
    }

    #[test]
    fn test_auto_peak_merges_without_dedup() {
        let mut c = InteractionController::new();
        let mut s = session();
        s.active_document_mut().unwrap().add_manual_peak(3.0).unwrap();
        c.set_pick_params(PeakPickParams {
            min_prominence: 2.0,
            min_separation: 1.0,
        });
        c.set_mode(InteractionMode::AutoPeak);
        c.pointer_down(&mut s, 100.0).unwrap();
        let peaks = s.active_document().unwrap().peaks();
        // manual at 3.0 plus auto at 1.0 and 3.0 — duplicates allowed
        assert_eq!(peaks.len(), 3);
        let positions: Vec<f64> = peaks.iter().map(|p| p.position).collect();
        assert_eq!(positions, vec![1.0, 3.0, 3.0]);
    }
}
