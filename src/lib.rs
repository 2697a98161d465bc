//! Interaction engine for 1D NMR spectrum viewers.
//!
//! The headless core behind a spectrum display: loaded documents and their
//! annotations, the pan/zoom view transform, integration regions, peak
//! picking, and the mode state machine that routes pointer gestures. A GUI
//! layer feeds pointer and mode-toggle commands in, reads snapshots back
//! out each frame, and does all the drawing; widgets, event loops and file
//! parsing live outside this crate.
//!
//! The core is single-threaded and synchronous. The one deliberately pure
//! piece is [`peaks::detect_peaks`], so a host may run it on a worker and
//! merge the result back on the owning thread.

pub mod controller;
pub mod data;
pub mod error;
pub mod integration;
pub mod peaks;
pub mod pipeline;
pub mod view;

pub use controller::{InteractionController, InteractionMode};
pub use data::document::{DocumentId, Sample, SpectrumDocument};
pub use data::session::SpectrumSession;
pub use error::EngineError;
pub use integration::{IntegrationRegion, IntegrationStore, RegionId};
pub use peaks::{detect_peaks, Peak, PeakId, PeakOrigin, PeakPickParams};
pub use view::ViewTransform;
