//! Session: the ordered stack of open documents the UI layer talks to.

use serde::{Deserialize, Serialize};

use crate::data::document::{DocumentId, SpectrumDocument};
use crate::error::EngineError;
use crate::view::ViewTransform;

/// Ordered stack of open spectra plus the active selection.
///
/// Insertion order is display order. The view transform follows the active
/// document: switching resets it to fit-to-viewport, while each document's
/// regions and peaks stay with the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpectrumSession {
    documents: Vec<SpectrumDocument>,
    active: Option<DocumentId>,
    view: Option<ViewTransform>,
    viewport_px: f64,
}

impl SpectrumSession {
    pub fn new(viewport_px: f64) -> Self {
        Self {
            documents: Vec::new(),
            active: None,
            view: None,
            viewport_px,
        }
    }

    pub fn documents(&self) -> &[SpectrumDocument] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn active_id(&self) -> Option<DocumentId> {
        self.active
    }

    pub fn document(&self, id: DocumentId) -> Option<&SpectrumDocument> {
        self.documents.iter().find(|d| d.id() == id)
    }

    pub fn document_mut(&mut self, id: DocumentId) -> Option<&mut SpectrumDocument> {
        self.documents.iter_mut().find(|d| d.id() == id)
    }

    pub fn active_document(&self) -> Option<&SpectrumDocument> {
        self.active.and_then(|id| self.document(id))
    }

    pub fn active_document_mut(&mut self) -> Option<&mut SpectrumDocument> {
        let id = self.active?;
        self.document_mut(id)
    }

    /// View transform for the active document; `None` when the session is
    /// empty.
    pub fn view(&self) -> Option<&ViewTransform> {
        self.view.as_ref()
    }

    pub fn view_mut(&mut self) -> Option<&mut ViewTransform> {
        self.view.as_mut()
    }

    /// Open a document: appended to the stack and made active.
    pub fn add_document(&mut self, doc: SpectrumDocument) -> DocumentId {
        let id = doc.id();
        log::info!("opened document '{}' ({})", doc.name(), id);
        self.documents.push(doc);
        self.activate(Some(id));
        id
    }

    /// Close a document. If it was active, the most-recently-added
    /// remaining document becomes active (or the session goes empty).
    pub fn remove_document(&mut self, id: DocumentId) -> Result<SpectrumDocument, EngineError> {
        let pos = self
            .documents
            .iter()
            .position(|d| d.id() == id)
            .ok_or(EngineError::DocumentNotFound(id))?;
        let doc = self.documents.remove(pos);
        log::info!("closed document '{}' ({})", doc.name(), id);
        if self.active == Some(id) {
            self.activate(self.documents.last().map(|d| d.id()));
        }
        Ok(doc)
    }

    /// Switch the active document. A no-op (view kept) when `id` is already
    /// active.
    pub fn set_active(&mut self, id: DocumentId) -> Result<(), EngineError> {
        if self.document(id).is_none() {
            return Err(EngineError::DocumentNotFound(id));
        }
        if self.active != Some(id) {
            self.activate(Some(id));
        }
        Ok(())
    }

    /// Notify the session of a viewport resize.
    pub fn set_viewport(&mut self, viewport_px: f64) {
        self.viewport_px = viewport_px;
        if let Some(view) = self.view.as_mut() {
            view.set_viewport(viewport_px);
        }
    }

    /// Reset the view to fit the active document.
    pub fn reset_view(&mut self) {
        if let Some(view) = self.view.as_mut() {
            view.reset();
        }
    }

    /// Remove every integration region of the active document.
    pub fn reset_integrals(&mut self) -> Result<(), EngineError> {
        let doc = self.active_document_mut().ok_or(EngineError::EmptySession)?;
        doc.reset_regions();
        Ok(())
    }

    fn activate(&mut self, id: Option<DocumentId>) {
        self.active = id;
        let viewport_px = self.viewport_px;
        self.view = self.active_document().map(|doc| {
            let (min, max) = doc.domain();
            ViewTransform::new(min, max, viewport_px)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::document::Sample;

    fn doc(name: &str, x0: f64) -> SpectrumDocument {
        let samples = (0..8)
            .map(|i| Sample::new(x0 + i as f64, (i as f64).sin()))
            .collect();
        SpectrumDocument::from_samples(name, samples).unwrap()
    }

    #[test]
    fn test_add_makes_active_and_fits_view() {
        let mut session = SpectrumSession::new(800.0);
        assert!(session.view().is_none());
        let id = session.add_document(doc("a", 0.0));
        assert_eq!(session.active_id(), Some(id));
        let (left, right) = session.view().unwrap().visible_range();
        assert!(left <= 0.0 && right >= 7.0);
    }

    #[test]
    fn test_remove_falls_back_to_most_recent() {
        let mut session = SpectrumSession::new(800.0);
        let a = session.add_document(doc("a", 0.0));
        let b = session.add_document(doc("b", 100.0));
        let c = session.add_document(doc("c", 200.0));
        session.set_active(a).unwrap();
        session.remove_document(a).unwrap();
        assert_eq!(session.active_id(), Some(c));
        session.remove_document(c).unwrap();
        assert_eq!(session.active_id(), Some(b));
        session.remove_document(b).unwrap();
        assert_eq!(session.active_id(), None);
        assert!(session.view().is_none());
    }

    #[test]
    fn test_remove_inactive_keeps_active() {
        let mut session = SpectrumSession::new(800.0);
        let a = session.add_document(doc("a", 0.0));
        let b = session.add_document(doc("b", 100.0));
        session.set_active(b).unwrap();
        session.remove_document(a).unwrap();
        assert_eq!(session.active_id(), Some(b));
    }

    #[test]
    fn test_remove_missing_fails() {
        let mut session = SpectrumSession::new(800.0);
        let a = session.add_document(doc("a", 0.0));
        session.remove_document(a).unwrap();
        assert_eq!(
            session.remove_document(a).unwrap_err(),
            EngineError::DocumentNotFound(a)
        );
    }

    #[test]
    fn test_switching_resets_view_keeps_annotations() {
        let mut session = SpectrumSession::new(800.0);
        let a = session.add_document(doc("a", 0.0));
        let b = session.add_document(doc("b", 100.0));
        session.set_active(a).unwrap();
        session
            .active_document_mut()
            .unwrap()
            .create_region(1.0, 2.0)
            .unwrap();
        session.view_mut().unwrap().zoom_at(100.0, 8.0);

        session.set_active(b).unwrap();
        let (left, right) = session.view().unwrap().visible_range();
        assert!(left <= 100.0 && right >= 107.0, "view refitted to b");

        session.set_active(a).unwrap();
        assert_eq!(session.active_document().unwrap().regions().len(), 1);

        session.view_mut().unwrap().zoom_at(100.0, 8.0);
        session.reset_view();
        let (left, right) = session.view().unwrap().visible_range();
        assert!(left <= 0.0 && right >= 7.0);
    }

    #[test]
    fn test_reset_integrals_requires_active() {
        let mut session = SpectrumSession::new(800.0);
        assert_eq!(session.reset_integrals().unwrap_err(), EngineError::EmptySession);
        session.add_document(doc("a", 0.0));
        session
            .active_document_mut()
            .unwrap()
            .create_region(1.0, 2.0)
            .unwrap();
        session.reset_integrals().unwrap();
        assert!(session.active_document().unwrap().regions().is_empty());
    }
}
