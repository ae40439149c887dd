//! Measurement mode: while an element is being fitted its max sizes are
//! lifted and it is displayed as a table so its box follows its content.
//! The overridden values are put back exactly once, either by the search's
//! finalize step or, if the search never gets there, when the guard drops.

use crate::dom::{lock_document, Display, Document, NodeId, SharedDocument};

/// Tag of the nested inline text-bearing children that are overridden too.
const INLINE_TEXT_TAG: &str = "span";

#[derive(Debug, Clone, Copy, PartialEq)]
struct SavedStyle {
    max_width: Option<f64>,
    max_height: Option<f64>,
    display: Display,
}

#[derive(Debug)]
pub struct MeasurementMode {
    document: SharedDocument,
    element: NodeId,
    saved: SavedStyle,
    /// Nested spans and their original display.
    spans: Vec<(NodeId, Display)>,
    restored: bool,
}

impl MeasurementMode {
    /// Applies the overrides to `element` inside `doc`, the locked contents of
    /// `document`. Span font sizes are reset to `1em` and stay that way.
    pub fn enter(document: &SharedDocument, doc: &mut Document, element: NodeId) -> Self {
        let style = &mut doc.node_mut(element).style;
        let saved = SavedStyle {
            max_width: style.max_width,
            max_height: style.max_height,
            display: style.display,
        };
        style.max_width = None;
        style.max_height = None;
        style.display = Display::Table;

        let span_ids: Vec<NodeId> = doc
            .descendants(element)
            .into_iter()
            .filter(|id| doc.node(*id).tag == INLINE_TEXT_TAG)
            .collect();
        let spans = span_ids
            .into_iter()
            .map(|id| {
                let style = &mut doc.node_mut(id).style;
                let original = style.display;
                style.display = Display::Table;
                style.font_size = None;
                (id, original)
            })
            .collect();

        MeasurementMode {
            document: document.clone(),
            element,
            saved,
            spans,
            restored: false,
        }
    }

    pub fn is_restored(&self) -> bool {
        self.restored
    }

    /// Puts the saved styles back. Later calls are no-ops.
    pub fn restore(&mut self, doc: &mut Document) {
        if self.restored {
            return;
        }
        let style = &mut doc.node_mut(self.element).style;
        style.display = self.saved.display;
        style.max_width = self.saved.max_width;
        style.max_height = self.saved.max_height;
        for (id, display) in &self.spans {
            doc.node_mut(*id).style.display = *display;
        }
        self.restored = true;
    }
}

impl Drop for MeasurementMode {
    fn drop(&mut self) {
        if self.restored {
            return;
        }
        // Only reached when the search was dropped mid-way; the lock is free then.
        let document = self.document.clone();
        let mut doc = lock_document(&document);
        self.restore(&mut doc);
    }
}
