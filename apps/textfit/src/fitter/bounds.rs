//! Bounds Checker: does an element currently overflow its parent's box?

use tracing::warn;

use crate::dom::{Document, NodeId, Size};
use crate::layout::Measurer;

/// Measurements behind one overflow verdict.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundsCheck {
    /// Element offset size, rounded to whole pixels.
    pub element: Size,
    /// Parent offset size, rounded to whole pixels.
    pub parent: Size,
    /// Parent max-height (or rendered height) minus vertical padding.
    pub max_height: f64,
    /// Parent max-width (or rendered width) minus horizontal padding.
    pub max_width: f64,
    pub exceeds: bool,
}

/// Measures `element` against its parent and records the measurements in the
/// element's dataset (`maxHeight`, `maxWidth`, `offsetWidth`, `offsetHeight`).
///
/// Returns `None` for an element without a parent.
pub fn check(doc: &mut Document, measurer: &dyn Measurer, element: NodeId) -> Option<BoundsCheck> {
    let parent = doc.parent(element)?;

    let parent_box = round(measurer.offset_size(doc, parent));
    let element_box = round(measurer.offset_size(doc, element));
    let parent_style = &doc.node(parent).style;
    let padding = parent_style.padding;

    // A declared max size wins; `none` falls back to the rendered size.
    let max_height = px(parent_style.max_height.unwrap_or(parent_box.height))
        - px(padding.top)
        - px(padding.bottom);
    let max_width = px(parent_style.max_width.unwrap_or(parent_box.width))
        - px(padding.left)
        - px(padding.right);

    let dataset = &mut doc.node_mut(element).dataset;
    dataset.insert("maxHeight".to_string(), max_height.to_string());
    dataset.insert("maxWidth".to_string(), max_width.to_string());
    dataset.insert("offsetWidth".to_string(), element_box.width.to_string());
    dataset.insert("offsetHeight".to_string(), element_box.height.to_string());

    let exceeds = element_box.height >= parent_box.height
        || element_box.width > parent_box.width
        || element_box.height > max_height
        || element_box.width > max_width;

    Some(BoundsCheck {
        element: element_box,
        parent: parent_box,
        max_height,
        max_width,
        exceeds,
    })
}

/// True if `element` is bigger than its parent's box or its parent's
/// computed max bounds. Parentless elements never exceed.
pub fn exceeds(doc: &mut Document, measurer: &dyn Measurer, element: NodeId) -> bool {
    match check(doc, measurer, element) {
        Some(result) => result.exceeds,
        None => {
            warn!(%element, "fit target has no parent; treating it as fitting");
            false
        }
    }
}

/// Offset sizes are whole pixels.
fn round(size: Size) -> Size {
    Size::new(size.width.round(), size.height.round())
}

/// Style lengths are read as integer pixels.
fn px(value: f64) -> f64 {
    value.trunc()
}
