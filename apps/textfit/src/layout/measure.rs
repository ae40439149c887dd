//! Box measurement: derives an element's offset size from the current
//! document state.
//!
//! The model is the minimum the fitter needs. Block boxes take the width of
//! their container; every other display mode shrinks to its content, clamped
//! between the longest word and the container width. Heights stack the
//! element's block-level children and the greedy-wrapped line boxes of its
//! inline content. Declared `width`/`height` win over content, `max-*`
//! clamps the content box, and padding is added on top (content-box sizing).

use crate::dom::{Display, Document, NodeId, Size};
use crate::layout::font_metrics::{get_metrics, LINE_HEIGHT};

/// Produces rendered box sizes for elements of a document.
pub trait Measurer: Send + Sync {
    /// Rendered size of `id` including its padding.
    fn offset_size(&self, doc: &Document, id: NodeId) -> Size;
}

/// Measurer backed by the static font-metric tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsMeasurer;

/// A word of inline content, already sized in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Word {
    width: f64,
    /// Space that separates this word from the previous one on the same line.
    space: f64,
    font_size: f64,
}

enum FlowItem {
    Word(Word),
    Block(NodeId),
}

impl Measurer for MetricsMeasurer {
    fn offset_size(&self, doc: &Document, id: NodeId) -> Size {
        let style = &doc.node(id).style;
        if style.display == Display::None {
            return Size::ZERO;
        }

        let width = self.content_width(doc, id);
        let mut height = style
            .height
            .unwrap_or_else(|| self.content_height(doc, id, width));
        if let Some(max) = style.max_height {
            height = height.min(max);
        }

        Size {
            width: width + style.padding.horizontal(),
            height: height + style.padding.vertical(),
        }
    }
}

impl MetricsMeasurer {
    fn content_width(&self, doc: &Document, id: NodeId) -> f64 {
        let style = &doc.node(id).style;
        let available = (self.available_width(doc, id) - style.padding.horizontal()).max(0.0);

        let mut width = match style.width {
            Some(width) => width,
            None if style.display == Display::Block => available,
            None => {
                let (min, max) = self.intrinsic_widths(doc, id);
                max.min(available).max(min)
            }
        };
        if let Some(max) = style.max_width {
            width = width.min(max);
        }
        width
    }

    /// Width of the containing block: the parent's content box, or the viewport.
    fn available_width(&self, doc: &Document, id: NodeId) -> f64 {
        match doc.parent(id) {
            Some(parent) => self.content_width(doc, parent),
            None => doc.viewport().width,
        }
    }

    fn content_height(&self, doc: &Document, id: NodeId, width: f64) -> f64 {
        let mut height = 0.0;
        let mut run: Vec<Word> = Vec::new();

        for item in flow_items(doc, id) {
            match item {
                FlowItem::Word(word) => run.push(word),
                FlowItem::Block(child) => {
                    height += wrapped_height(&run, width);
                    run.clear();
                    height += self.offset_size(doc, child).height;
                }
            }
        }
        height + wrapped_height(&run, width)
    }

    /// `(min-content, max-content)` widths of the content box.
    fn intrinsic_widths(&self, doc: &Document, id: NodeId) -> (f64, f64) {
        let mut min = 0.0_f64;
        let mut max = 0.0_f64;
        let mut run: Vec<Word> = Vec::new();

        for item in flow_items(doc, id) {
            match item {
                FlowItem::Word(word) => run.push(word),
                FlowItem::Block(child) => {
                    let (run_min, run_max) = run_widths(&run);
                    run.clear();
                    let child_style = &doc.node(child).style;
                    let (child_min, child_max) = match child_style.width {
                        Some(width) => (width, width),
                        None => self.intrinsic_widths(doc, child),
                    };
                    let padding = child_style.padding.horizontal();
                    min = min.max(run_min).max(child_min + padding);
                    max = max.max(run_max).max(child_max + padding);
                }
            }
        }
        let (run_min, run_max) = run_widths(&run);
        (min.max(run_min), max.max(run_max))
    }
}

/// Flattens the element's own text and inline descendants into words,
/// leaving block-level children as opaque boxes.
fn flow_items(doc: &Document, id: NodeId) -> Vec<FlowItem> {
    let mut items = Vec::new();
    push_words(doc, id, &mut items);
    for child in doc.children(id) {
        push_child(doc, *child, &mut items);
    }
    items
}

fn push_child(doc: &Document, id: NodeId, items: &mut Vec<FlowItem>) {
    let display = doc.node(id).style.display;
    if display == Display::None {
        return;
    }
    if display.is_block_level() {
        items.push(FlowItem::Block(id));
        return;
    }
    push_words(doc, id, items);
    for child in doc.children(id) {
        push_child(doc, *child, items);
    }
}

fn push_words(doc: &Document, id: NodeId, items: &mut Vec<FlowItem>) {
    let Some(text) = doc.node(id).text.as_deref() else {
        return;
    };
    let font_size = doc.computed_font_size(id);
    let metrics = get_metrics(doc.computed_font_family(id));
    let space = metrics.space_px(font_size);
    items.extend(text.split_whitespace().map(|word| {
        FlowItem::Word(Word {
            width: metrics.measure_px(word, font_size),
            space,
            font_size,
        })
    }));
}

/// Greedy word wrap; each line is as tall as its largest font.
fn wrapped_height(words: &[Word], max_width: f64) -> f64 {
    let mut height = 0.0;
    let mut line_width = 0.0_f64;
    let mut line_font = 0.0_f64;
    let mut first_on_line = true;

    for word in words {
        if !first_on_line && line_width + word.space + word.width > max_width {
            height += line_font * LINE_HEIGHT;
            line_width = word.width;
            line_font = word.font_size;
        } else {
            let space = if first_on_line { 0.0 } else { word.space };
            line_width += space + word.width;
            line_font = line_font.max(word.font_size);
            first_on_line = false;
        }
    }
    if !first_on_line {
        height += line_font * LINE_HEIGHT;
    }
    height
}

fn run_widths(words: &[Word]) -> (f64, f64) {
    let min = words.iter().map(|w| w.width).fold(0.0_f64, f64::max);
    let max = words
        .iter()
        .enumerate()
        .map(|(i, w)| if i == 0 { w.width } else { w.space + w.width })
        .sum::<f64>();
    (min, max)
}
