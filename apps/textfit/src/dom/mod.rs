//! In-process document model: an arena of element nodes with declared styles,
//! class lists and a dataset store.
//!
//! `NodeId`s are only meaningful for the document that issued them; indexing a
//! document with a foreign id panics, so ids coming from callers go through
//! `Document::contains` first.

pub mod selector;
pub mod tree;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::layout::font_metrics::FontFamily;

/// Root font size when no ancestor declares one.
pub const DEFAULT_FONT_SIZE: f64 = 16.0;

/// Viewport used when none is configured.
pub const DEFAULT_VIEWPORT: Size = Size {
    width: 1024.0,
    height: 768.0,
};

/// Index of a node inside its `Document`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Box size in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const ZERO: Size = Size {
        width: 0.0,
        height: 0.0,
    };

    pub fn new(width: f64, height: f64) -> Self {
        Size { width, height }
    }
}

/// Display mode of an element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Display {
    #[default]
    Block,
    Inline,
    InlineBlock,
    /// Sizes to its content and may overflow its container.
    Table,
    None,
}

impl Display {
    /// Block-level boxes start their own line inside the parent's flow.
    pub fn is_block_level(self) -> bool {
        matches!(self, Display::Block | Display::Table)
    }
}

/// Per-side lengths in pixels (padding).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Edges {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Edges {
    pub fn uniform(value: f64) -> Self {
        Edges {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }

    pub fn horizontal(&self) -> f64 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f64 {
        self.top + self.bottom
    }
}

/// Declared (inline) style of an element.
///
/// `None` lengths mean `auto` for width/height and `none` for the max sizes;
/// `None` font values inherit from the parent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Style {
    pub font_size: Option<f64>,
    pub font_family: Option<FontFamily>,
    pub display: Display,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub max_width: Option<f64>,
    pub max_height: Option<f64>,
    pub padding: Edges,
}

/// One element in the document.
#[derive(Debug, Clone)]
pub struct Node {
    pub tag: String,
    pub id_attr: Option<String>,
    pub classes: BTreeSet<String>,
    /// Text that precedes the element's children in its flow.
    pub text: Option<String>,
    pub style: Style,
    pub dataset: BTreeMap<String, String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn new(tag: impl Into<String>) -> Self {
        Node {
            tag: tag.into().to_ascii_lowercase(),
            id_attr: None,
            classes: BTreeSet::new(),
            text: None,
            style: Style::default(),
            dataset: BTreeMap::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id_attr = Some(id.into());
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.insert(class.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }

    pub fn add_class(&mut self, class: impl Into<String>) {
        self.classes.insert(class.into());
    }
}

/// Arena-backed element tree with a `body` root.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    viewport: Size,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self::with_viewport(DEFAULT_VIEWPORT)
    }

    pub fn with_viewport(viewport: Size) -> Self {
        Self::with_root(Node::new("body"), viewport)
    }

    pub fn with_root(root: Node, viewport: Size) -> Self {
        Document {
            nodes: vec![root],
            root: NodeId(0),
            viewport,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    /// Appends `node` as the last child of `parent` and returns its id.
    pub fn append(&mut self, parent: NodeId, mut node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.parent = Some(parent);
        node.children.clear();
        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// All descendants of `id` in document (pre-)order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// The root followed by every other node, in document order.
    pub fn document_order(&self) -> Vec<NodeId> {
        let mut out = vec![self.root];
        out.extend(self.descendants(self.root));
        out
    }

    pub fn element_by_id(&self, id_attr: &str) -> Option<NodeId> {
        self.document_order()
            .into_iter()
            .find(|id| self.node(*id).id_attr.as_deref() == Some(id_attr))
    }

    pub fn computed_font_size(&self, id: NodeId) -> f64 {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.node(node_id);
            if let Some(size) = node.style.font_size {
                return size;
            }
            current = node.parent;
        }
        DEFAULT_FONT_SIZE
    }

    pub fn computed_font_family(&self, id: NodeId) -> FontFamily {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.node(node_id);
            if let Some(family) = node.style.font_family {
                return family;
            }
            current = node.parent;
        }
        FontFamily::default()
    }
}

/// A document shared between the fitting sessions of a batch.
///
/// The lock is taken per measurement step and never held across an await.
pub type SharedDocument = Arc<Mutex<Document>>;

pub fn share(document: Document) -> SharedDocument {
    Arc::new(Mutex::new(document))
}

/// Locks a shared document, recovering the data if a previous holder panicked.
pub fn lock_document(document: &SharedDocument) -> MutexGuard<'_, Document> {
    document.lock().unwrap_or_else(PoisonError::into_inner)
}
