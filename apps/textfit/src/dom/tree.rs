//! Serde boundary for documents: building a `Document` from a nested JSON
//! element tree and snapshotting fitted elements back out.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::dom::{Document, Node, NodeId, Size, Style};

/// Nested description of an element and its subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementSpec {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub text: Option<String>,
    pub style: Style,
    pub children: Vec<ElementSpec>,
}

impl Default for ElementSpec {
    fn default() -> Self {
        ElementSpec {
            tag: "div".to_string(),
            id: None,
            classes: Vec::new(),
            text: None,
            style: Style::default(),
            children: Vec::new(),
        }
    }
}

impl ElementSpec {
    fn to_node(&self) -> Node {
        let mut node = Node::new(self.tag.as_str()).with_style(self.style.clone());
        node.id_attr = self.id.clone();
        node.text = self.text.clone();
        node.classes.extend(self.classes.iter().cloned());
        node
    }
}

impl Document {
    /// Builds a document whose root is `root`.
    pub fn from_spec(root: &ElementSpec, viewport: Size) -> Self {
        let mut doc = Document::with_root(root.to_node(), viewport);
        let root_id = doc.root();
        for child in &root.children {
            append_spec(&mut doc, root_id, child);
        }
        doc
    }
}

fn append_spec(doc: &mut Document, parent: NodeId, spec: &ElementSpec) {
    let id = doc.append(parent, spec.to_node());
    for child in &spec.children {
        append_spec(doc, id, child);
    }
}

/// Observable state of one element after a fit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementSnapshot {
    pub node: NodeId,
    pub id: Option<String>,
    pub tag: String,
    pub font_size: f64,
    pub classes: Vec<String>,
    pub style: Style,
    pub dataset: BTreeMap<String, String>,
}

impl ElementSnapshot {
    pub fn capture(doc: &Document, node: NodeId) -> Self {
        let element = doc.node(node);
        ElementSnapshot {
            node,
            id: element.id_attr.clone(),
            tag: element.tag.clone(),
            font_size: doc.computed_font_size(node),
            classes: element.classes.iter().cloned().collect(),
            style: element.style.clone(),
            dataset: element.dataset.clone(),
        }
    }
}
