//! Selector subset used to resolve fit targets.
//!
//! Supported: `*`, type selectors, `#id`, `.class`, compounds of those
//! (`p.lead#intro`), the descendant (whitespace) and child (`>`) combinators,
//! and comma-separated selector lists. Matching is case-sensitive for ids and
//! classes and case-insensitive for tag names.

use std::str::FromStr;

use thiserror::Error;

use crate::dom::{Document, Node, NodeId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,

    #[error("unexpected character '{ch}' at position {position}")]
    UnexpectedChar { ch: char, position: usize },

    #[error("combinator without a selector on both sides")]
    DanglingCombinator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
}

impl Compound {
    fn matches(&self, node: &Node) -> bool {
        if let Some(tag) = &self.tag {
            if node.tag != *tag {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if node.id_attr.as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        self.classes.iter().all(|class| node.has_class(class))
    }
}

/// `compounds[i]` and `compounds[i + 1]` are joined by `combinators[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ComplexSelector {
    compounds: Vec<Compound>,
    combinators: Vec<Combinator>,
}

impl ComplexSelector {
    fn matches(&self, doc: &Document, id: NodeId) -> bool {
        let Some(last) = self.compounds.len().checked_sub(1) else {
            return false;
        };
        self.compounds[last].matches(doc.node(id)) && self.matches_ancestors(doc, id, last)
    }

    /// `compounds[index]` matched at `id`; match the remaining compounds leftwards.
    fn matches_ancestors(&self, doc: &Document, id: NodeId, index: usize) -> bool {
        if index == 0 {
            return true;
        }
        let wanted = &self.compounds[index - 1];
        match self.combinators[index - 1] {
            Combinator::Child => match doc.parent(id) {
                Some(parent) if wanted.matches(doc.node(parent)) => {
                    self.matches_ancestors(doc, parent, index - 1)
                }
                _ => false,
            },
            Combinator::Descendant => {
                let mut current = doc.parent(id);
                while let Some(ancestor) = current {
                    if wanted.matches(doc.node(ancestor))
                        && self.matches_ancestors(doc, ancestor, index - 1)
                    {
                        return true;
                    }
                    current = doc.parent(ancestor);
                }
                false
            }
        }
    }
}

/// A parsed, comma-separated selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList(Vec<ComplexSelector>);

impl SelectorList {
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        input
            .split(',')
            .map(|part| parse_complex(part.trim()))
            .collect::<Result<Vec<_>, _>>()
            .map(SelectorList)
    }

    pub fn matches(&self, doc: &Document, id: NodeId) -> bool {
        self.0.iter().any(|selector| selector.matches(doc, id))
    }

    /// Every matching node in document order, the root included.
    pub fn query_all(&self, doc: &Document) -> Vec<NodeId> {
        doc.document_order()
            .into_iter()
            .filter(|id| self.matches(doc, *id))
            .collect()
    }
}

impl FromStr for SelectorList {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SelectorList::parse(s)
    }
}

/// Parses `selector` and returns every matching node in document order.
pub fn query_selector_all(doc: &Document, selector: &str) -> Result<Vec<NodeId>, SelectorError> {
    Ok(SelectorList::parse(selector)?.query_all(doc))
}

fn parse_complex(input: &str) -> Result<ComplexSelector, SelectorError> {
    if input.is_empty() {
        return Err(SelectorError::Empty);
    }

    let chars: Vec<char> = input.chars().collect();
    let mut pos = 0;
    let mut compounds = Vec::new();
    let mut combinators = Vec::new();
    let mut pending: Option<Combinator> = None;

    loop {
        while pos < chars.len() && chars[pos].is_whitespace() {
            pos += 1;
        }
        if pos >= chars.len() {
            break;
        }

        if chars[pos] == '>' {
            if compounds.is_empty() || pending.is_some() {
                return Err(SelectorError::DanglingCombinator);
            }
            pending = Some(Combinator::Child);
            pos += 1;
            continue;
        }

        if !compounds.is_empty() {
            // The previous compound stopped at whitespace or '>', so no explicit
            // combinator means a descendant one.
            combinators.push(pending.take().unwrap_or(Combinator::Descendant));
        }
        let (compound, next) = parse_compound(&chars, pos)?;
        compounds.push(compound);
        pos = next;
    }

    if pending.is_some() {
        return Err(SelectorError::DanglingCombinator);
    }

    Ok(ComplexSelector {
        compounds,
        combinators,
    })
}

fn parse_compound(chars: &[char], start: usize) -> Result<(Compound, usize), SelectorError> {
    let mut compound = Compound::default();
    let mut pos = start;

    if chars[pos] == '*' {
        pos += 1;
    } else if is_ident_char(chars[pos]) {
        let (ident, next) = read_ident(chars, pos);
        compound.tag = Some(ident.to_ascii_lowercase());
        pos = next;
    }

    while pos < chars.len() {
        match chars[pos] {
            '#' | '.' => {
                let marker = chars[pos];
                let (ident, next) = read_ident(chars, pos + 1);
                if ident.is_empty() {
                    return Err(SelectorError::UnexpectedChar {
                        ch: marker,
                        position: pos,
                    });
                }
                if marker == '#' {
                    compound.id = Some(ident);
                } else {
                    compound.classes.push(ident);
                }
                pos = next;
            }
            c if c.is_whitespace() || c == '>' => break,
            c => {
                return Err(SelectorError::UnexpectedChar {
                    ch: c,
                    position: pos,
                })
            }
        }
    }

    if pos == start {
        return Err(SelectorError::UnexpectedChar {
            ch: chars[start],
            position: start,
        });
    }
    Ok((compound, pos))
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn read_ident(chars: &[char], start: usize) -> (String, usize) {
    let mut end = start;
    while end < chars.len() && is_ident_char(chars[end]) {
        end += 1;
    }
    (chars[start..end].iter().collect(), end)
}
