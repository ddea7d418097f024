use crate::attrs::Attrs;
use crate::error::{ModelError, ModelResult};
use crate::fragment::Fragment;
use crate::mark::Mark;
use crate::replace::replace;
use crate::resolved::ResolvedPos;
use crate::schema::{MarkType, NodeType};
use crate::slice::Slice;
use serde_json::Value;
use std::sync::Arc;

/// Substring by char offsets.
pub(crate) fn char_slice(text: &str, from: usize, to: usize) -> String {
    text.chars().skip(from).take(to.saturating_sub(from)).collect()
}

/// A node in a document tree.
///
/// Nodes are persistent values: every edit produces new nodes and shares
/// untouched children with the old tree.
///
/// Positions inside a node count one token per text character (Unicode
/// scalar value) and per node boundary. A leaf node has size 1.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    kind: Arc<NodeType>,
    attrs: Attrs,
    content: Fragment,
    marks: Vec<Mark>,
    text: Option<String>,
}

impl Node {
    pub(crate) fn new(kind: Arc<NodeType>, attrs: Attrs, content: Fragment, marks: Vec<Mark>) -> Self {
        Self {
            kind,
            attrs,
            content,
            marks,
            text: None,
        }
    }

    pub(crate) fn new_text(kind: Arc<NodeType>, text: String, marks: Vec<Mark>) -> Self {
        Self {
            kind,
            attrs: Attrs::new(),
            content: Fragment::empty(),
            marks,
            text: Some(text),
        }
    }

    pub fn kind(&self) -> &Arc<NodeType> {
        &self.kind
    }

    pub fn type_name(&self) -> &str {
        self.kind.name()
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }

    /// String attribute, treating `null` as absent.
    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).and_then(Value::as_str)
    }

    pub fn content(&self) -> &Fragment {
        &self.content
    }

    pub fn marks(&self) -> &[Mark] {
        &self.marks
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn text_len(&self) -> usize {
        self.text.as_deref().map(|t| t.chars().count()).unwrap_or(0)
    }

    pub fn is_text(&self) -> bool {
        self.text.is_some()
    }

    pub fn is_inline(&self) -> bool {
        self.kind.is_inline()
    }

    pub fn is_block(&self) -> bool {
        self.kind.is_block()
    }

    pub fn is_textblock(&self) -> bool {
        self.kind.is_textblock()
    }

    pub fn is_leaf(&self) -> bool {
        self.kind.is_leaf()
    }

    pub fn is_atom(&self) -> bool {
        self.kind.is_atom()
    }

    pub fn node_size(&self) -> usize {
        match &self.text {
            Some(text) => text.chars().count(),
            None if self.kind.is_leaf() => 1,
            None => self.content.size() + 2,
        }
    }

    pub fn child_count(&self) -> usize {
        self.content.child_count()
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.content.child(index)
    }

    pub fn first_child(&self) -> Option<&Node> {
        self.content.first_child()
    }

    pub fn last_child(&self) -> Option<&Node> {
        self.content.last_child()
    }

    pub fn text_content(&self) -> String {
        match &self.text {
            Some(text) => text.clone(),
            None => self.content.text_between(0, self.content.size(), ""),
        }
    }

    /// Same kind, attributes and marks.
    pub fn same_markup(&self, other: &Node) -> bool {
        self.has_markup(&other.kind, &other.attrs, &other.marks)
    }

    pub fn has_markup(&self, kind: &NodeType, attrs: &Attrs, marks: &[Mark]) -> bool {
        *self.kind == *kind && self.attrs == *attrs && Mark::same_set(&self.marks, marks)
    }

    /// Copy of this node with different content.
    pub fn copy(&self, content: Fragment) -> Node {
        Node {
            kind: self.kind.clone(),
            attrs: self.attrs.clone(),
            content,
            marks: self.marks.clone(),
            text: self.text.clone(),
        }
    }

    pub fn mark(&self, marks: Vec<Mark>) -> Node {
        Node {
            marks,
            ..self.clone()
        }
    }

    pub fn with_text(&self, text: String) -> Node {
        Node {
            text: Some(text),
            ..self.clone()
        }
    }

    pub fn with_attrs(&self, attrs: Attrs) -> Node {
        Node {
            attrs,
            ..self.clone()
        }
    }

    /// The part of this node between two inner offsets.
    pub fn cut(&self, from: usize, to: usize) -> Node {
        match &self.text {
            Some(text) => {
                if from == 0 && to >= self.text_len() {
                    self.clone()
                } else {
                    self.with_text(char_slice(text, from, to))
                }
            }
            None => {
                if from == 0 && to >= self.content.size() {
                    self.clone()
                } else {
                    self.copy(self.content.cut(from, to))
                }
            }
        }
    }

    pub fn resolve(&self, pos: usize) -> ModelResult<ResolvedPos> {
        ResolvedPos::resolve(self, pos)
    }

    /// Cut a slice between two positions, opening as deep as the shared
    /// ancestor allows.
    pub fn slice(&self, from: usize, to: usize) -> ModelResult<Slice> {
        if from == to {
            return Ok(Slice::empty());
        }
        let rfrom = self.resolve(from)?;
        let rto = self.resolve(to)?;
        let depth = rfrom.shared_depth(to);
        let start = rfrom.start(depth);
        let node = rfrom.node(depth);
        let content = node.content().cut(from - start, to - start);
        Ok(Slice::new(content, rfrom.depth() - depth, rto.depth() - depth))
    }

    /// Replace `from..to` with a slice, producing a new tree.
    ///
    /// Fails when the slice does not fit or the result violates a content
    /// expression.
    pub fn replace(&self, from: usize, to: usize, slice: &Slice) -> ModelResult<Node> {
        let rfrom = self.resolve(from)?;
        let rto = self.resolve(to)?;
        replace(&rfrom, &rto, slice)
    }

    /// The node starting directly at `pos`, if any.
    pub fn node_at(&self, pos: usize) -> Option<&Node> {
        let mut node = self;
        let mut pos = pos;
        loop {
            let (index, offset) = node.content.find_index(pos).ok()?;
            node = node.content.child(index)?;
            if offset == pos || node.is_text() {
                return Some(node);
            }
            pos -= offset + 1;
        }
    }

    pub fn nodes_between<F>(&self, from: usize, to: usize, mut f: F)
    where
        F: FnMut(&Node, usize, Option<&Node>, usize) -> bool,
    {
        self.content.nodes_between(from, to, &mut f, 0, Some(self));
    }

    /// Visit every descendant with its position.
    pub fn descendants<F>(&self, f: F)
    where
        F: FnMut(&Node, usize, Option<&Node>, usize) -> bool,
    {
        self.nodes_between(0, self.content.size(), f)
    }

    pub fn text_between(&self, from: usize, to: usize, block_separator: &str) -> String {
        self.content.text_between(from, to, block_separator)
    }

    /// Whether any inline content in `from..to` carries a mark of `kind`.
    pub fn range_has_mark(&self, from: usize, to: usize, kind: &MarkType) -> bool {
        let mut found = false;
        if to > from {
            self.nodes_between(from, to, |node: &Node, _: usize, _: Option<&Node>, _: usize| {
                if kind.is_in_set(node.marks()).is_some() {
                    found = true;
                }
                !found
            });
        }
        found
    }

    /// Whether replacing children `from..to` with `replacement` keeps the
    /// content valid.
    pub fn can_replace(&self, from: usize, to: usize, replacement: &Fragment) -> bool {
        let before = self.content.nodes()[..from.min(self.child_count())]
            .iter()
            .map(|c| c.kind().index());
        let middle = replacement.iter().map(|c| c.kind().index());
        let after = self.content.nodes()[to.min(self.child_count())..]
            .iter()
            .map(|c| c.kind().index());
        self.kind.content_expr().matches(before.chain(middle).chain(after))
            && replacement.iter().all(|c| self.kind.allows_marks(c.marks()))
    }

    /// Whether children `from..to` can be replaced by one node of `kind`.
    pub fn can_replace_with(&self, from: usize, to: usize, kind: &NodeType) -> bool {
        let before = self.content.nodes()[..from.min(self.child_count())]
            .iter()
            .map(|c| c.kind().index());
        let after = self.content.nodes()[to.min(self.child_count())..]
            .iter()
            .map(|c| c.kind().index());
        self.kind
            .content_expr()
            .matches(before.chain(std::iter::once(kind.index())).chain(after))
    }

    /// Validate the whole subtree against the schema.
    pub fn check(&self) -> ModelResult<()> {
        if self.is_text() {
            if self.text.as_deref() == Some("") {
                return Err(ModelError::EmptyText);
            }
            return Ok(());
        }
        self.kind.check_content(&self.content)?;
        let mut marks: Vec<Mark> = Vec::new();
        for mark in &self.marks {
            marks = mark.add_to_set(&marks);
        }
        if marks != self.marks {
            return Err(ModelError::InvalidContent(format!(
                "{} (invalid mark set)",
                self.type_name()
            )));
        }
        for child in self.content.iter() {
            for mark in child.marks() {
                if !self.kind.allows_mark_type(mark.kind()) {
                    return Err(ModelError::MarkNotAllowed {
                        mark: mark.type_name().to_string(),
                        node: self.type_name().to_string(),
                    });
                }
            }
            child.check()?;
        }
        Ok(())
    }
}
