//! Selections.
//!
//! A selection is a plain position range; it is mapped through every
//! transaction and validated against the resulting document.

use crate::mapping::Mapping;
use paper_model::{Node, ResolvedPos};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// A caret or text range; both ends point into inline content.
    Text { anchor: usize, head: usize },

    /// A single selected node spanning `from..to`.
    Node { from: usize, to: usize },

    /// The whole document.
    All { to: usize },
}

impl Selection {
    pub fn text(anchor: usize, head: usize) -> Self {
        Selection::Text { anchor, head }
    }

    pub fn cursor(pos: usize) -> Self {
        Selection::Text {
            anchor: pos,
            head: pos,
        }
    }

    /// Select the node starting at `pos`.
    pub fn node(doc: &Node, pos: usize) -> Option<Self> {
        let node = doc.node_at(pos).filter(|node| !node.is_text())?;
        Some(Selection::Node {
            from: pos,
            to: pos + node.node_size(),
        })
    }

    pub fn all(doc: &Node) -> Self {
        Selection::All {
            to: doc.content().size(),
        }
    }

    pub fn anchor(&self) -> usize {
        match self {
            Selection::Text { anchor, .. } => *anchor,
            Selection::Node { from, .. } => *from,
            Selection::All { .. } => 0,
        }
    }

    pub fn head(&self) -> usize {
        match self {
            Selection::Text { head, .. } => *head,
            Selection::Node { to, .. } | Selection::All { to } => *to,
        }
    }

    pub fn from(&self) -> usize {
        self.anchor().min(self.head())
    }

    pub fn to(&self) -> usize {
        self.anchor().max(self.head())
    }

    pub fn is_empty(&self) -> bool {
        self.from() == self.to()
    }

    /// The caret position of an empty text selection.
    pub fn cursor_pos(&self) -> Option<usize> {
        match self {
            Selection::Text { anchor, head } if anchor == head => Some(*head),
            _ => None,
        }
    }

    /// Whether this selection still makes sense in `doc`.
    pub fn is_valid(&self, doc: &Node) -> bool {
        let size = doc.content().size();
        match self {
            Selection::Text { anchor, head } => {
                *anchor <= size
                    && *head <= size
                    && in_inline_content(doc, *anchor)
                    && in_inline_content(doc, *head)
            }
            Selection::Node { from, to } => {
                Selection::node(doc, *from) == Some(Selection::Node { from: *from, to: *to })
            }
            Selection::All { to } => *to == size,
        }
    }

    /// Map through a transaction's steps onto `doc`, the document after
    /// them.
    pub fn map(&self, doc: &Node, mapping: &Mapping) -> Selection {
        match self {
            Selection::Text { anchor, head } => {
                let head = mapping.map(*head, 1).min(doc.content().size());
                let anchor = mapping.map(*anchor, 1).min(doc.content().size());
                if !in_inline_content(doc, head) {
                    return Selection::near(doc, head, 1);
                }
                if in_inline_content(doc, anchor) {
                    Selection::text(anchor, head)
                } else {
                    Selection::cursor(head)
                }
            }
            Selection::Node { from, .. } => {
                let mapped = mapping.map_result(*from, 1);
                let pos = mapped.pos.min(doc.content().size());
                match Selection::node(doc, pos) {
                    Some(selection) if !mapped.deleted() => selection,
                    _ => Selection::near(doc, pos, 1),
                }
            }
            Selection::All { .. } => Selection::all(doc),
        }
    }

    /// The closest valid selection to `pos`, searching in direction `bias`
    /// first.
    pub fn near(doc: &Node, pos: usize, bias: isize) -> Selection {
        let resolved = match doc.resolve(pos.min(doc.content().size())) {
            Ok(resolved) => resolved,
            Err(_) => return Selection::all(doc),
        };
        find_from(&resolved, bias)
            .or_else(|| find_from(&resolved, -bias))
            .unwrap_or_else(|| Selection::all(doc))
    }

    /// First valid position in the document.
    pub fn at_start(doc: &Node) -> Selection {
        find_selection_in(doc, 0, 0, 1).unwrap_or_else(|| Selection::all(doc))
    }

    pub fn at_end(doc: &Node) -> Selection {
        let size = doc.content().size() as isize;
        find_selection_in(doc, size, doc.child_count(), -1).unwrap_or_else(|| Selection::all(doc))
    }
}

fn in_inline_content(doc: &Node, pos: usize) -> bool {
    doc.resolve(pos)
        .map(|resolved| resolved.parent().kind().inline_content())
        .unwrap_or(false)
}

fn find_from(pos: &ResolvedPos, dir: isize) -> Option<Selection> {
    if pos.parent().kind().inline_content() {
        return Some(Selection::cursor(pos.pos()));
    }
    if let Some(found) = find_selection_in(
        pos.parent(),
        pos.pos() as isize,
        pos.index(pos.depth()),
        dir,
    ) {
        return Some(found);
    }
    for depth in (0..pos.depth()).rev() {
        let found = if dir < 0 {
            find_selection_in(
                pos.node(depth),
                pos.before(depth + 1) as isize,
                pos.index(depth),
                dir,
            )
        } else {
            find_selection_in(
                pos.node(depth),
                pos.after(depth + 1) as isize,
                pos.index(depth) + 1,
                dir,
            )
        };
        if found.is_some() {
            return found;
        }
    }
    None
}

/// Search `node`'s children from `index` in direction `dir`; `pos` is the
/// document position at that child boundary.
fn find_selection_in(node: &Node, pos: isize, index: usize, dir: isize) -> Option<Selection> {
    if node.kind().inline_content() {
        return Some(Selection::cursor(pos.max(0) as usize));
    }
    let mut pos = pos;
    let mut i = index as isize - if dir > 0 { 0 } else { 1 };
    while i >= 0 && (i as usize) < node.child_count() {
        let child = node.child(i as usize)?;
        let size = child.node_size() as isize;
        if !child.is_atom() {
            let start = if dir < 0 { child.child_count() } else { 0 };
            if let Some(inner) = find_selection_in(child, pos + dir, start, dir) {
                return Some(inner);
            }
        } else if !child.is_text() {
            let from = if dir < 0 { pos - size } else { pos };
            return Some(Selection::Node {
                from: from as usize,
                to: (from + size) as usize,
            });
        }
        pos += size * dir;
        i += dir;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::StepMap;
    use paper_model::{NodeSpec, Schema, SchemaSpec};
    use std::sync::Arc;

    fn schema() -> Arc<Schema> {
        Schema::new(
            SchemaSpec::default()
                .node("doc", NodeSpec::new().content("block+"))
                .node("paragraph", NodeSpec::new().content("text*").group("block"))
                .node("quote", NodeSpec::new().content("block+").group("block"))
                .node("rule", NodeSpec::new().group("block"))
                .node("text", NodeSpec::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_at_start_finds_first_textblock() {
        let schema = schema();
        let para = schema
            .node("paragraph", None, vec![schema.text("hi", vec![]).unwrap()])
            .unwrap();
        let quote = schema.node("quote", None, vec![para.clone()]).unwrap();
        let doc = schema.node("doc", None, vec![quote, para]).unwrap();

        assert_eq!(Selection::at_start(&doc), Selection::cursor(2));
        assert_eq!(Selection::at_end(&doc), Selection::cursor(doc.content().size() - 1));
    }

    #[test]
    fn test_near_skips_to_selectable_leaf() {
        let schema = schema();
        let rule = schema.node("rule", None, vec![]).unwrap();
        let doc = schema.node("doc", None, vec![rule]).unwrap();

        assert_eq!(Selection::near(&doc, 0, 1), Selection::Node { from: 0, to: 1 });
        assert!(Selection::Node { from: 0, to: 1 }.is_valid(&doc));
        assert!(!Selection::cursor(0).is_valid(&doc));
    }

    #[test]
    fn test_map_falls_back_when_content_deleted() {
        let schema = schema();
        let para = |t: &str| {
            schema
                .node("paragraph", None, vec![schema.text(t, vec![]).unwrap()])
                .unwrap()
        };
        // <p>ab</p><p>cd</p>, caret in the second paragraph
        let before = schema.node("doc", None, vec![para("ab"), para("cd")]).unwrap();
        let after = before.replace(4, 8, &paper_model::Slice::empty()).unwrap();
        let mapping = Mapping::from_maps(vec![StepMap::offset(4, 4, 0)]);

        let mapped = Selection::cursor(6).map(&after, &mapping);
        assert_eq!(mapped, Selection::cursor(3));
        assert!(mapped.is_valid(&after));
        assert!(!Selection::cursor(6).is_valid(&after));
    }

    #[test]
    fn test_range_accessors() {
        let sel = Selection::text(9, 3);
        assert_eq!((sel.from(), sel.to()), (3, 9));
        assert!(!sel.is_empty());
        assert_eq!(sel.cursor_pos(), None);
        assert_eq!(Selection::cursor(4).cursor_pos(), Some(4));
    }
}
