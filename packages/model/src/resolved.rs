use crate::error::{ModelError, ModelResult};
use crate::mark::Mark;
use crate::node::Node;

#[derive(Clone, Debug)]
struct PathEntry {
    node: Node,
    index: usize,
    offset: usize,
}

/// A document position with the chain of ancestors that contains it.
///
/// Depth 0 is the root; `depth()` is the innermost node the position
/// points into.
#[derive(Clone, Debug)]
pub struct ResolvedPos {
    pos: usize,
    path: Vec<PathEntry>,
    parent_offset: usize,
}

impl ResolvedPos {
    pub fn resolve(doc: &Node, pos: usize) -> ModelResult<Self> {
        if pos > doc.content().size() {
            return Err(ModelError::out_of_range(pos, doc.content().size()));
        }
        let mut path = Vec::new();
        let mut start = 0;
        let mut parent_offset = pos;
        let mut node = doc;
        loop {
            let (index, offset) = node.content().find_index(parent_offset)?;
            let rem = parent_offset - offset;
            path.push(PathEntry {
                node: node.clone(),
                index,
                offset: start + offset,
            });
            if rem == 0 {
                break;
            }
            node = match node.child(index) {
                Some(child) => child,
                None => break,
            };
            if node.is_text() {
                break;
            }
            parent_offset = rem - 1;
            start += offset + 1;
        }
        Ok(Self {
            pos,
            path,
            parent_offset,
        })
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn depth(&self) -> usize {
        self.path.len() - 1
    }

    pub fn parent_offset(&self) -> usize {
        self.parent_offset
    }

    /// The innermost node containing the position.
    pub fn parent(&self) -> &Node {
        self.node(self.depth())
    }

    pub fn doc(&self) -> &Node {
        self.node(0)
    }

    pub fn node(&self, depth: usize) -> &Node {
        &self.path[depth.min(self.depth())].node
    }

    pub fn index(&self, depth: usize) -> usize {
        self.path[depth.min(self.depth())].index
    }

    pub fn index_after(&self, depth: usize) -> usize {
        let extra = if depth == self.depth() && self.text_offset() == 0 {
            0
        } else {
            1
        };
        self.index(depth) + extra
    }

    /// Position at the start of the node at `depth`'s content.
    pub fn start(&self, depth: usize) -> usize {
        if depth == 0 {
            0
        } else {
            self.path[depth - 1].offset + 1
        }
    }

    pub fn end(&self, depth: usize) -> usize {
        self.start(depth) + self.node(depth).content().size()
    }

    /// Position directly before the node at `depth` (depth > 0).
    pub fn before(&self, depth: usize) -> usize {
        if depth == self.depth() + 1 {
            self.pos
        } else {
            self.path[depth.saturating_sub(1)].offset
        }
    }

    /// Position directly after the node at `depth` (depth > 0).
    pub fn after(&self, depth: usize) -> usize {
        if depth == self.depth() + 1 {
            self.pos
        } else {
            self.path[depth.saturating_sub(1)].offset + self.node(depth).node_size()
        }
    }

    /// Offset into a text node when the position points inside one.
    pub fn text_offset(&self) -> usize {
        self.pos - self.path[self.depth()].offset
    }

    pub fn node_after(&self) -> Option<Node> {
        let parent = self.parent();
        let index = self.index(self.depth());
        let child = parent.child(index)?;
        let offset = self.text_offset();
        Some(if offset > 0 {
            child.cut(offset, child.text_len())
        } else {
            child.clone()
        })
    }

    pub fn node_before(&self) -> Option<Node> {
        let parent = self.parent();
        let index = self.index(self.depth());
        let offset = self.text_offset();
        if offset > 0 {
            return parent.child(index).map(|child| child.cut(0, offset));
        }
        if index == 0 {
            None
        } else {
            parent.child(index - 1).cloned()
        }
    }

    /// Marks that text inserted here would inherit.
    pub fn marks(&self) -> Vec<Mark> {
        let parent = self.parent();
        let index = self.index(self.depth());
        if parent.content().size() == 0 {
            return Vec::new();
        }
        if self.text_offset() > 0 {
            return parent
                .child(index)
                .map(|child| child.marks().to_vec())
                .unwrap_or_default();
        }
        let before = if index > 0 { parent.child(index - 1) } else { None };
        let after = parent.child(index);
        let (main, other) = match before {
            Some(before) => (Some(before), after),
            None => (after, None),
        };
        let main = match main {
            Some(main) => main,
            None => return Vec::new(),
        };
        let mut marks = main.marks().to_vec();
        for mark in main.marks() {
            let kept_by_other = other.map(|o| mark.is_in_set(o.marks())).unwrap_or(false);
            if !mark.kind().is_inclusive() && !kept_by_other {
                marks = mark.remove_from_set(&marks);
            }
        }
        marks
    }

    /// Deepest depth whose node contains both this position and `pos`.
    pub fn shared_depth(&self, pos: usize) -> usize {
        for depth in (1..=self.depth()).rev() {
            if self.start(depth) <= pos && self.end(depth) >= pos {
                return depth;
            }
        }
        0
    }

    pub fn same_parent(&self, other: &ResolvedPos) -> bool {
        self.pos - self.parent_offset == other.pos - other.parent_offset
    }

    /// Depth of the innermost ancestor matching `pred`.
    pub fn find_ancestor(&self, mut pred: impl FnMut(&Node) -> bool) -> Option<usize> {
        (0..=self.depth()).rev().find(|depth| pred(self.node(*depth)))
    }

    /// The range of sibling blocks around this position and `other`.
    ///
    /// Starts from the block around the position (or the textblock's
    /// parent when the position is inline) and walks outwards until one
    /// node contains both ends.
    pub fn block_range(&self, other: &ResolvedPos) -> Option<NodeRange> {
        if other.pos < self.pos {
            return other.block_range(self);
        }
        let skip = usize::from(self.parent().kind().inline_content() || self.pos == other.pos);
        let top = self.depth().checked_sub(skip)?;
        (0..=top)
            .rev()
            .find(|depth| other.pos <= self.end(*depth))
            .map(|depth| NodeRange {
                from: self.clone(),
                to: other.clone(),
                depth,
            })
    }
}

/// A flat run of sibling nodes at `depth`, between two resolved positions.
#[derive(Clone, Debug)]
pub struct NodeRange {
    from: ResolvedPos,
    to: ResolvedPos,
    depth: usize,
}

impl NodeRange {
    pub fn from(&self) -> &ResolvedPos {
        &self.from
    }

    pub fn to(&self) -> &ResolvedPos {
        &self.to
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Position before the first node in the range.
    pub fn start(&self) -> usize {
        self.from.before(self.depth + 1)
    }

    /// Position after the last node in the range.
    pub fn end(&self) -> usize {
        self.to.after(self.depth + 1)
    }

    pub fn parent(&self) -> &Node {
        self.from.node(self.depth)
    }

    pub fn start_index(&self) -> usize {
        self.from.index(self.depth)
    }

    pub fn end_index(&self) -> usize {
        self.to.index_after(self.depth)
    }
}

#[cfg(test)]
mod tests {
    use crate::schema::{NodeSpec, Schema, SchemaSpec};

    #[test]
    fn test_resolve_inside_text() {
        let schema = Schema::new(
            SchemaSpec::default()
                .node("doc", NodeSpec::new().content("block+"))
                .node("paragraph", NodeSpec::new().content("text*").group("block"))
                .node("quote", NodeSpec::new().content("block+").group("block"))
                .node("text", NodeSpec::new()),
        )
        .unwrap();
        let para = schema
            .node("paragraph", None, vec![schema.text("abc", vec![]).unwrap()])
            .unwrap();
        let quote = schema.node("quote", None, vec![para.clone()]).unwrap();
        let doc = schema.node("doc", None, vec![para, quote]).unwrap();

        // <p>abc</p><quote><p>abc</p></quote>
        let pos = doc.resolve(2).unwrap();
        assert_eq!(pos.depth(), 1);
        assert_eq!(pos.parent().type_name(), "paragraph");
        assert_eq!(pos.parent_offset(), 1);
        assert_eq!(pos.text_offset(), 1);
        assert_eq!(pos.start(1), 1);
        assert_eq!(pos.end(1), 4);
        assert_eq!(pos.before(1), 0);
        assert_eq!(pos.after(1), 5);
        assert_eq!(pos.node_before().unwrap().text(), Some("a"));
        assert_eq!(pos.node_after().unwrap().text(), Some("bc"));

        let inner = doc.resolve(8).unwrap();
        assert_eq!(inner.depth(), 2);
        assert_eq!(inner.node(1).type_name(), "quote");
        assert_eq!(inner.start(2), 7);
        assert_eq!(inner.before(2), 6);
        assert_eq!(inner.shared_depth(9), 2);
        assert_eq!(inner.shared_depth(3), 0);

        let boundary = doc.resolve(5).unwrap();
        assert_eq!(boundary.depth(), 0);
        assert_eq!(boundary.index(0), 1);
        assert_eq!(boundary.node_after().unwrap().type_name(), "quote");
        assert_eq!(boundary.node_before().unwrap().type_name(), "paragraph");

        assert!(doc.resolve(100).is_err());
    }

    #[test]
    fn test_block_range() {
        let schema = Schema::new(
            SchemaSpec::default()
                .node("doc", NodeSpec::new().content("block+"))
                .node("paragraph", NodeSpec::new().content("text*").group("block"))
                .node("quote", NodeSpec::new().content("block+").group("block"))
                .node("text", NodeSpec::new()),
        )
        .unwrap();
        let para = |t: &str| {
            schema
                .node("paragraph", None, vec![schema.text(t, vec![]).unwrap()])
                .unwrap()
        };
        let quote = schema.node("quote", None, vec![para("ab"), para("cd")]).unwrap();
        let doc = schema.node("doc", None, vec![para("xy"), quote]).unwrap();

        // <p>xy</p><quote><p>ab</p><p>cd</p></quote>
        let caret = doc.resolve(7).unwrap();
        let range = caret.block_range(&caret).unwrap();
        assert_eq!(range.depth(), 1);
        assert_eq!(range.parent().type_name(), "quote");
        assert_eq!((range.start(), range.end()), (5, 9));
        assert_eq!((range.start_index(), range.end_index()), (0, 1));

        let across = doc.resolve(2).unwrap().block_range(&caret).unwrap();
        assert_eq!(across.depth(), 0);
        assert_eq!((across.start(), across.end()), (0, 14));
        assert_eq!((across.start_index(), across.end_index()), (0, 2));
    }
}
