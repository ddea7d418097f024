use crate::error::{ModelError, ModelResult};
use crate::node::Node;
use std::sync::Arc;

/// An immutable sequence of sibling nodes.
///
/// Children are shared between fragments; editing a fragment copies the
/// child list but not the children themselves.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Fragment {
    nodes: Arc<Vec<Node>>,
    size: usize,
}

impl Fragment {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a fragment from nodes as given.
    pub fn from_vec(nodes: Vec<Node>) -> Self {
        let size = nodes.iter().map(Node::node_size).sum();
        Self {
            nodes: Arc::new(nodes),
            size,
        }
    }

    /// Build a fragment, joining adjacent text nodes with identical marks.
    pub fn normalized(nodes: Vec<Node>) -> Self {
        let mut joined: Vec<Node> = Vec::with_capacity(nodes.len());
        for node in nodes {
            match joined.last_mut() {
                Some(last) if last.is_text() && node.is_text() && last.same_markup(&node) => {
                    let text = format!("{}{}", last.text().unwrap_or(""), node.text().unwrap_or(""));
                    *last = last.with_text(text);
                }
                _ => joined.push(node),
            }
        }
        Self::from_vec(joined)
    }

    pub fn from_node(node: Node) -> Self {
        Self::from_vec(vec![node])
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn child_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    pub fn first_child(&self) -> Option<&Node> {
        self.nodes.first()
    }

    pub fn last_child(&self) -> Option<&Node> {
        self.nodes.last()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.nodes.iter()
    }

    /// Concatenate, joining the touching text nodes when their marks match.
    pub fn append(&self, other: &Fragment) -> Fragment {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        let mut nodes = self.nodes.to_vec();
        let mut rest = other.nodes.iter();
        if let (Some(last), Some(first)) = (nodes.last_mut(), other.first_child()) {
            if last.is_text() && first.is_text() && last.same_markup(first) {
                let text = format!("{}{}", last.text().unwrap_or(""), first.text().unwrap_or(""));
                *last = last.with_text(text);
                rest.next();
            }
        }
        nodes.extend(rest.cloned());
        Fragment::from_vec(nodes)
    }

    /// The part of the fragment between two offsets.
    pub fn cut(&self, from: usize, to: usize) -> Fragment {
        if from == 0 && to >= self.size {
            return self.clone();
        }
        let mut result = Vec::new();
        if to > from {
            let mut pos = 0;
            for child in self.nodes.iter() {
                if pos >= to {
                    break;
                }
                let end = pos + child.node_size();
                if end > from {
                    let child = if pos < from || end > to {
                        if child.is_text() {
                            child.cut(from.saturating_sub(pos), (to - pos).min(child.text_len()))
                        } else {
                            child.cut(
                                from.saturating_sub(pos + 1),
                                (to - pos - 1).min(child.content().size()),
                            )
                        }
                    } else {
                        child.clone()
                    };
                    result.push(child);
                }
                pos = end;
            }
        }
        Fragment::from_vec(result)
    }

    pub fn replace_child(&self, index: usize, node: Node) -> Fragment {
        let mut nodes = self.nodes.to_vec();
        if index < nodes.len() {
            nodes[index] = node;
        }
        Fragment::from_vec(nodes)
    }

    pub fn add_to_start(&self, node: Node) -> Fragment {
        let mut nodes = Vec::with_capacity(self.nodes.len() + 1);
        nodes.push(node);
        nodes.extend(self.nodes.iter().cloned());
        Fragment::from_vec(nodes)
    }

    pub fn add_to_end(&self, node: Node) -> Fragment {
        let mut nodes = self.nodes.to_vec();
        nodes.push(node);
        Fragment::from_vec(nodes)
    }

    /// Index of the child containing `pos` and that child's start offset.
    ///
    /// A position on a child boundary resolves to the child after it.
    pub fn find_index(&self, pos: usize) -> ModelResult<(usize, usize)> {
        if pos == 0 {
            return Ok((0, 0));
        }
        if pos == self.size {
            return Ok((self.nodes.len(), pos));
        }
        if pos > self.size {
            return Err(ModelError::out_of_range(pos, self.size));
        }
        let mut cur = 0;
        for (i, child) in self.nodes.iter().enumerate() {
            let end = cur + child.node_size();
            if end >= pos {
                if end == pos {
                    return Ok((i + 1, end));
                }
                return Ok((i, cur));
            }
            cur = end;
        }
        Err(ModelError::out_of_range(pos, self.size))
    }

    /// Visit the nodes overlapping `from..to`; `f` returns false to skip a
    /// node's children.
    pub fn nodes_between<F>(
        &self,
        from: usize,
        to: usize,
        f: &mut F,
        node_start: usize,
        parent: Option<&Node>,
    ) where
        F: FnMut(&Node, usize, Option<&Node>, usize) -> bool,
    {
        let mut pos = 0;
        for (i, child) in self.nodes.iter().enumerate() {
            if pos >= to {
                break;
            }
            let end = pos + child.node_size();
            if end > from && f(child, node_start + pos, parent, i) && child.content().size() > 0 {
                let start = pos + 1;
                child.content().nodes_between(
                    from.saturating_sub(start),
                    child.content().size().min(to.saturating_sub(start)),
                    f,
                    node_start + start,
                    Some(child),
                );
            }
            pos = end;
        }
    }

    pub fn text_between(&self, from: usize, to: usize, block_separator: &str) -> String {
        let mut text = String::new();
        let mut first = true;
        self.nodes_between(
            from,
            to,
            &mut |node: &Node, pos: usize, _: Option<&Node>, _: usize| {
                if node.is_block() && (node.is_textblock() || node.is_leaf()) {
                    if first {
                        first = false;
                    } else {
                        text.push_str(block_separator);
                    }
                }
                if let Some(t) = node.text() {
                    let start = from.max(pos) - pos;
                    let end = to.min(pos + node.text_len()) - pos;
                    text.push_str(&crate::node::char_slice(t, start, end));
                }
                true
            },
            0,
            None,
        );
        text
    }
}

impl<'a> IntoIterator for &'a Fragment {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}
