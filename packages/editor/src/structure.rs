//! Structural queries used to plan wrap and lift edits.

use paper_model::{Fragment, Node, NodeRange, NodeType, Schema};
use std::sync::Arc;

/// Kinds to wrap `range` in so that it becomes content of `kind`: either
/// `[kind]`, or `[kind, inner]` when `kind` needs an intermediate node
/// (a list needs list items).
pub fn find_wrapping(schema: &Schema, range: &NodeRange, kind: &Arc<NodeType>) -> Option<Vec<Arc<NodeType>>> {
    let parent = range.parent();
    if !parent.can_replace_with(range.start_index(), range.end_index(), kind) {
        return None;
    }
    let children: Vec<usize> = parent.content().nodes()[range.start_index()..range.end_index()]
        .iter()
        .map(|child| child.kind().index())
        .collect();
    let accepts = |wrapper: &NodeType| {
        wrapper
            .content_match()
            .match_kinds(children.iter().copied())
            .map(|end| end.valid_end())
            .unwrap_or(false)
    };
    if accepts(kind.as_ref()) {
        return Some(vec![kind.clone()]);
    }
    kind.content_match()
        .next_kinds()
        .into_iter()
        .filter_map(|index| schema.node_types().get(index))
        .filter(|inner| !inner.is_text() && !inner.has_required_attrs())
        .find(|inner| accepts(inner.as_ref()))
        .map(|inner| vec![kind.clone(), inner.clone()])
}

/// The depth `range` can be lifted to, if any.
pub fn lift_target(range: &NodeRange) -> Option<usize> {
    let parent = range.parent();
    let content = Fragment::from_vec(parent.content().nodes()[range.start_index()..range.end_index()].to_vec());
    for depth in (0..=range.depth()).rev() {
        let node = range.from().node(depth);
        let index = range.from().index(depth);
        let end_index = range.to().index_after(depth);
        if depth < range.depth() && node.can_replace(index, end_index, &content) {
            return Some(depth);
        }
        if depth == 0 || node.kind().spec().isolating || !can_cut(node, index, end_index) {
            break;
        }
    }
    None
}

fn can_cut(node: &Node, start: usize, end: usize) -> bool {
    let empty = Fragment::empty();
    (start == 0 || node.can_replace(start, node.child_count(), &empty))
        && (end == node.child_count() || node.can_replace(0, end, &empty))
}
