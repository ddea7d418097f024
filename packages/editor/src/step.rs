//! # Steps
//!
//! Atomic document edits. A transaction is an ordered list of steps.
//!
//! ## Design
//!
//! - Every step applies to one exact document and either produces a new,
//!   content-checked document or fails without side effects
//! - Every step can be inverted against the document it was applied to,
//!   which is what history stores
//! - Every step reports the ranges it replaced as a [`StepMap`], so later
//!   positions and other steps can be mapped across it

use crate::errors::StepError;
use crate::mapping::{Mapping, StepMap};
use paper_model::{Attrs, Fragment, Mark, Node, NodeType, Slice};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Replace `from..to` with a slice
    Replace { from: usize, to: usize, slice: Slice },

    /// Replace `from..to` with a slice, keeping `gap_from..gap_to` and
    /// placing it at offset `insert` inside the slice. Used to wrap and
    /// unwrap blocks without touching their content.
    ReplaceAround {
        from: usize,
        to: usize,
        gap_from: usize,
        gap_to: usize,
        slice: Slice,
        insert: usize,
    },

    /// Add a mark to the inline content in `from..to`
    AddMark { from: usize, to: usize, mark: Mark },

    /// Remove a mark from the inline content in `from..to`
    RemoveMark { from: usize, to: usize, mark: Mark },

    /// Change the kind, attributes and marks of the node starting at `pos`,
    /// keeping its content
    SetNodeMarkup {
        pos: usize,
        kind: Arc<NodeType>,
        attrs: Attrs,
        marks: Vec<Mark>,
    },
}

impl Step {
    pub fn replace(from: usize, to: usize, slice: Slice) -> Self {
        Step::Replace { from, to, slice }
    }

    /// Apply to `doc`, producing the new document.
    pub fn apply(&self, doc: &Node) -> Result<Node, StepError> {
        match self {
            Step::Replace { from, to, slice } => Ok(doc.replace(*from, *to, slice)?),
            Step::ReplaceAround {
                from,
                to,
                gap_from,
                gap_to,
                slice,
                insert,
            } => {
                if content_between(doc, *from, *gap_from)? || content_between(doc, *gap_to, *to)? {
                    return Err(StepError::structure("replace around", "would overwrite content"));
                }
                let gap = doc.slice(*gap_from, *gap_to)?;
                if gap.open_start() > 0 || gap.open_end() > 0 {
                    return Err(StepError::structure("replace around", "gap is not a flat range"));
                }
                let inserted = slice
                    .insert_at(*insert, gap.content())
                    .ok_or_else(|| StepError::structure("replace around", "content does not fit in gap"))?;
                Ok(doc.replace(*from, *to, &inserted)?)
            }
            Step::AddMark { from, to, mark } => map_inline(doc, *from, *to, |node, parent| {
                if !node.is_atom() || !parent.kind().allows_mark_type(mark.kind()) {
                    node.clone()
                } else {
                    node.mark(mark.add_to_set(node.marks()))
                }
            }),
            Step::RemoveMark { from, to, mark } => map_inline(doc, *from, *to, |node, _| {
                node.mark(mark.remove_from_set(node.marks()))
            }),
            Step::SetNodeMarkup {
                pos,
                kind,
                attrs,
                marks,
            } => {
                let node = doc
                    .node_at(*pos)
                    .filter(|node| !node.is_text())
                    .ok_or(StepError::NoNodeAt(*pos))?;
                kind.check_content(node.content())?;
                let updated = kind.create(Some(attrs), node.content().clone(), marks.clone())?;
                let end = pos + node.node_size();
                Ok(doc.replace(*pos, end, &Slice::closed(Fragment::from_node(updated)))?)
            }
        }
    }

    pub fn step_map(&self) -> StepMap {
        match self {
            Step::Replace { from, to, slice } => StepMap::offset(*from, to - from, slice.size()),
            Step::ReplaceAround {
                from,
                to,
                gap_from,
                gap_to,
                slice,
                insert,
            } => StepMap::new(vec![
                (*from, gap_from - from, *insert),
                (*gap_to, to - gap_to, slice.size() - insert),
            ]),
            _ => StepMap::empty(),
        }
    }

    /// The step that undoes this one. `doc` is the document this step was
    /// applied to.
    pub fn invert(&self, doc: &Node) -> Result<Step, StepError> {
        Ok(match self {
            Step::Replace { from, to, slice } => Step::Replace {
                from: *from,
                to: from + slice.size(),
                slice: doc.slice(*from, *to)?,
            },
            Step::ReplaceAround {
                from,
                to,
                gap_from,
                gap_to,
                slice,
                insert,
            } => {
                let gap = gap_to - gap_from;
                Step::ReplaceAround {
                    from: *from,
                    to: from + slice.size() + gap,
                    gap_from: from + insert,
                    gap_to: from + insert + gap,
                    slice: doc
                        .slice(*from, *to)?
                        .remove_between(gap_from - from, gap_to - from)?,
                    insert: gap_from - from,
                }
            }
            Step::AddMark { from, to, mark } => Step::RemoveMark {
                from: *from,
                to: *to,
                mark: mark.clone(),
            },
            Step::RemoveMark { from, to, mark } => Step::AddMark {
                from: *from,
                to: *to,
                mark: mark.clone(),
            },
            Step::SetNodeMarkup { pos, .. } => {
                let node = doc.node_at(*pos).ok_or(StepError::NoNodeAt(*pos))?;
                Step::SetNodeMarkup {
                    pos: *pos,
                    kind: node.kind().clone(),
                    attrs: node.attrs().clone(),
                    marks: node.marks().to_vec(),
                }
            }
        })
    }

    /// Carry the step across `mapping`. `None` when the content it targets
    /// was deleted.
    pub fn map(&self, mapping: &Mapping) -> Option<Step> {
        match self {
            Step::Replace { from, to, slice } => {
                let start = mapping.map_result(*from, 1);
                let end = mapping.map_result(*to, -1);
                if start.deleted_across() && end.deleted_across() {
                    return None;
                }
                Some(Step::Replace {
                    from: start.pos,
                    to: start.pos.max(end.pos),
                    slice: slice.clone(),
                })
            }
            Step::ReplaceAround {
                from,
                to,
                gap_from,
                gap_to,
                slice,
                insert,
            } => {
                let start = mapping.map_result(*from, 1);
                let end = mapping.map_result(*to, -1);
                let gap_start = if from == gap_from {
                    start.pos
                } else {
                    mapping.map(*gap_from, -1)
                };
                let gap_end = if to == gap_to {
                    end.pos
                } else {
                    mapping.map(*gap_to, 1)
                };
                if (start.deleted_across() && end.deleted_across())
                    || gap_start < start.pos
                    || gap_end > end.pos
                {
                    return None;
                }
                Some(Step::ReplaceAround {
                    from: start.pos,
                    to: end.pos,
                    gap_from: gap_start,
                    gap_to: gap_end,
                    slice: slice.clone(),
                    insert: *insert,
                })
            }
            Step::AddMark { from, to, mark } | Step::RemoveMark { from, to, mark } => {
                let start = mapping.map_result(*from, 1);
                let end = mapping.map_result(*to, -1);
                if (start.deleted() && end.deleted()) || start.pos >= end.pos {
                    return None;
                }
                let (from, to, mark) = (start.pos, end.pos, mark.clone());
                Some(match self {
                    Step::AddMark { .. } => Step::AddMark { from, to, mark },
                    _ => Step::RemoveMark { from, to, mark },
                })
            }
            Step::SetNodeMarkup {
                pos,
                kind,
                attrs,
                marks,
            } => {
                let mapped = mapping.map_result(*pos, 1);
                if mapped.deleted() {
                    return None;
                }
                Some(Step::SetNodeMarkup {
                    pos: mapped.pos,
                    kind: kind.clone(),
                    attrs: attrs.clone(),
                    marks: marks.clone(),
                })
            }
        }
    }
}

/// Whether `from..to` holds anything besides node boundaries.
fn content_between(doc: &Node, from: usize, to: usize) -> Result<bool, StepError> {
    let resolved = doc.resolve(from)?;
    let mut dist = to - from;
    let mut depth = resolved.depth();
    while dist > 0 && depth > 0 && resolved.index_after(depth) == resolved.node(depth).child_count() {
        depth -= 1;
        dist -= 1;
    }
    if dist > 0 {
        let mut next = resolved.node(depth).child(resolved.index_after(depth));
        while dist > 0 {
            match next {
                Some(node) if !node.is_leaf() => next = node.first_child(),
                _ => return Ok(true),
            }
            dist -= 1;
        }
    }
    Ok(false)
}

/// Rebuild the inline nodes in `from..to` with `f`, then splice the result
/// back in place.
fn map_inline<F>(doc: &Node, from: usize, to: usize, f: F) -> Result<Node, StepError>
where
    F: Fn(&Node, &Node) -> Node,
{
    let old = doc.slice(from, to)?;
    let resolved = doc.resolve(from)?;
    let parent = resolved.node(resolved.shared_depth(to));
    let content = map_fragment(old.content(), parent, &f);
    let slice = Slice::new(content, old.open_start(), old.open_end());
    Ok(doc.replace(from, to, &slice)?)
}

fn map_fragment<F>(fragment: &Fragment, parent: &Node, f: &F) -> Fragment
where
    F: Fn(&Node, &Node) -> Node,
{
    let mut mapped = Vec::with_capacity(fragment.child_count());
    for child in fragment {
        let mut child = child.clone();
        if child.content().size() > 0 {
            let inner = map_fragment(child.content(), &child, f);
            child = child.copy(inner);
        }
        if child.is_inline() {
            child = f(&child, parent);
        }
        mapped.push(child);
    }
    Fragment::normalized(mapped)
}
