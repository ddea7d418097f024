use crate::error::{ModelError, ModelResult};
use crate::fragment::Fragment;
use crate::node::Node;

/// A piece of document cut out of its context.
///
/// `open_start` and `open_end` count how many levels of nodes on either
/// side are cut through rather than included whole.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Slice {
    content: Fragment,
    open_start: usize,
    open_end: usize,
}

impl Slice {
    pub fn new(content: Fragment, open_start: usize, open_end: usize) -> Self {
        Self {
            content,
            open_start,
            open_end,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// A closed slice holding `content`.
    pub fn closed(content: Fragment) -> Self {
        Self::new(content, 0, 0)
    }

    pub fn content(&self) -> &Fragment {
        &self.content
    }

    pub fn open_start(&self) -> usize {
        self.open_start
    }

    pub fn open_end(&self) -> usize {
        self.open_end
    }

    /// Size the slice occupies once inserted.
    pub fn size(&self) -> usize {
        self.content.size() - self.open_start - self.open_end
    }

    pub fn is_empty(&self) -> bool {
        self.content.size() == 0
    }

    /// The slice's text when it is exactly one closed text node.
    pub fn single_text(&self) -> Option<&str> {
        match self.content.nodes() {
            [node] if node.is_text() => node.text(),
            _ => None,
        }
    }

    /// Insert `fragment` at `pos` (counted from the slice's open start).
    /// `None` when the content does not fit there.
    pub fn insert_at(&self, pos: usize, fragment: &Fragment) -> Option<Slice> {
        let content = insert_into(&self.content, pos + self.open_start, fragment, None)?;
        Some(Slice::new(content, self.open_start, self.open_end))
    }

    /// Remove the flat range `from..to` (counted from the open start).
    pub fn remove_between(&self, from: usize, to: usize) -> ModelResult<Slice> {
        let content = remove_range(&self.content, from + self.open_start, to + self.open_start)?;
        Ok(Slice::new(content, self.open_start, self.open_end))
    }
}

fn insert_into(
    content: &Fragment,
    dist: usize,
    insert: &Fragment,
    parent: Option<&Node>,
) -> Option<Fragment> {
    let (index, offset) = content.find_index(dist).ok()?;
    let child = content.child(index);
    match child {
        Some(child) if offset != dist && !child.is_text() => {
            let inner = insert_into(child.content(), dist - offset - 1, insert, Some(child))?;
            Some(content.replace_child(index, child.copy(inner)))
        }
        _ => {
            if let Some(parent) = parent {
                if !parent.can_replace(index, index, insert) {
                    return None;
                }
            }
            Some(
                content
                    .cut(0, dist)
                    .append(insert)
                    .append(&content.cut(dist, content.size())),
            )
        }
    }
}

fn remove_range(content: &Fragment, from: usize, to: usize) -> ModelResult<Fragment> {
    let (index, offset) = content.find_index(from)?;
    let (index_to, offset_to) = content.find_index(to)?;
    let child = content.child(index);
    match child {
        Some(child) if offset != from && !child.is_text() => {
            if index != index_to {
                return Err(ModelError::replace("removing non-flat range"));
            }
            let inner = remove_range(child.content(), from - offset - 1, to - offset - 1)?;
            Ok(content.replace_child(index, child.copy(inner)))
        }
        _ => {
            let flat = offset_to == to || content.child(index_to).map(Node::is_text).unwrap_or(true);
            if !flat {
                return Err(ModelError::replace("removing non-flat range"));
            }
            Ok(content.cut(0, from).append(&content.cut(to, content.size())))
        }
    }
}
