//! Toolbar menu contributions.

use crate::commands::{set_block_type, Command};
use crate::state::EditorState;
use crate::transaction::Transaction;
use paper_model::{Attrs, MarkType, NodeType};
use std::fmt;
use std::sync::Arc;

pub type Predicate = Arc<dyn Fn(&EditorState) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct MenuItem {
    pub name: String,

    /// Whether the item is shown as pressed.
    pub is_active: Predicate,

    /// Whether the item applies to the current selection.
    pub is_visible: Predicate,

    pub toggle: Command,
}

impl fmt::Debug for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MenuItem").field("name", &self.name).finish()
    }
}

impl MenuItem {
    /// An item that is always visible.
    pub fn new(name: impl Into<String>, is_active: Predicate, toggle: Command) -> Self {
        Self {
            name: name.into(),
            is_active,
            is_visible: Arc::new(|_: &EditorState| true),
            toggle,
        }
    }

    pub fn with_visibility(mut self, is_visible: Predicate) -> Self {
        self.is_visible = is_visible;
        self
    }

    pub fn active(&self, state: &EditorState) -> bool {
        (self.is_active)(state)
    }

    pub fn visible(&self, state: &EditorState) -> bool {
        (self.is_visible)(state)
    }

    pub fn run(&self, state: &EditorState) -> Option<Transaction> {
        (self.toggle)(state)
    }

    /// Toolbar button for a mark.
    pub fn for_mark(name: impl Into<String>, kind: Arc<MarkType>, toggle: Command) -> Self {
        let active = kind.clone();
        Self::new(name, Arc::new(move |state: &EditorState| is_mark_active(state, &active)), toggle)
    }

    /// Toolbar button for a block kind, hidden where the kind cannot be set.
    pub fn for_block(name: impl Into<String>, kind: Arc<NodeType>, attrs: Option<Attrs>, toggle: Command) -> Self {
        let (active, visible) = (kind.clone(), kind);
        let (active_attrs, visible_attrs) = (attrs.clone(), attrs);
        Self::new(
            name,
            Arc::new(move |state: &EditorState| is_node_active(state, &active, active_attrs.as_ref())),
            toggle,
        )
        .with_visibility(Arc::new(move |state: &EditorState| {
            can_toggle_block_type(state, &visible, visible_attrs.as_ref())
        }))
    }
}

/// Whether the mark is on the selection, or stored at the caret.
pub fn is_mark_active(state: &EditorState, kind: &MarkType) -> bool {
    let selection = state.selection();
    if let Some(pos) = selection.cursor_pos() {
        let marks = match state.stored_marks() {
            Some(marks) => marks.to_vec(),
            None => match state.doc().resolve(pos) {
                Ok(resolved) => resolved.marks(),
                Err(_) => return false,
            },
        };
        return kind.is_in_set(&marks).is_some();
    }
    state.doc().range_has_mark(selection.from(), selection.to(), kind)
}

/// Whether the selection sits inside a `kind` node whose attributes
/// include `attrs`.
pub fn is_node_active(state: &EditorState, kind: &NodeType, attrs: Option<&Attrs>) -> bool {
    let resolved = match state.doc().resolve(state.selection().from()) {
        Ok(resolved) => resolved,
        Err(_) => return false,
    };
    resolved
        .find_ancestor(|node| {
            node.kind().as_ref() == kind
                && attrs
                    .map(|attrs| attrs.iter().all(|(k, v)| node.attr(k) == Some(v)))
                    .unwrap_or(true)
        })
        .is_some()
}

/// Whether toggling `kind` would change anything: it is active (toggle
/// back) or the selected blocks can become it.
pub fn can_toggle_block_type(state: &EditorState, kind: &Arc<NodeType>, attrs: Option<&Attrs>) -> bool {
    is_node_active(state, kind, attrs) || set_block_type(kind.clone(), attrs.cloned())(state).is_some()
}
