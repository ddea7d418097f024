//! # Undo/Redo History
//!
//! A plugin whose state keeps the inverted steps of recent transactions.
//!
//! ## Design
//!
//! - Each tracked transaction records its inverted steps as one event
//! - Undo applies an event's steps last to first and pushes the inverse
//!   of what it did onto the redo stack
//! - New tracked edits clear the redo stack
//! - Transactions appended by plugins join the event of the transaction
//!   they were appended to
//! - Untracked changes (`addToHistory = false`) are mapped over instead
//!   of recorded
//!
//! ## Example
//!
//! ```rust,ignore
//! let state = EditorState::create(config.with_plugins(vec![Arc::new(HistoryPlugin::new(100))]))?;
//! let state = state.apply(edit)?;
//! let tr = undo()(&state).expect("something to undo");
//! let state = state.apply(tr)?;
//! ```

use crate::commands::{command, Command};
use crate::plugin::{Plugin, PluginState};
use crate::selection::Selection;
use crate::state::EditorState;
use crate::step::Step;
use crate::transaction::Transaction;
use std::sync::Arc;
use tracing::debug;

pub const HISTORY_KEY: &str = "history";

/// Transaction meta set by [`undo`] and [`redo`].
pub const HISTORY_META: &str = "history$";

/// One undoable unit: steps in the order they were recorded, each the
/// inverse of a step that was applied.
#[derive(Debug, Clone)]
pub struct HistoryEvent {
    pub inverted: Vec<Step>,

    /// Selection before the event's changes.
    pub selection: Selection,
}

#[derive(Debug, Clone, Default)]
pub struct HistoryState {
    done: Vec<HistoryEvent>,
    undone: Vec<HistoryEvent>,
}

impl HistoryState {
    pub fn undo_depth(&self) -> usize {
        self.done.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.undone.len()
    }

    fn push_done(&mut self, event: HistoryEvent, depth: usize) {
        self.done.push(event);
        if self.done.len() > depth {
            let excess = self.done.len() - depth;
            self.done.drain(..excess);
        }
    }

    fn map_through(&mut self, tr: &Transaction) {
        let map = |events: &mut Vec<HistoryEvent>| {
            for event in events.iter_mut() {
                event.inverted = event
                    .inverted
                    .iter()
                    .filter_map(|step| step.map(tr.mapping()))
                    .collect();
                event.selection = event.selection.map(tr.doc(), tr.mapping());
            }
            events.retain(|event| !event.inverted.is_empty());
        };
        map(&mut self.done);
        map(&mut self.undone);
    }
}

/// What an undo or redo transaction carries for the history plugin.
#[derive(Debug, Clone)]
pub struct HistoryMeta {
    pub redo: bool,
    pub state: HistoryState,
}

fn inverted_steps(tr: &Transaction) -> Vec<Step> {
    tr.steps()
        .iter()
        .zip(tr.docs())
        .filter_map(|(step, doc)| step.invert(doc).ok())
        .collect()
}

#[derive(Debug, Clone)]
pub struct HistoryPlugin {
    depth: usize,
}

impl HistoryPlugin {
    pub fn new(depth: usize) -> Self {
        Self { depth: depth.max(1) }
    }
}

impl Plugin for HistoryPlugin {
    fn key(&self) -> &str {
        HISTORY_KEY
    }

    fn init_state(&self, _state: &EditorState) -> Option<PluginState> {
        Some(Arc::new(HistoryState::default()))
    }

    fn apply_state(&self, tr: &Transaction, value: &PluginState, old: &EditorState, _new: &EditorState) -> PluginState {
        let Some(history) = value.downcast_ref::<HistoryState>() else {
            return value.clone();
        };
        if let Some(meta) = tr.meta::<HistoryMeta>(HISTORY_META) {
            return Arc::new(meta.state.clone());
        }
        if !tr.doc_changed() {
            return value.clone();
        }

        let mut next = history.clone();
        let appended = tr.appended_from();
        if let Some(meta) = appended.and_then(|from| from.meta::<HistoryMeta>(HISTORY_META)) {
            // Corrections to an undo or redo belong to the event it produced.
            let target = if meta.redo { &mut next.done } else { &mut next.undone };
            if let Some(event) = target.last_mut() {
                event.inverted.extend(inverted_steps(tr));
            }
            return Arc::new(next);
        }

        let untracked = appended
            .and_then(|from| from.meta::<bool>(crate::transaction::ADD_TO_HISTORY))
            .map(|record| !record)
            .unwrap_or(false);
        if !tr.add_to_history() || untracked {
            next.map_through(tr);
            return Arc::new(next);
        }

        match (appended, next.done.last_mut()) {
            (Some(_), Some(event)) => event.inverted.extend(inverted_steps(tr)),
            _ => {
                let event = HistoryEvent {
                    inverted: inverted_steps(tr),
                    selection: old.selection().clone(),
                };
                next.push_done(event, self.depth);
            }
        }
        next.undone.clear();
        Arc::new(next)
    }
}

fn history_command(redo: bool) -> Command {
    command(move |state| {
        let history = state.plugin_state::<HistoryState>(HISTORY_KEY)?;
        let mut next = history.clone();
        let (source, target) = if redo {
            (&mut next.undone, &mut next.done)
        } else {
            (&mut next.done, &mut next.undone)
        };
        let event = source.pop()?;

        let mut tr = state.tr();
        for step in event.inverted.iter().rev() {
            if let Err(error) = tr.maybe_step(step.clone()) {
                debug!(%error, "skipping history step that no longer applies");
            }
        }
        if !tr.doc_changed() {
            return None;
        }
        target.push(HistoryEvent {
            inverted: inverted_steps(&tr),
            selection: state.selection().clone(),
        });
        if event.selection.is_valid(tr.doc()) {
            tr.set_selection(event.selection.clone());
        }
        debug!(redo, steps = tr.steps().len(), "history");
        tr.set_meta(HISTORY_META, HistoryMeta { redo, state: next });
        Some(tr)
    })
}

pub fn undo() -> Command {
    history_command(false)
}

pub fn redo() -> Command {
    history_command(true)
}

pub fn undo_depth(state: &EditorState) -> usize {
    state
        .plugin_state::<HistoryState>(HISTORY_KEY)
        .map(HistoryState::undo_depth)
        .unwrap_or(0)
}

pub fn redo_depth(state: &EditorState) -> usize {
    state
        .plugin_state::<HistoryState>(HISTORY_KEY)
        .map(HistoryState::redo_depth)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateConfig;
    use paper_model::{NodeSpec, Schema, SchemaSpec};

    fn state(depth: usize) -> EditorState {
        let schema = Schema::new(
            SchemaSpec::default()
                .node("doc", NodeSpec::new().content("paragraph+"))
                .node("paragraph", NodeSpec::new().content("text*"))
                .node("text", NodeSpec::new()),
        )
        .unwrap();
        EditorState::create(StateConfig::new(schema).with_plugins(vec![Arc::new(HistoryPlugin::new(depth))])).unwrap()
    }

    fn type_text(state: &EditorState, text: &str) -> EditorState {
        let mut tr = state.tr();
        tr.insert_text_at_selection(text).unwrap();
        state.apply(tr).unwrap()
    }

    #[test]
    fn test_undo_redo() {
        let start = state(100);
        let typed = type_text(&type_text(&start, "ab"), "cd");
        assert_eq!(undo_depth(&typed), 2);

        let once = typed.apply(undo()(&typed).unwrap()).unwrap();
        assert_eq!(once.doc().text_content(), "ab");
        assert_eq!(once.selection(), &Selection::cursor(3));
        assert_eq!(redo_depth(&once), 1);

        let twice = once.apply(undo()(&once).unwrap()).unwrap();
        assert_eq!(twice.doc(), start.doc());
        assert!(undo()(&twice).is_none());

        let again = twice.apply(redo()(&twice).unwrap()).unwrap();
        assert_eq!(again.doc().text_content(), "ab");
    }

    #[test]
    fn test_new_edit_clears_redo() {
        let typed = type_text(&state(100), "ab");
        let undone = typed.apply(undo()(&typed).unwrap()).unwrap();
        let edited = type_text(&undone, "x");
        assert_eq!(redo_depth(&edited), 0);
        assert!(redo()(&edited).is_none());
    }

    #[test]
    fn test_depth_is_bounded() {
        let mut s = state(2);
        for text in ["a", "b", "c"] {
            s = type_text(&s, text);
        }
        assert_eq!(undo_depth(&s), 2);
    }

    #[test]
    fn test_untracked_changes_are_mapped() {
        let typed = type_text(&state(100), "ab");
        let mut tr = typed.tr();
        tr.insert_text("zz", 1, 1).unwrap();
        tr.set_add_to_history(false);
        let untracked = typed.apply(tr).unwrap();
        assert_eq!(undo_depth(&untracked), 1);

        let undone = untracked.apply(undo()(&untracked).unwrap()).unwrap();
        assert_eq!(undone.doc().text_content(), "zz");
    }
}
