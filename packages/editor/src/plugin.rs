//! Transaction-time plugins.
//!
//! A plugin can keep its own state inside [`EditorState`], veto
//! transactions, append corrective transactions after others, and observe
//! the settled edit log once `apply` is done.

use crate::state::EditorState;
use crate::transaction::Transaction;
use std::any::Any;
use std::sync::Arc;

/// Plugin-local state stored in the editor state.
pub type PluginState = Arc<dyn Any + Send + Sync>;

pub trait Plugin: Send + Sync {
    /// Unique key; also the key of the plugin's state.
    fn key(&self) -> &str;

    /// Initial state. `state` holds the document and the states of the
    /// plugins registered before this one.
    fn init_state(&self, _state: &EditorState) -> Option<PluginState> {
        None
    }

    /// Next state after `tr`. `new_state` holds the new document and the
    /// already updated states of earlier plugins.
    fn apply_state(
        &self,
        _tr: &Transaction,
        value: &PluginState,
        _old_state: &EditorState,
        _new_state: &EditorState,
    ) -> PluginState {
        value.clone()
    }

    /// Return false to drop the transaction.
    fn filter_transaction(&self, _tr: &Transaction, _state: &EditorState) -> bool {
        true
    }

    /// Called with the transactions applied since this plugin last looked,
    /// may return one more transaction to apply after them.
    fn append_transaction(
        &self,
        _trs: &[Transaction],
        _old_state: &EditorState,
        _new_state: &EditorState,
    ) -> Option<Transaction> {
        None
    }

    /// Called once per `apply` with every transaction that went into the
    /// new state, appended ones included.
    fn after_apply(&self, _trs: &[Transaction], _old_state: &EditorState, _new_state: &EditorState) {}
}

/// Downcast helper for plugin states.
pub fn state_as<T: Any>(value: &PluginState) -> Option<&T> {
    value.downcast_ref::<T>()
}
