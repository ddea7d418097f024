//! # Editor State
//!
//! An immutable snapshot of the document, selection and plugin states.
//! The only way to a new state is [`EditorState::apply`].
//!
//! ## Apply
//!
//! 1. Plugins may veto the transaction (`filter_transaction`)
//! 2. The steps are already applied by the transaction; the result is
//!    checked against the schema, the selection is validated
//! 3. Plugins get to append corrective transactions until none of them
//!    has anything left to add
//! 4. Plugins observe the full edit log (`after_apply`)

use crate::errors::{ConfigError, EditorResult, TransactionError};
use crate::plugin::{Plugin, PluginState};
use crate::selection::Selection;
use crate::transaction::Transaction;
use paper_model::{Mark, Node, NodeJson, Schema};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Rounds of `append_transaction` before the loop is considered runaway.
pub const MAX_APPEND_ROUNDS: usize = 16;

pub struct StateConfig {
    pub schema: Arc<Schema>,

    /// Defaults to the schema's empty document.
    pub doc: Option<Node>,

    /// Defaults to the start of the document.
    pub selection: Option<Selection>,

    pub stored_marks: Option<Vec<Mark>>,

    pub plugins: Vec<Arc<dyn Plugin>>,
}

impl StateConfig {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            doc: None,
            selection: None,
            stored_marks: None,
            plugins: Vec::new(),
        }
    }

    pub fn with_doc(mut self, doc: Node) -> Self {
        self.doc = Some(doc);
        self
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = Some(selection);
        self
    }

    pub fn with_plugins(mut self, plugins: Vec<Arc<dyn Plugin>>) -> Self {
        self.plugins = plugins;
        self
    }
}

/// Result of [`EditorState::apply_transaction`].
#[derive(Debug, Clone)]
pub struct Applied {
    pub state: EditorState,

    /// The root transaction followed by every appended one.
    pub transactions: Vec<Transaction>,
}

#[derive(Clone)]
pub struct EditorState {
    schema: Arc<Schema>,
    doc: Node,
    selection: Selection,
    stored_marks: Option<Vec<Mark>>,
    plugins: Arc<[Arc<dyn Plugin>]>,
    plugin_states: HashMap<String, PluginState>,
}

impl fmt::Debug for EditorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditorState")
            .field("doc", &self.doc)
            .field("selection", &self.selection)
            .field("stored_marks", &self.stored_marks)
            .field("plugins", &self.plugins.iter().map(|p| p.key()).collect::<Vec<_>>())
            .finish()
    }
}

impl EditorState {
    pub fn create(config: StateConfig) -> EditorResult<Self> {
        let mut keys = std::collections::HashSet::new();
        for plugin in &config.plugins {
            if !keys.insert(plugin.key().to_string()) {
                return Err(ConfigError::DuplicatePlugin(plugin.key().to_string()).into());
            }
        }
        let doc = match config.doc {
            Some(doc) => doc,
            None => config.schema.empty_document()?,
        };
        doc.check()?;
        let selection = match config.selection {
            Some(selection) if selection.is_valid(&doc) => selection,
            _ => Selection::at_start(&doc),
        };
        let mut state = Self {
            schema: config.schema,
            doc,
            selection,
            stored_marks: config.stored_marks,
            plugins: config.plugins.into(),
            plugin_states: HashMap::new(),
        };
        let plugins = state.plugins.clone();
        for plugin in plugins.iter() {
            if let Some(value) = plugin.init_state(&state) {
                state.plugin_states.insert(plugin.key().to_string(), value);
            }
        }
        Ok(state)
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn doc(&self) -> &Node {
        &self.doc
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn stored_marks(&self) -> Option<&[Mark]> {
        self.stored_marks.as_deref()
    }

    pub fn plugins(&self) -> &[Arc<dyn Plugin>] {
        &self.plugins
    }

    pub fn plugin_state<T: std::any::Any>(&self, key: &str) -> Option<&T> {
        self.plugin_states.get(key).and_then(|value| value.downcast_ref())
    }

    pub fn to_json(&self) -> NodeJson {
        self.doc.to_json()
    }

    /// Start a transaction on this state.
    pub fn tr(&self) -> Transaction {
        Transaction::new(
            self.schema.clone(),
            self.doc.clone(),
            self.selection.clone(),
            self.stored_marks.clone(),
        )
    }

    pub fn apply(&self, tr: Transaction) -> Result<EditorState, TransactionError> {
        self.apply_transaction(tr).map(|applied| applied.state)
    }

    /// Apply `root` and every transaction plugins append to it.
    pub fn apply_transaction(&self, root: Transaction) -> Result<Applied, TransactionError> {
        if let Some(key) = self.rejecting_plugin(&root, None) {
            return Err(TransactionError::Filtered(key));
        }
        let mut state = self.apply_inner(&root)?;
        let mut trs = vec![root];
        // Per plugin: how many transactions it has seen, and the state before them.
        let mut seen: Option<Vec<(usize, EditorState)>> = None;
        let mut rounds = 0;

        loop {
            let mut have_new = false;
            for (i, plugin) in self.plugins.iter().enumerate() {
                let (n, old_state) = match &seen {
                    Some(seen) => (seen[i].0, &seen[i].1),
                    None => (0, self),
                };
                let appended = if n < trs.len() {
                    plugin.append_transaction(&trs[n..], old_state, &state)
                } else {
                    None
                };
                if let Some(mut tr) = appended {
                    if state.rejecting_plugin(&tr, Some(i)).is_none() {
                        tr.mark_appended(&trs[0]);
                        if seen.is_none() {
                            seen = Some(
                                (0..self.plugins.len())
                                    .map(|j| {
                                        if j < i {
                                            (trs.len(), state.clone())
                                        } else {
                                            (0, self.clone())
                                        }
                                    })
                                    .collect(),
                            );
                        }
                        debug!(plugin = plugin.key(), steps = tr.steps().len(), "appended transaction");
                        state = state.apply_inner(&tr)?;
                        trs.push(tr);
                        have_new = true;
                    }
                }
                if let Some(seen) = &mut seen {
                    seen[i] = (trs.len(), state.clone());
                }
            }
            if !have_new {
                break;
            }
            rounds += 1;
            if rounds >= MAX_APPEND_ROUNDS {
                return Err(TransactionError::AppendLoop(rounds));
            }
        }

        for plugin in self.plugins.iter() {
            plugin.after_apply(&trs, self, &state);
        }
        Ok(Applied {
            state,
            transactions: trs,
        })
    }

    /// Key of the first plugin (other than `skip`) that vetoes `tr`.
    fn rejecting_plugin(&self, tr: &Transaction, skip: Option<usize>) -> Option<String> {
        self.plugins
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != skip)
            .find(|(_, plugin)| !plugin.filter_transaction(tr, self))
            .map(|(_, plugin)| plugin.key().to_string())
    }

    fn apply_inner(&self, tr: &Transaction) -> Result<EditorState, TransactionError> {
        if tr.before() != &self.doc {
            return Err(TransactionError::Mismatched);
        }
        if let Some(error) = tr.error() {
            return Err(TransactionError::Step(error.clone()));
        }
        let doc = tr.doc().clone();
        if tr.doc_changed() {
            doc.check().map_err(TransactionError::Invalid)?;
        }

        let mut selection = tr.selection();
        if !selection.is_valid(&doc) {
            selection = Selection::near(&doc, selection.head(), 1);
            if !selection.is_valid(&doc) {
                selection = Selection::at_start(&doc);
            }
        }
        let stored_marks = match selection.cursor_pos() {
            Some(_) => tr.stored_marks().map(|marks| marks.to_vec()),
            None => None,
        };

        let mut new_state = EditorState {
            schema: self.schema.clone(),
            doc,
            selection,
            stored_marks,
            plugins: self.plugins.clone(),
            plugin_states: self.plugin_states.clone(),
        };
        for plugin in self.plugins.iter() {
            let key = plugin.key();
            let value = match self.plugin_states.get(key) {
                Some(value) => plugin.apply_state(tr, value, self, &new_state),
                None => continue,
            };
            new_state.plugin_states.insert(key.to_string(), value);
        }
        Ok(new_state)
    }
}
