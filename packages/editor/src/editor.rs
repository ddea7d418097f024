//! # Editor
//!
//! Owns the current [`EditorState`] and everything assembled from the
//! extensions: input rules, keymap, menus, node views and observers.
//!
//! ## Dispatch
//!
//! ```text
//! input / key / command ──► Transaction ──► EditorState::apply_transaction
//!                                                │ (rejected: warn, no change)
//!                                                ▼
//!                           node views ──► transaction handlers ──► observers
//! ```
//!
//! Observers run once per dispatch, in subscription order, with the
//! settled state.

use crate::commands::Command;
use crate::config::EditorConfig;
use crate::errors::{ConfigError, EditorResult, TransactionError};
use crate::extension::{ExtensionSet, TransactionHandler};
use crate::input_rules::{run_input_rules, InputRule};
use crate::keymap::{KeyEvent, Keymap};
use crate::menu::MenuItem;
use crate::state::{EditorState, StateConfig};
use crate::transaction::Transaction;
use crate::view::{NodeView, NodeViewFactory, NodeViewHost};
use paper_model::{upgrade_document, Node, NodeJson, Schema, Slice};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

pub type Observer = Box<dyn Fn(&EditorState) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(usize);

pub struct Editor {
    config: EditorConfig,
    state: EditorState,
    input_rules: Vec<InputRule>,
    keymap: Keymap,
    menus: Vec<MenuItem>,
    view_factories: Vec<Arc<dyn NodeViewFactory>>,
    views: NodeViewHost,
    handlers: Vec<TransactionHandler>,
    observers: Vec<(ObserverId, Observer)>,
    next_observer: usize,
}

impl fmt::Debug for Editor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Editor")
            .field("state", &self.state)
            .field("keymap", &self.keymap)
            .field("views", &self.views)
            .field("observers", &self.observers.len())
            .finish()
    }
}

fn parse_document(schema: &Schema, json: NodeJson) -> Result<Node, paper_model::ModelError> {
    Node::from_json(schema, &upgrade_document(json))
}

impl Editor {
    pub fn new(extensions: ExtensionSet, config: EditorConfig) -> EditorResult<Self> {
        let schema = extensions.build_schema()?;
        let aggregate = extensions.aggregate(&schema, &config)?;

        let doc = match aggregate.default_value {
            Some(json) => parse_document(&schema, json).map_err(ConfigError::DefaultValue)?,
            None => schema.empty_document()?,
        };
        let state = EditorState::create(StateConfig::new(schema).with_doc(doc).with_plugins(aggregate.plugins))?;

        // Let the plugins settle the initial document (identities, trailing
        // paragraph) without recording it.
        let mut tr = state.tr();
        tr.set_add_to_history(false);
        let state = state.apply(tr)?;

        let mut editor = Self {
            config,
            state,
            input_rules: aggregate.input_rules,
            keymap: aggregate.keymap,
            menus: aggregate.menus,
            view_factories: aggregate.node_views,
            views: NodeViewHost::new(),
            handlers: aggregate.transaction_handlers,
            observers: Vec::new(),
            next_observer: 0,
        };
        editor.views.sync(editor.state.doc(), &editor.view_factories);
        Ok(editor)
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn schema(&self) -> &Arc<Schema> {
        self.state.schema()
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn doc(&self) -> &Node {
        self.state.doc()
    }

    /// Apply `tr`. A rejected transaction leaves the editor unchanged.
    pub fn dispatch(&mut self, tr: Transaction) -> bool {
        match self.try_dispatch(tr) {
            Ok(()) => true,
            Err(error) => {
                warn!(%error, "transaction rejected");
                false
            }
        }
    }

    #[instrument(skip_all)]
    pub fn try_dispatch(&mut self, tr: Transaction) -> Result<(), TransactionError> {
        let applied = self.state.apply_transaction(tr)?;
        debug!(transactions = applied.transactions.len(), "dispatched");
        self.state = applied.state;
        self.views.sync(self.state.doc(), &self.view_factories);
        for handler in &self.handlers {
            handler(&self.state, &applied.transactions);
        }
        for (_, observer) in &self.observers {
            observer(&self.state);
        }
        Ok(())
    }

    pub fn subscribe(&mut self, observer: impl Fn(&EditorState) + Send + Sync + 'static) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(other, _)| *other != id);
        self.observers.len() != before
    }

    /// Text typed over the selection: the first matching input rule
    /// handles it, otherwise the text is inserted.
    pub fn handle_text_input(&mut self, text: &str) -> bool {
        let selection = self.state.selection();
        let (from, to) = (selection.from(), selection.to());
        let ruled = run_input_rules(
            &self.state,
            from,
            to,
            text,
            &self.input_rules,
            self.config.input_rule_lookbehind,
        );
        if let Some(tr) = ruled {
            return self.dispatch(tr);
        }
        let mut tr = self.state.tr();
        match tr.insert_text(text, from, to) {
            Ok(_) => self.dispatch(tr),
            Err(error) => {
                debug!(%error, "text input not applicable");
                false
            }
        }
    }

    pub fn handle_key(&mut self, event: &KeyEvent) -> bool {
        match self.keymap.handle(event, &self.state) {
            Some(tr) => self.dispatch(tr),
            None => false,
        }
    }

    /// Run a command against the current state.
    pub fn exec(&mut self, command: &Command) -> bool {
        match command(&self.state) {
            Some(tr) => self.dispatch(tr),
            None => false,
        }
    }

    pub fn menus(&self) -> &[MenuItem] {
        &self.menus
    }

    /// Menu items applicable to the current selection.
    pub fn visible_menus(&self) -> Vec<&MenuItem> {
        self.menus.iter().filter(|item| item.visible(&self.state)).collect()
    }

    pub fn node_view<V: NodeView + 'static>(&self, key: &str) -> Option<&V> {
        self.views.get(key)
    }

    pub fn node_view_mut<V: NodeView + 'static>(&mut self, key: &str) -> Option<&mut V> {
        self.views.get_mut(key)
    }

    pub fn node_views(&self) -> &NodeViewHost {
        &self.views
    }

    /// Replace the whole document. The replacement is not undoable.
    pub fn set_document_json(&mut self, json: NodeJson) -> EditorResult<()> {
        let doc = parse_document(self.schema(), json)?;
        let mut tr = self.state.tr();
        let end = self.state.doc().content().size();
        tr.replace(0, end, Slice::closed(doc.content().clone()))?;
        tr.set_add_to_history(false);
        self.try_dispatch(tr)?;
        Ok(())
    }

    pub fn to_json(&self) -> NodeJson {
        self.state.to_json()
    }

    /// Text of the first top-level block.
    pub fn title(&self) -> Option<String> {
        self.state.doc().first_child().map(Node::text_content)
    }
}

impl Drop for Editor {
    fn drop(&mut self) {
        self.views.clear();
    }
}
