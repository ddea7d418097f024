//! # Paper Editor
//!
//! Editing engine for Paper documents.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ extensions: nodes, marks, behaviours        │
//! │  - build_schema() → paper_model::Schema     │
//! │  - aggregate() → rules, keymap, menus, ...  │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ state: immutable EditorState                │
//! │  - Transactions of steps, content-checked   │
//! │  - Plugins append corrective transactions   │
//! │  - History, identities, region sync         │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: dispatch, node views, observers     │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **States are values**: a rejected transaction leaves the old state
//! 2. **Extensions compose by capability**: each implements what it needs
//! 3. **Plugins settle the document**: every observed state is corrected
//! 4. **Regions sync both ways**: tagged edits are never echoed back
//!
//! ## Usage
//!
//! ```rust,ignore
//! use paper_editor::{Editor, EditorConfig, KeyEvent};
//!
//! let mut editor = Editor::new(paper_extensions::default_extensions(), EditorConfig::default())?;
//! editor.subscribe(|state| println!("{}", state.doc().text_content()));
//!
//! for c in "**bold**".chars() {
//!     editor.handle_text_input(&c.to_string());
//! }
//! editor.handle_key(&KeyEvent::new("z").ctrl());
//! ```

pub mod commands;
mod config;
mod editor;
mod errors;
mod extension;
pub mod history;
pub mod input_rules;
mod keymap;
mod mapping;
mod menu;
mod plugin;
mod selection;
mod state;
mod step;
pub mod structure;
pub mod sync;
mod transaction;
mod view;

pub use commands::{command, Command};
pub use config::{CodeBlockConfig, EditorConfig, Platform, DEFAULT_CONFIG_NAME};
pub use editor::{Editor, Observer, ObserverId};
pub use errors::{ConfigError, EditorError, EditorResult, StepError, SyncError, TransactionError};
pub use extension::{
    Aggregate, Extension, ExtensionContext, ExtensionSet, MarkContext, MarkExtension, NodeContext, NodeExtension,
    TransactionHandler,
};
pub use history::{redo, undo, HistoryPlugin};
pub use input_rules::{InputMatch, InputRule};
pub use keymap::{KeyBinding, KeyChord, KeyEvent, Keymap};
pub use mapping::{MapResult, Mapping, StepMap};
pub use menu::{can_toggle_block_type, is_mark_active, is_node_active, MenuItem, Predicate};
pub use plugin::{state_as, Plugin, PluginState};
pub use selection::Selection;
pub use state::{Applied, EditorState, StateConfig, MAX_APPEND_ROUNDS};
pub use step::Step;
pub use transaction::{AppendedFrom, MetaValue, Transaction, ADD_TO_HISTORY, APPENDED_TRANSACTION};
pub use view::{NodeView, NodeViewFactory, NodeViewHost};

// Re-export the model for convenience
pub use paper_model as model;
