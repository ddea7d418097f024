use paper_editor::{redo, undo, Extension, ExtensionContext, HistoryPlugin, KeyBinding, Plugin};
use std::sync::Arc;

/// Undo and redo, keeping `historyDepth` events.
pub struct History;

impl Extension for History {
    fn name(&self) -> &str {
        "history"
    }

    fn plugins(&self, cx: &ExtensionContext) -> Vec<Arc<dyn Plugin>> {
        vec![Arc::new(HistoryPlugin::new(cx.config.history_depth))]
    }

    fn key_bindings(&self, _cx: &ExtensionContext) -> Vec<KeyBinding> {
        vec![
            KeyBinding::new("Mod-z", undo()),
            KeyBinding::new("Shift-Mod-z", redo()),
            KeyBinding::new("Mod-y", redo()),
        ]
    }
}
