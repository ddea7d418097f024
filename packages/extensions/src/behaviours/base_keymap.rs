use paper_editor::commands::{
    chain_commands, delete_selection, join_backward, lift_empty_block, select_all, split_block,
};
use paper_editor::{Extension, ExtensionContext, KeyBinding};

/// Enter, Backspace and select-all for plain blocks. Registered after the
/// node extensions, so their bindings take precedence.
pub struct BaseKeymap;

impl Extension for BaseKeymap {
    fn name(&self) -> &str {
        "base_keymap"
    }

    fn key_bindings(&self, _cx: &ExtensionContext) -> Vec<KeyBinding> {
        vec![
            KeyBinding::new("Enter", chain_commands(vec![lift_empty_block(), split_block()])),
            KeyBinding::new("Backspace", chain_commands(vec![delete_selection(), join_backward()])),
            KeyBinding::new("Mod-a", select_all()),
        ]
    }
}
