use super::{mark_menu, toggle_binding};
use paper_editor::input_rules::mark_input_rule;
use paper_editor::{ConfigError, InputRule, KeyBinding, MarkContext, MarkExtension, MenuItem};
use paper_model::MarkSpec;

pub struct Bold;

impl MarkExtension for Bold {
    fn name(&self) -> &str {
        "bold"
    }

    fn spec(&self) -> MarkSpec {
        MarkSpec::new()
    }

    fn input_rules(&self, cx: &MarkContext) -> Result<Vec<InputRule>, ConfigError> {
        Ok(vec![mark_input_rule(r"(?:\*\*)([^*]+)(?:\*\*)$", cx.kind.clone(), None)?])
    }

    fn key_bindings(&self, cx: &MarkContext) -> Vec<KeyBinding> {
        vec![toggle_binding("Mod-b", cx)]
    }

    fn menus(&self, cx: &MarkContext) -> Vec<MenuItem> {
        vec![mark_menu(cx)]
    }
}
