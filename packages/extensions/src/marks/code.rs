use super::{mark_menu, toggle_binding};
use paper_editor::input_rules::mark_input_rule;
use paper_editor::{ConfigError, InputRule, KeyBinding, MarkContext, MarkExtension, MenuItem};
use paper_model::MarkSpec;

/// Inline code. No other mark can share its text.
pub struct Code;

impl MarkExtension for Code {
    fn name(&self) -> &str {
        "code"
    }

    fn spec(&self) -> MarkSpec {
        MarkSpec::new().excludes("_")
    }

    fn input_rules(&self, cx: &MarkContext) -> Result<Vec<InputRule>, ConfigError> {
        Ok(vec![mark_input_rule(r"(?:^|[^`])(`([^`]+)`)$", cx.kind.clone(), None)?])
    }

    fn key_bindings(&self, cx: &MarkContext) -> Vec<KeyBinding> {
        vec![toggle_binding("Mod-`", cx)]
    }

    fn menus(&self, cx: &MarkContext) -> Vec<MenuItem> {
        vec![mark_menu(cx)]
    }
}
