use super::{mark_menu, toggle_binding};
use paper_editor::input_rules::mark_input_rule;
use paper_editor::{ConfigError, InputRule, KeyBinding, MarkContext, MarkExtension, MenuItem};
use paper_model::MarkSpec;

pub struct Italic;

impl MarkExtension for Italic {
    fn name(&self) -> &str {
        "italic"
    }

    fn spec(&self) -> MarkSpec {
        MarkSpec::new()
    }

    /// `_x_` and `*x*`. The delimiter must not be doubled, which leaves
    /// `__x__` to underline and `**x**` to bold.
    fn input_rules(&self, cx: &MarkContext) -> Result<Vec<InputRule>, ConfigError> {
        Ok(vec![
            mark_input_rule(r"(?:^|[^_])(_([^_]+)_)$", cx.kind.clone(), None)?,
            mark_input_rule(r"(?:^|[^*])(\*([^*]+)\*)$", cx.kind.clone(), None)?,
        ])
    }

    fn key_bindings(&self, cx: &MarkContext) -> Vec<KeyBinding> {
        vec![toggle_binding("Mod-i", cx)]
    }

    fn menus(&self, cx: &MarkContext) -> Vec<MenuItem> {
        vec![mark_menu(cx)]
    }
}
