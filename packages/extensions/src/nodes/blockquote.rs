use super::in_textblock;
use paper_editor::commands::toggle_wrap;
use paper_editor::input_rules::wrapping_input_rule;
use paper_editor::{is_node_active, ConfigError, EditorState, InputRule, MenuItem, NodeContext, NodeExtension};
use paper_model::NodeSpec;
use std::sync::Arc;

pub struct Blockquote;

impl NodeExtension for Blockquote {
    fn name(&self) -> &str {
        "blockquote"
    }

    fn spec(&self) -> NodeSpec {
        NodeSpec::new().content("block+").group("block")
    }

    fn input_rules(&self, cx: &NodeContext) -> Result<Vec<InputRule>, ConfigError> {
        Ok(vec![wrapping_input_rule(r"^\s*>\s$", cx.kind.clone(), None)?])
    }

    fn menus(&self, cx: &NodeContext) -> Vec<MenuItem> {
        let kind = cx.kind.clone();
        vec![MenuItem::new(
            "blockquote",
            Arc::new(move |state: &EditorState| is_node_active(state, &kind, None)),
            toggle_wrap(cx.kind.clone(), None),
        )
        .with_visibility(Arc::new(in_textblock))]
    }
}
