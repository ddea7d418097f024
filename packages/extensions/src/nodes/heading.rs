use paper_editor::commands::toggle_block_type;
use paper_editor::input_rules::{textblock_type_input_rule, AttrsFromMatch};
use paper_editor::{ConfigError, InputMatch, InputRule, MenuItem, NodeContext, NodeExtension};
use paper_model::{AttrSpec, Attrs, NodeSpec};
use serde_json::Value;
use std::sync::Arc;

/// Levels that get a toolbar button.
const MENU_LEVELS: [u64; 3] = [1, 2, 3];

pub fn level_attrs(level: u64) -> Attrs {
    Attrs::from([("level".to_string(), Value::from(level))])
}

pub struct Heading;

impl NodeExtension for Heading {
    fn name(&self) -> &str {
        "heading"
    }

    fn spec(&self) -> NodeSpec {
        NodeSpec::new()
            .content("text*")
            .marks("")
            .group("block")
            .defining()
            .attr("level", AttrSpec::with_default(1))
    }

    fn input_rules(&self, cx: &NodeContext) -> Result<Vec<InputRule>, ConfigError> {
        // `## ` makes a level 2 heading
        let level: AttrsFromMatch = Arc::new(|found: &InputMatch| found.group(1).map(|hashes| level_attrs(hashes.len() as u64)));
        Ok(vec![textblock_type_input_rule(r"^(#{1,6})\s$", cx.kind.clone(), Some(level))?])
    }

    fn menus(&self, cx: &NodeContext) -> Vec<MenuItem> {
        MENU_LEVELS
            .iter()
            .map(|&level| {
                let attrs = level_attrs(level);
                MenuItem::for_block(
                    format!("heading{level}"),
                    cx.kind.clone(),
                    Some(attrs.clone()),
                    toggle_block_type(cx.kind.clone(), Some(attrs)),
                )
            })
            .collect()
    }
}
