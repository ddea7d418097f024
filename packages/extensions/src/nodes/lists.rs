//! Bullet and ordered lists. Both hold [`ListItem`]s; the item kind is
//! brought in by whichever list registers first.

use super::in_textblock;
use paper_editor::commands::{lift_out_of, split_list_item, toggle_wrap};
use paper_editor::input_rules::{wrapping_input_rule, AttrsFromMatch};
use paper_editor::{
    is_node_active, ConfigError, EditorState, InputMatch, InputRule, KeyBinding, MenuItem, NodeContext,
    NodeExtension,
};
use paper_model::{AttrSpec, Attrs, NodeSpec};
use serde_json::Value;
use std::sync::Arc;

pub const LIST_ITEM: &str = "list_item";

fn wrap_menu(name: &str, cx: &NodeContext) -> MenuItem {
    let kind = cx.kind.clone();
    MenuItem::new(
        name,
        Arc::new(move |state: &EditorState| is_node_active(state, &kind, None)),
        toggle_wrap(cx.kind.clone(), None),
    )
    .with_visibility(Arc::new(in_textblock))
}

pub struct BulletList;

impl NodeExtension for BulletList {
    fn name(&self) -> &str {
        "bullet_list"
    }

    fn spec(&self) -> NodeSpec {
        NodeSpec::new().content("list_item+").group("block")
    }

    fn child_nodes(&self) -> Vec<Arc<dyn NodeExtension>> {
        vec![Arc::new(ListItem)]
    }

    fn input_rules(&self, cx: &NodeContext) -> Result<Vec<InputRule>, ConfigError> {
        Ok(vec![wrapping_input_rule(r"^\s*([-+*])\s$", cx.kind.clone(), None)?])
    }

    fn menus(&self, cx: &NodeContext) -> Vec<MenuItem> {
        vec![wrap_menu("bullet_list", cx)]
    }
}

pub struct OrderedList;

impl NodeExtension for OrderedList {
    fn name(&self) -> &str {
        "ordered_list"
    }

    fn spec(&self) -> NodeSpec {
        NodeSpec::new()
            .content("list_item+")
            .group("block")
            .attr("order", AttrSpec::with_default(1))
    }

    fn child_nodes(&self) -> Vec<Arc<dyn NodeExtension>> {
        vec![Arc::new(ListItem)]
    }

    fn input_rules(&self, cx: &NodeContext) -> Result<Vec<InputRule>, ConfigError> {
        // `3. ` starts a list counting from 3
        let order: AttrsFromMatch = Arc::new(|found: &InputMatch| {
            let start = found.group(1)?.parse::<u64>().ok()?;
            Some(Attrs::from([("order".to_string(), Value::from(start))]))
        });
        Ok(vec![wrapping_input_rule(r"^(\d+)\.\s$", cx.kind.clone(), Some(order))?])
    }

    fn menus(&self, cx: &NodeContext) -> Vec<MenuItem> {
        vec![wrap_menu("ordered_list", cx)]
    }
}

pub struct ListItem;

impl NodeExtension for ListItem {
    fn name(&self) -> &str {
        LIST_ITEM
    }

    fn spec(&self) -> NodeSpec {
        NodeSpec::new().content("paragraph block*").defining()
    }

    fn key_bindings(&self, cx: &NodeContext) -> Vec<KeyBinding> {
        vec![
            KeyBinding::new("Enter", split_list_item(cx.kind.clone())),
            KeyBinding::new("Mod-[", lift_out_of(cx.kind.clone())),
        ]
    }
}
