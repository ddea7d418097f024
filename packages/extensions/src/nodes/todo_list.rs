use super::in_textblock;
use paper_editor::commands::{command, lift_out_of, split_list_item, toggle_wrap, Command};
use paper_editor::input_rules::wrapping_input_rule;
use paper_editor::{
    is_node_active, ConfigError, EditorState, InputRule, KeyBinding, MenuItem, NodeContext, NodeExtension,
};
use paper_model::{AttrSpec, Node, NodeSpec, NodeType};
use serde_json::Value;
use std::sync::Arc;

pub const TODO_ITEM: &str = "todo_item";

pub struct TodoList;

impl NodeExtension for TodoList {
    fn name(&self) -> &str {
        "todo_list"
    }

    fn spec(&self) -> NodeSpec {
        NodeSpec::new().content("todo_item+").group("block")
    }

    fn child_nodes(&self) -> Vec<Arc<dyn NodeExtension>> {
        vec![Arc::new(TodoItem)]
    }

    fn input_rules(&self, cx: &NodeContext) -> Result<Vec<InputRule>, ConfigError> {
        Ok(vec![wrapping_input_rule(r"^(\[\s?\])\s$", cx.kind.clone(), None)?])
    }

    fn menus(&self, cx: &NodeContext) -> Vec<MenuItem> {
        let kind = cx.kind.clone();
        vec![MenuItem::new(
            "todo_list",
            Arc::new(move |state: &EditorState| is_node_active(state, &kind, None)),
            toggle_wrap(cx.kind.clone(), None),
        )
        .with_visibility(Arc::new(in_textblock))]
    }
}

pub struct TodoItem;

impl NodeExtension for TodoItem {
    fn name(&self) -> &str {
        TODO_ITEM
    }

    fn spec(&self) -> NodeSpec {
        NodeSpec::new()
            .content("paragraph block*")
            .defining()
            .attr("checked", AttrSpec::with_default(false))
    }

    fn key_bindings(&self, cx: &NodeContext) -> Vec<KeyBinding> {
        vec![
            KeyBinding::new("Enter", split_todo_item(cx.kind.clone())),
            KeyBinding::new("Mod-Enter", toggle_checked(cx.kind.clone())),
            KeyBinding::new("Mod-[", lift_out_of(cx.kind.clone())),
        ]
    }
}

/// Position before the innermost `kind` node around `pos`.
fn item_before(doc: &Node, pos: usize, kind: &NodeType) -> Option<usize> {
    let resolved = doc.resolve(pos).ok()?;
    let depth = resolved.find_ancestor(|node| node.kind().as_ref() == kind)?;
    (depth > 0).then(|| resolved.before(depth))
}

/// Split the item like a list item; the new item starts unchecked.
pub fn split_todo_item(kind: Arc<NodeType>) -> Command {
    let split = split_list_item(kind.clone());
    command(move |state| {
        let mut tr = split(state)?;
        let head = tr.selection().head();
        if let Some(pos) = item_before(tr.doc(), head, &kind) {
            tr.set_node_attribute(pos, "checked", Value::Bool(false)).ok()?;
        }
        Some(tr)
    })
}

/// Flip `checked` on the item around the selection.
pub fn toggle_checked(kind: Arc<NodeType>) -> Command {
    command(move |state| {
        let pos = item_before(state.doc(), state.selection().from(), &kind)?;
        let checked = state
            .doc()
            .node_at(pos)?
            .attr("checked")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let mut tr = state.tr();
        tr.set_node_attribute(pos, "checked", Value::Bool(!checked)).ok()?;
        Some(tr)
    })
}
