//! Editing commands.
//!
//! A command looks at a state and returns the transaction it would
//! dispatch, or `None` when it does not apply. Key bindings, menus and
//! [`crate::Editor::exec`] all run commands.

use crate::selection::Selection;
use crate::state::EditorState;
use crate::structure::{find_wrapping, lift_target};
use crate::transaction::Transaction;
use paper_model::{Attrs, MarkType, Node, NodeType};
use std::sync::Arc;

pub type Command = Arc<dyn Fn(&EditorState) -> Option<Transaction> + Send + Sync>;

pub fn command<F>(f: F) -> Command
where
    F: Fn(&EditorState) -> Option<Transaction> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Try commands in order; the first that applies wins.
pub fn chain_commands(commands: Vec<Command>) -> Command {
    command(move |state| commands.iter().find_map(|cmd| cmd(state)))
}

fn mark_applies(doc: &Node, from: usize, to: usize, kind: &MarkType) -> bool {
    let mut can = false;
    if doc.kind().inline_content() {
        can = doc.kind().allows_mark_type(kind);
    }
    doc.nodes_between(from, to, |node: &Node, _: usize, _: Option<&Node>, _: usize| {
        if can {
            return false;
        }
        can = node.kind().inline_content() && node.kind().allows_mark_type(kind);
        true
    });
    can
}

/// Toggle a mark on the selection, or in the stored marks at a caret.
pub fn toggle_mark(kind: Arc<MarkType>, attrs: Option<Attrs>) -> Command {
    command(move |state| {
        let selection = state.selection();
        let (from, to) = (selection.from(), selection.to());
        if (selection.is_empty() && selection.cursor_pos().is_none())
            || !mark_applies(state.doc(), from, to, &kind)
        {
            return None;
        }
        let mut tr = state.tr();
        if let Some(pos) = selection.cursor_pos() {
            let current = match state.stored_marks() {
                Some(marks) => marks.to_vec(),
                None => state.doc().resolve(pos).ok()?.marks(),
            };
            if kind.is_in_set(&current).is_some() {
                tr.remove_stored_mark(&kind).ok()?;
            } else {
                let mark = kind.create(attrs.as_ref()).ok()?;
                tr.add_stored_mark(&mark).ok()?;
            }
        } else if state.doc().range_has_mark(from, to, &kind) {
            tr.remove_mark(from, to, &kind).ok()?;
        } else {
            let mark = kind.create(attrs.as_ref()).ok()?;
            tr.add_mark(from, to, mark).ok()?;
        }
        Some(tr)
    })
}

/// Whether some textblock in the selection could become `kind`.
fn block_type_applies(state: &EditorState, kind: &NodeType, attrs: Option<&Attrs>) -> bool {
    let attrs = match kind.compute_attrs(attrs) {
        Ok(attrs) => attrs,
        Err(_) => return false,
    };
    let selection = state.selection();
    let mut applicable = false;
    state.doc().nodes_between(
        selection.from(),
        selection.to(),
        |node: &Node, pos: usize, _: Option<&Node>, _: usize| {
            if applicable {
                return false;
            }
            if !node.is_textblock() || node.has_markup(kind, &attrs, node.marks()) {
                return true;
            }
            if let Ok(resolved) = state.doc().resolve(pos) {
                let index = resolved.index(resolved.depth());
                applicable = resolved.parent().can_replace_with(index, index + 1, kind);
            }
            false
        },
    );
    applicable
}

pub fn set_block_type(kind: Arc<NodeType>, attrs: Option<Attrs>) -> Command {
    command(move |state| {
        if !block_type_applies(state, &kind, attrs.as_ref()) {
            return None;
        }
        let selection = state.selection();
        let mut tr = state.tr();
        tr.set_block_type(selection.from(), selection.to(), &kind, attrs.as_ref())
            .ok()?;
        Some(tr)
    })
}

/// Turn the selected blocks into `kind`, or back into the default
/// textblock when they already are.
pub fn toggle_block_type(kind: Arc<NodeType>, attrs: Option<Attrs>) -> Command {
    let set = set_block_type(kind.clone(), attrs.clone());
    command(move |state| {
        if crate::menu::is_node_active(state, &kind, attrs.as_ref()) {
            let default = state.schema().default_textblock()?.clone();
            set_block_type(default, None)(state)
        } else {
            set(state)
        }
    })
}

pub fn wrap_in(kind: Arc<NodeType>, attrs: Option<Attrs>) -> Command {
    command(move |state| {
        let selection = state.selection();
        let from = state.doc().resolve(selection.from()).ok()?;
        let to = state.doc().resolve(selection.to()).ok()?;
        let range = from.block_range(&to)?;
        find_wrapping(state.schema(), &range, &kind)?;
        let mut tr = state.tr();
        tr.wrap(&range, &kind, attrs.as_ref()).ok()?;
        Some(tr)
    })
}

/// Lift the selected blocks out of their enclosing wrapper.
pub fn lift() -> Command {
    command(|state| {
        let selection = state.selection();
        let from = state.doc().resolve(selection.from()).ok()?;
        let to = state.doc().resolve(selection.to()).ok()?;
        let range = from.block_range(&to)?;
        let target = lift_target(&range)?;
        let mut tr = state.tr();
        tr.lift(&range, target).ok()?;
        Some(tr)
    })
}

/// Lift the selection when it sits inside a `kind` node.
pub fn lift_out_of(kind: Arc<NodeType>) -> Command {
    let lift = lift();
    command(move |state| {
        if !has_ancestor(state, &kind) {
            return None;
        }
        lift(state)
    })
}

pub fn toggle_wrap(kind: Arc<NodeType>, attrs: Option<Attrs>) -> Command {
    let lift = lift_out_of(kind.clone());
    let wrap = wrap_in(kind, attrs);
    command(move |state| lift(state).or_else(|| wrap(state)))
}

fn has_ancestor(state: &EditorState, kind: &NodeType) -> bool {
    state
        .doc()
        .resolve(state.selection().from())
        .map(|pos| pos.find_ancestor(|node| node.kind().as_ref() == kind).is_some())
        .unwrap_or(false)
}

/// Insert a newline when the caret is in a code node.
pub fn newline_in_code() -> Command {
    command(|state| {
        let selection = state.selection();
        let from = state.doc().resolve(selection.from()).ok()?;
        if !from.parent().kind().is_code() || !from.same_parent(&state.doc().resolve(selection.to()).ok()?) {
            return None;
        }
        let mut tr = state.tr();
        tr.insert_text("\n", selection.from(), selection.to()).ok()?;
        Some(tr)
    })
}

/// Lift an empty textblock out of its wrapper.
pub fn lift_empty_block() -> Command {
    let lift = lift();
    command(move |state| {
        let pos = state.selection().cursor_pos()?;
        let resolved = state.doc().resolve(pos).ok()?;
        if resolved.depth() < 2 || resolved.parent().content().size() > 0 {
            return None;
        }
        lift(state)
    })
}

/// The first textblock kind that may follow the child at `index` in `node`.
fn default_block_after(state: &EditorState, node: &Node, index: usize) -> Option<Arc<NodeType>> {
    let kinds = node.content().nodes()[..index.min(node.child_count())]
        .iter()
        .map(|child| child.kind().index());
    let matched = node.kind().content_match().match_kinds(kinds)?;
    let types = state.schema().node_types();
    let found = matched.default_kind(|k| types.get(k).map(|t| t.is_textblock()).unwrap_or(false))?;
    types.get(found).cloned()
}

/// Split the textblock at the selection. At the end of a block the new
/// block gets the default textblock kind.
pub fn split_block() -> Command {
    command(|state| {
        let selection = state.selection();
        let from = state.doc().resolve(selection.from()).ok()?;
        let to = state.doc().resolve(selection.to()).ok()?;
        if !from.parent().is_textblock() || from.depth() == 0 {
            return None;
        }
        let at_end = to.parent_offset() == to.parent().content().size();
        let default = default_block_after(state, from.node(from.depth() - 1), from.index_after(from.depth() - 1));
        let mut tr = state.tr();
        tr.delete_selection().ok()?;
        let pos = tr.mapping().map(from.pos(), 1);
        match (&default, at_end) {
            (Some(kind), true) => tr.split(pos, 1, Some((kind, None))).ok()?,
            _ => tr.split(pos, 1, None).ok()?,
        };
        Some(tr)
    })
}

/// Split the list item around the caret. In an empty item, lift it out
/// of the list instead.
pub fn split_list_item(item: Arc<NodeType>) -> Command {
    let lift = lift();
    command(move |state| {
        let selection = state.selection();
        let from = state.doc().resolve(selection.from()).ok()?;
        if from.depth() < 2 || from.node(from.depth() - 1).kind().as_ref() != item.as_ref() {
            return None;
        }
        if from.parent().content().size() == 0 && from.index(from.depth() - 1) == 0 {
            return lift(state);
        }
        let mut tr = state.tr();
        tr.delete_selection().ok()?;
        let pos = tr.mapping().map(from.pos(), 1);
        tr.split(pos, 2, None).ok()?;
        Some(tr)
    })
}

pub fn delete_selection() -> Command {
    command(|state| {
        if state.selection().is_empty() {
            return None;
        }
        let mut tr = state.tr();
        tr.delete_selection().ok()?;
        Some(tr)
    })
}

/// Backspace at the start of a textblock: lift it out of its wrapper,
/// join it with the textblock before it, or delete the atom before it.
pub fn join_backward() -> Command {
    let lift = lift();
    command(move |state| {
        let pos = state.selection().cursor_pos()?;
        let cursor = state.doc().resolve(pos).ok()?;
        if cursor.parent_offset() > 0 || cursor.depth() == 0 {
            return None;
        }
        let depth = cursor.depth() - 1;
        let index = cursor.index(depth);
        if index == 0 {
            return lift(state);
        }
        let parent = cursor.node(depth);
        let before = parent.child(index - 1)?;
        let cut = cursor.before(cursor.depth());
        let mut tr = state.tr();
        if before.is_textblock() {
            tr.delete(cut - 1, cut + 1).ok()?;
        } else if before.is_atom() {
            tr.delete(cut - before.node_size(), cut).ok()?;
        } else if cursor.parent().content().size() == 0 {
            tr.delete(cut, cut + cursor.parent().node_size()).ok()?;
            let selection = Selection::near(tr.doc(), cut, -1);
            tr.set_selection(selection);
        } else {
            return None;
        }
        Some(tr)
    })
}

pub fn select_all() -> Command {
    command(|state| {
        let mut tr = state.tr();
        tr.set_selection(Selection::all(state.doc()));
        Some(tr)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateConfig;
    use paper_model::{AttrSpec, MarkSpec, NodeSpec, Schema, SchemaSpec};
    use serde_json::Value;

    fn schema() -> Arc<Schema> {
        Schema::new(
            SchemaSpec::default()
                .node("doc", NodeSpec::new().content("block+"))
                .node("paragraph", NodeSpec::new().content("inline*").group("block"))
                .node(
                    "heading",
                    NodeSpec::new()
                        .content("text*")
                        .marks("")
                        .group("block")
                        .attr("level", AttrSpec::with_default(1)),
                )
                .node("blockquote", NodeSpec::new().content("block+").group("block"))
                .node(
                    "code_block",
                    NodeSpec::new()
                        .content("text*")
                        .marks("")
                        .group("block")
                        .code()
                        .attr("language", AttrSpec::with_default(Value::Null)),
                )
                .node("text", NodeSpec::new().group("inline"))
                .mark("bold", MarkSpec::new()),
        )
        .unwrap()
    }

    fn state(schema: &Arc<Schema>, blocks: Vec<Node>, selection: Selection) -> EditorState {
        let doc = schema.node("doc", None, blocks).unwrap();
        EditorState::create(StateConfig::new(schema.clone()).with_doc(doc).with_selection(selection)).unwrap()
    }

    fn para(schema: &Schema, text: &str) -> Node {
        let content = if text.is_empty() {
            vec![]
        } else {
            vec![schema.text(text, vec![]).unwrap()]
        };
        schema.node("paragraph", None, content).unwrap()
    }

    fn run(cmd: &Command, state: &EditorState) -> Option<EditorState> {
        cmd(state).map(|tr| state.apply(tr).unwrap())
    }

    #[test]
    fn test_toggle_mark_on_range_and_caret() {
        let schema = schema();
        let bold = schema.mark_type("bold").unwrap().clone();
        let toggle = toggle_mark(bold.clone(), None);

        let s = state(&schema, vec![para(&schema, "hello")], Selection::text(1, 3));
        let s = run(&toggle, &s).unwrap();
        assert!(s.doc().range_has_mark(1, 3, &bold));
        let s = run(&toggle, &s).unwrap();
        assert!(!s.doc().range_has_mark(1, 6, &bold));

        let caret = state(&schema, vec![para(&schema, "hello")], Selection::cursor(2));
        let caret = run(&toggle, &caret).unwrap();
        assert_eq!(caret.stored_marks().map(|m| m.len()), Some(1));
        assert!(!caret.doc().range_has_mark(1, 6, &bold));
    }

    #[test]
    fn test_toggle_mark_skips_code() {
        let schema = schema();
        let code = schema
            .node("code_block", None, vec![schema.text("x", vec![]).unwrap()])
            .unwrap();
        let s = state(&schema, vec![code], Selection::text(1, 2));
        let bold = schema.mark_type("bold").unwrap().clone();
        assert!(toggle_mark(bold, None)(&s).is_none());
    }

    #[test]
    fn test_toggle_block_type() {
        let schema = schema();
        let heading = schema.node_type("heading").unwrap().clone();
        let s = state(&schema, vec![para(&schema, "title")], Selection::cursor(2));
        let toggle = toggle_block_type(heading, None);

        let s = run(&toggle, &s).unwrap();
        assert_eq!(s.doc().child(0).unwrap().type_name(), "heading");
        let s = run(&toggle, &s).unwrap();
        assert_eq!(s.doc().child(0).unwrap().type_name(), "paragraph");
    }

    #[test]
    fn test_toggle_wrap() {
        let schema = schema();
        let quote = schema.node_type("blockquote").unwrap().clone();
        let s = state(&schema, vec![para(&schema, "q")], Selection::cursor(1));
        let toggle = toggle_wrap(quote, None);

        let wrapped = run(&toggle, &s).unwrap();
        assert_eq!(wrapped.doc().child(0).unwrap().type_name(), "blockquote");
        let unwrapped = run(&toggle, &wrapped).unwrap();
        assert_eq!(unwrapped.doc(), s.doc());
    }

    #[test]
    fn test_split_block_at_end_of_heading() {
        let schema = schema();
        let heading = schema
            .node("heading", None, vec![schema.text("Title", vec![]).unwrap()])
            .unwrap();
        let s = state(&schema, vec![heading], Selection::cursor(6));
        let s = run(&split_block(), &s).unwrap();

        assert_eq!(s.doc().child_count(), 2);
        assert_eq!(s.doc().child(1).unwrap().type_name(), "paragraph");
        assert_eq!(s.selection(), &Selection::cursor(8));
    }

    #[test]
    fn test_newline_in_code() {
        let schema = schema();
        let code = schema
            .node("code_block", None, vec![schema.text("a", vec![]).unwrap()])
            .unwrap();
        let s = state(&schema, vec![code], Selection::cursor(2));
        let s = run(&newline_in_code(), &s).unwrap();
        assert_eq!(s.doc().text_content(), "a\n");
        assert!(newline_in_code()(&state(&schema, vec![para(&schema, "a")], Selection::cursor(2))).is_none());
    }

    #[test]
    fn test_join_backward() {
        let schema = schema();
        let s = state(
            &schema,
            vec![para(&schema, "ab"), para(&schema, "cd")],
            Selection::cursor(5),
        );
        let s = run(&join_backward(), &s).unwrap();
        assert_eq!(s.doc().child_count(), 1);
        assert_eq!(s.doc().text_content(), "abcd");
        assert_eq!(s.selection(), &Selection::cursor(3));

        assert!(join_backward()(&state(&schema, vec![para(&schema, "ab")], Selection::cursor(1))).is_none());
    }

    #[test]
    fn test_chain_and_select_all() {
        let schema = schema();
        let s = state(&schema, vec![para(&schema, "ab")], Selection::cursor(1));
        let chained = chain_commands(vec![delete_selection(), select_all()]);
        let s = run(&chained, &s).unwrap();
        assert_eq!(s.selection(), &Selection::all(s.doc()));
        let s = run(&delete_selection(), &s).unwrap();
        assert_eq!(s.doc().child_count(), 1);
        assert_eq!(s.doc().content().size(), 2);
    }
}
