use paper_editor::commands::{command, Command};
use paper_editor::{KeyBinding, NodeContext, NodeExtension, Selection};
use paper_model::{AttrSpec, Fragment, NodeSpec};
use serde_json::Value;

pub const IMAGE_BLOCK: &str = "image_block";

/// An image with an editable caption.
pub struct ImageBlock;

impl NodeExtension for ImageBlock {
    fn name(&self) -> &str {
        IMAGE_BLOCK
    }

    fn spec(&self) -> NodeSpec {
        NodeSpec::new()
            .content("text*")
            .marks("")
            .group("block")
            .isolating()
            .attr("src", AttrSpec::with_default(Value::Null))
            .attr("naturalWidth", AttrSpec::with_default(Value::Null))
            .attr("naturalHeight", AttrSpec::with_default(Value::Null))
            .attr("thumbnail", AttrSpec::with_default(Value::Null))
    }

    fn key_bindings(&self, _cx: &NodeContext) -> Vec<KeyBinding> {
        vec![
            KeyBinding::new("Enter", leave_caption()),
            KeyBinding::new("Backspace", remove_at_caption_start()),
        ]
    }
}

/// Enter in a caption continues in a new paragraph after the image.
fn leave_caption() -> Command {
    command(|state| {
        let selection = state.selection();
        let from = state.doc().resolve(selection.from()).ok()?;
        let to = state.doc().resolve(selection.to()).ok()?;
        if from.parent().type_name() != IMAGE_BLOCK || !from.same_parent(&to) {
            return None;
        }
        let paragraph = state.schema().default_textblock()?.name().to_string();
        let block = state.schema().create_and_fill(&paragraph, None, Fragment::empty()).ok()??;
        let after = from.after(from.depth());
        let mut tr = state.tr();
        tr.insert(after, vec![block]).ok()?;
        tr.set_selection(Selection::cursor(after + 1));
        Some(tr)
    })
}

/// Backspace at the start of an empty-selection caption removes the image.
fn remove_at_caption_start() -> Command {
    command(|state| {
        let pos = state.selection().cursor_pos()?;
        let resolved = state.doc().resolve(pos).ok()?;
        if resolved.parent().type_name() != IMAGE_BLOCK || resolved.parent_offset() > 0 {
            return None;
        }
        let depth = resolved.depth();
        let start = resolved.before(depth);
        let mut tr = state.tr();
        tr.delete(start, resolved.after(depth)).ok()?;
        let selection = Selection::near(tr.doc(), start, -1);
        tr.set_selection(selection);
        Some(tr)
    })
}
