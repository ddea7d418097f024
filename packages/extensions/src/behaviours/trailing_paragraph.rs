use paper_editor::{EditorState, Extension, ExtensionContext, Plugin, Transaction};
use paper_model::Fragment;
use std::sync::Arc;
use tracing::debug;

/// Keeps an empty paragraph after a trailing block the caret could not
/// otherwise leave (a code block, an image, a list).
pub struct TrailingParagraph;

impl Extension for TrailingParagraph {
    fn name(&self) -> &str {
        "trailing_paragraph"
    }

    fn plugins(&self, cx: &ExtensionContext) -> Vec<Arc<dyn Plugin>> {
        if !cx.config.trailing_paragraph {
            return Vec::new();
        }
        vec![Arc::new(TrailingParagraphPlugin)]
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TrailingParagraphPlugin;

impl Plugin for TrailingParagraphPlugin {
    fn key(&self) -> &str {
        "trailingParagraph"
    }

    fn append_transaction(
        &self,
        _trs: &[Transaction],
        _old_state: &EditorState,
        new_state: &EditorState,
    ) -> Option<Transaction> {
        let doc = new_state.doc();
        let paragraph = new_state.schema().default_textblock()?;
        if doc.last_child().map(|last| last.kind() == paragraph).unwrap_or(false) {
            return None;
        }
        let node = new_state
            .schema()
            .create_and_fill(paragraph.name(), None, Fragment::empty())
            .ok()??;
        let end = doc.content().size();
        let mut tr = new_state.tr();
        tr.insert(end, vec![node]).ok()?;
        debug!(pos = end, "appended trailing paragraph");
        Some(tr)
    }
}
