mod blockquote;
mod code_block;
mod doc;
mod heading;
mod image_block;
mod lists;
mod table;
mod todo_list;

pub use blockquote::Blockquote;
pub use code_block::{CodeBlock, CodeBlockView, SurfaceFactory, CODE_BLOCK};
pub use doc::{Doc, Paragraph, Text};
pub use heading::{level_attrs, Heading};
pub use image_block::{ImageBlock, IMAGE_BLOCK};
pub use lists::{BulletList, ListItem, OrderedList, LIST_ITEM};
pub use table::{go_to_cell, insert_table, Table, TableCell, TableRow, TABLE, TABLE_CELL, TABLE_HEADER, TABLE_ROW};
pub use todo_list::{split_todo_item, toggle_checked, TodoItem, TodoList, TODO_ITEM};

use paper_editor::EditorState;

/// Whether the selection starts in a textblock; wrap menus only apply there.
pub(crate) fn in_textblock(state: &EditorState) -> bool {
    state
        .doc()
        .resolve(state.selection().from())
        .map(|pos| pos.parent().is_textblock())
        .unwrap_or(false)
}
