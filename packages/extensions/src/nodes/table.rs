//! Tables: `table` → `tr` → `th` | `td`. Rows and cells come in as child
//! kinds of [`Table`]; cells hold blocks.

use super::in_textblock;
use paper_editor::commands::{command, Command};
use paper_editor::{is_node_active, EditorState, KeyBinding, MenuItem, NodeContext, NodeExtension, Selection};
use paper_model::{AttrSpec, Node, NodeSpec, ResolvedPos};
use std::sync::Arc;

pub const TABLE: &str = "table";
pub const TABLE_ROW: &str = "tr";
pub const TABLE_HEADER: &str = "th";
pub const TABLE_CELL: &str = "td";

/// Size of the table the menu inserts.
const NEW_TABLE: (usize, usize) = (3, 3);

pub struct Table;

impl NodeExtension for Table {
    fn name(&self) -> &str {
        TABLE
    }

    fn spec(&self) -> NodeSpec {
        NodeSpec::new().content("tr+").group("block").isolating()
    }

    fn child_nodes(&self) -> Vec<Arc<dyn NodeExtension>> {
        vec![Arc::new(TableRow)]
    }

    fn key_bindings(&self, _cx: &NodeContext) -> Vec<KeyBinding> {
        vec![
            KeyBinding::new("Tab", go_to_cell(1)),
            KeyBinding::new("Shift-Tab", go_to_cell(-1)),
        ]
    }

    fn menus(&self, cx: &NodeContext) -> Vec<MenuItem> {
        let kind = cx.kind.clone();
        vec![MenuItem::new(
            TABLE,
            Arc::new(move |state: &EditorState| is_node_active(state, &kind, None)),
            insert_table(NEW_TABLE.0, NEW_TABLE.1),
        )
        .with_visibility(Arc::new(in_textblock))]
    }
}

pub struct TableRow;

impl NodeExtension for TableRow {
    fn name(&self) -> &str {
        TABLE_ROW
    }

    fn spec(&self) -> NodeSpec {
        NodeSpec::new().content("(th | td)*")
    }

    fn child_nodes(&self) -> Vec<Arc<dyn NodeExtension>> {
        vec![Arc::new(TableCell(TABLE_HEADER)), Arc::new(TableCell(TABLE_CELL))]
    }
}

/// A header (`th`) or data (`td`) cell.
pub struct TableCell(&'static str);

impl NodeExtension for TableCell {
    fn name(&self) -> &str {
        self.0
    }

    fn spec(&self) -> NodeSpec {
        NodeSpec::new()
            .content("block+")
            .isolating()
            .attr("colspan", AttrSpec::with_default(1))
            .attr("rowspan", AttrSpec::with_default(1))
    }
}

fn is_cell(node: &Node) -> bool {
    matches!(node.type_name(), TABLE_HEADER | TABLE_CELL)
}

/// Insert a `rows` x `cols` table after the top-level block holding the
/// selection. The first row is the header; the caret lands in its first
/// cell.
pub fn insert_table(rows: usize, cols: usize) -> Command {
    command(move |state| {
        if rows == 0 || cols == 0 {
            return None;
        }
        let schema = state.schema();
        let paragraph = schema.default_textblock()?.name().to_string();
        let mut table_rows = Vec::with_capacity(rows);
        for row in 0..rows {
            let cell = if row == 0 { TABLE_HEADER } else { TABLE_CELL };
            let cells = (0..cols)
                .map(|_| {
                    let content = schema.node(&paragraph, None, vec![])?;
                    schema.node(cell, None, vec![content])
                })
                .collect::<Result<Vec<_>, _>>()
                .ok()?;
            table_rows.push(schema.node(TABLE_ROW, None, cells).ok()?);
        }
        let table = schema.node(TABLE, None, table_rows).ok()?;

        let resolved = state.doc().resolve(state.selection().from()).ok()?;
        if resolved.depth() == 0 {
            return None;
        }
        let after = resolved.after(1);
        let mut tr = state.tr();
        tr.insert(after, vec![table]).ok()?;
        // table, row, cell, paragraph
        tr.set_selection(Selection::cursor(after + 4));
        Some(tr)
    })
}

/// Depth of the innermost cell around `pos`.
fn cell_depth(pos: &ResolvedPos) -> Option<usize> {
    (1..=pos.depth()).rev().find(|depth| is_cell(pos.node(*depth)))
}

/// Move the caret to the next (`dir > 0`) or previous cell of the table.
/// Not applicable outside a table or past its last cell.
pub fn go_to_cell(dir: isize) -> Command {
    command(move |state| {
        let resolved = state.doc().resolve(state.selection().head()).ok()?;
        let depth = cell_depth(&resolved)?;
        if depth < 2 {
            return None;
        }
        let table = resolved.node(depth - 2);
        let current = resolved.before(depth);

        let mut cells = Vec::new();
        let mut row_pos = resolved.start(depth - 2);
        for row in table.content().iter() {
            let mut cell_pos = row_pos + 1;
            for cell in row.content().iter() {
                cells.push(cell_pos);
                cell_pos += cell.node_size();
            }
            row_pos += row.node_size();
        }

        let index = cells.iter().position(|pos| *pos == current)?;
        let target = cells.get(index.checked_add_signed(dir)?)?;
        let mut tr = state.tr();
        let selection = Selection::near(tr.doc(), target + 1, 1);
        tr.set_selection(selection);
        Some(tr)
    })
}
