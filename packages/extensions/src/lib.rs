//! # Paper Extensions
//!
//! The node, mark and behaviour extensions of the Paper editor.
//!
//! - nodes: doc, text, paragraph, heading, blockquote, code block, bullet
//!   and ordered lists, todo list, image block, table
//! - marks: bold, italic, underline, strikethrough, code
//! - behaviours: history, base keymap, trailing paragraph, value
//!
//! ```rust,ignore
//! use paper_editor::{Editor, EditorConfig};
//! use paper_extensions::{extensions_with, CodeBlock, Value};
//!
//! let code = CodeBlock::new();
//! let sync = code.synchronizer().clone();
//! let set = extensions_with(code).extension(Value::new().on_change(|doc| save(doc)));
//! let editor = Editor::new(set, EditorConfig::load(".")?)?;
//! ```

pub mod behaviours;
pub mod marks;
pub mod nodes;

pub use behaviours::{BaseKeymap, History, TrailingParagraph, Value};
pub use marks::{Bold, Code, Italic, Strikethrough, Underline};
pub use nodes::{
    Blockquote, BulletList, CodeBlock, CodeBlockView, Doc, Heading, ImageBlock, ListItem, OrderedList, Paragraph,
    Table, Text, TodoItem, TodoList,
};

use paper_editor::ExtensionSet;

/// Every extension, in precedence order.
pub fn default_extensions() -> ExtensionSet {
    extensions_with(CodeBlock::new())
}

/// Every extension, with a caller-built code block (to keep its
/// synchronizer, or to pin its identities).
pub fn extensions_with(code_block: CodeBlock) -> ExtensionSet {
    ExtensionSet::new()
        .node(Doc)
        .node(Text)
        .node(Paragraph)
        .node(Heading)
        .node(Blockquote)
        .node(code_block)
        .node(BulletList)
        .node(OrderedList)
        .node(TodoList)
        .node(ImageBlock)
        .node(Table)
        .mark(Bold)
        .mark(Italic)
        .mark(Underline)
        .mark(Strikethrough)
        .mark(Code)
        .extension(History)
        .extension(BaseKeymap)
        .extension(TrailingParagraph)
}
