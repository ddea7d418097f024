mod base_keymap;
mod history;
mod trailing_paragraph;
mod value;

pub use base_keymap::BaseKeymap;
pub use history::History;
pub use trailing_paragraph::{TrailingParagraph, TrailingParagraphPlugin};
pub use value::{ChangeHandler, Value};
