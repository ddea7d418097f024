mod bold;
mod code;
mod italic;
mod strikethrough;
mod underline;

pub use bold::Bold;
pub use code::Code;
pub use italic::Italic;
pub use strikethrough::Strikethrough;
pub use underline::Underline;

use paper_editor::commands::toggle_mark;
use paper_editor::{KeyBinding, MarkContext, MenuItem};

/// Toolbar button toggling the mark.
fn mark_menu(cx: &MarkContext) -> MenuItem {
    MenuItem::for_mark(cx.kind.name(), cx.kind.clone(), toggle_mark(cx.kind.clone(), None))
}

fn toggle_binding(chord: &str, cx: &MarkContext) -> KeyBinding {
    KeyBinding::new(chord, toggle_mark(cx.kind.clone(), None))
}
