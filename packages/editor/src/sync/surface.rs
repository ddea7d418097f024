//! The embedded text surface, as the synchronizer sees it.
//!
//! Offsets are in characters, counted from the start of the region's text.

use paper_model::Attrs;

/// A primitive edit of a surface's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceOp {
    Insert { offset: usize, text: String },
    Delete { offset: usize, len: usize },
    Replace { offset: usize, len: usize, text: String },
}

/// Edits reported by a surface use the same three shapes.
pub type SurfaceEdit = SurfaceOp;

impl SurfaceOp {
    /// The op replacing `len` characters at `offset` with `text`, or `None`
    /// when that changes nothing.
    pub fn from_parts(offset: usize, len: usize, text: &str) -> Option<Self> {
        match (len, text.is_empty()) {
            (0, true) => None,
            (0, false) => Some(SurfaceOp::Insert {
                offset,
                text: text.to_string(),
            }),
            (len, true) => Some(SurfaceOp::Delete { offset, len }),
            (len, false) => Some(SurfaceOp::Replace {
                offset,
                len,
                text: text.to_string(),
            }),
        }
    }

    pub fn offset(&self) -> usize {
        match self {
            SurfaceOp::Insert { offset, .. } | SurfaceOp::Delete { offset, .. } | SurfaceOp::Replace { offset, .. } => {
                *offset
            }
        }
    }

    /// Characters removed.
    pub fn removed(&self) -> usize {
        match self {
            SurfaceOp::Insert { .. } => 0,
            SurfaceOp::Delete { len, .. } | SurfaceOp::Replace { len, .. } => *len,
        }
    }

    pub fn inserted(&self) -> &str {
        match self {
            SurfaceOp::Insert { text, .. } | SurfaceOp::Replace { text, .. } => text,
            SurfaceOp::Delete { .. } => "",
        }
    }

    /// `text` with the op applied; `None` when the op reaches past its end.
    pub fn apply_to(&self, text: &str) -> Option<String> {
        let chars: Vec<char> = text.chars().collect();
        let (start, end) = (self.offset(), self.offset() + self.removed());
        if end > chars.len() {
            return None;
        }
        let mut out: String = chars[..start].iter().collect();
        out.push_str(self.inserted());
        out.extend(&chars[end..]);
        Some(out)
    }
}

/// An independently rendered plain-text editor bound to one region.
///
/// The rendering layer owns surfaces; the synchronizer only pushes
/// operations into them.
pub trait EmbeddedSurface: Send + Sync {
    /// Replace the whole text, on (re)initialization.
    fn set_content(&self, text: &str);

    fn apply(&self, op: &SurfaceOp);

    /// The region's attributes changed (language, for a code block).
    fn set_attributes(&self, _attrs: &Attrs) {}

    fn dispose(&self) {}
}
