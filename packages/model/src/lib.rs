//! # Paper Document Model
//!
//! Typed, immutable document trees for the Paper editor.
//!
//! ## Architecture
//!
//! ```text
//! SchemaSpec ──► Schema ──┬──► NodeType (content expression, attrs, marks)
//!                         └──► MarkType (rank, exclusions)
//!
//! Node ─── Fragment ─── Node ...      positions: one token per char and
//!   │                                 per node boundary
//!   ├── resolve(pos) ──► ResolvedPos
//!   ├── slice(from, to) ──► Slice
//!   └── replace(from, to, slice) ──► Node (content-checked)
//!
//! NodeJson ◄──► Node                  upgrade_document() for legacy JSON
//! ```
//!
//! Every structural edit goes through [`Node::replace`], which refuses to
//! build a tree that violates a kind's content expression.

pub mod attrs;
pub mod content;
pub mod error;
pub mod fragment;
pub mod json;
pub mod mark;
pub mod node;
mod replace;
pub mod resolved;
pub mod schema;
pub mod slice;
pub mod upgrade;

pub use attrs::{AttrSpec, Attrs};
pub use content::{ContentExpr, ContentMatch};
pub use error::{ModelError, ModelResult, SchemaError};
pub use fragment::Fragment;
pub use json::{MarkJson, NodeJson};
pub use mark::Mark;
pub use node::Node;
pub use resolved::{NodeRange, ResolvedPos};
pub use schema::{MarkSpec, MarkType, NodeSpec, NodeType, Schema, SchemaSpec};
pub use slice::Slice;
pub use upgrade::upgrade_document;
