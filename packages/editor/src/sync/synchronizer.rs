//! # Region Synchronizer
//!
//! Keeps the text of embedded surfaces and their region nodes equal.
//!
//! ## Host to surface
//!
//! After every `apply`, each replace step of each transaction is checked
//! against the document it was applied to. A step whose range lies
//! strictly inside one region and that inserts plain text (or nothing)
//! becomes one [`SurfaceOp`] at `pos - (region start + 1)`. Steps that
//! touch region boundaries or insert structure are left to a full
//! re-render. With no surface registered for the region the op is
//! dropped; a surface reads the node's text when it attaches.
//!
//! ## Surface to host
//!
//! A surface edit becomes one text replacement in a transaction tagged
//! with this synchronizer's [`ClientId`]. Transactions carrying that tag
//! are never translated back.

use super::identity::{find_region_by_id, regions, ClientId};
use super::registry::{editor_id, SurfaceRegistry};
use super::surface::{SurfaceEdit, SurfaceOp};
use super::CLIENT_ID_META;
use crate::errors::{EditorResult, StepError, SyncError};
use crate::plugin::Plugin;
use crate::selection::Selection;
use crate::state::EditorState;
use crate::step::Step;
use crate::transaction::Transaction;
use paper_model::{Attrs, Node};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

/// A host step expressed in a surface's offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub editor_id: String,
    pub op: SurfaceOp,
}

pub struct Synchronizer {
    client: ClientId,
    kind: String,
    registry: Arc<dyn SurfaceRegistry>,
}

impl fmt::Debug for Synchronizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Synchronizer")
            .field("client", &self.client)
            .field("kind", &self.kind)
            .finish()
    }
}

impl Synchronizer {
    pub fn new(client: ClientId, kind: impl Into<String>, registry: Arc<dyn SurfaceRegistry>) -> Self {
        Self {
            client,
            kind: kind.into(),
            registry,
        }
    }

    pub fn client(&self) -> &ClientId {
        &self.client
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn registry(&self) -> &Arc<dyn SurfaceRegistry> {
        &self.registry
    }

    /// The region whose text strictly contains `from..to`, with its position.
    pub fn find_region<'a>(&self, doc: &'a Node, from: usize, to: usize) -> Option<(usize, &'a Node)> {
        let resolved = doc.resolve(from).ok()?;
        let depth = (1..=resolved.depth())
            .rev()
            .find(|depth| resolved.node(*depth).type_name() == self.kind)?;
        let pos = resolved.before(depth);
        let node = doc.node_at(pos)?;
        (from > pos && to < pos + node.node_size()).then_some((pos, node))
    }

    /// Translate one step applied to `doc`. `Ok(None)` when the step is not
    /// a plain-text edit inside a region.
    pub fn translate_step(&self, step: &Step, doc: &Node) -> Result<Option<Translation>, SyncError> {
        let Step::Replace { from, to, slice } = step else {
            return Ok(None);
        };
        let text = if slice.is_empty() {
            ""
        } else {
            match slice.single_text() {
                Some(text) => text,
                None => return Ok(None),
            }
        };
        let Some((pos, node)) = self.find_region(doc, *from, *to) else {
            return Ok(None);
        };
        let editor_id = editor_id(node)?;
        Ok(
            SurfaceOp::from_parts(from - (pos + 1), to - from, text).map(|op| Translation {
                editor_id: editor_id.to_string(),
                op,
            }),
        )
    }

    /// Push the edits of `trs` into registered surfaces. Returns what was
    /// delivered.
    ///
    /// A step inside a region that has no identity yet is skipped on its
    /// own: such a region was created in the same log and cannot have a
    /// surface. Only a region that was already unidentified before the
    /// transaction is an error.
    pub fn host_to_surface(&self, trs: &[Transaction]) -> Vec<Translation> {
        let mut delivered = Vec::new();
        for tr in trs {
            if tr.meta::<ClientId>(CLIENT_ID_META) == Some(&self.client) {
                debug!(client = %self.client, "skipping own transaction");
                continue;
            }
            for (step, doc) in tr.steps().iter().zip(tr.docs()) {
                let translation = match self.translate_step(step, doc) {
                    Ok(Some(translation)) => translation,
                    Ok(None) => continue,
                    Err(err) => {
                        if tr.docs().first().map(|before| self.has_unidentified(before)).unwrap_or(false) {
                            error!(error = %err, kind = %self.kind, "region was never given an identity");
                        } else {
                            debug!(kind = %self.kind, "skipping step in a region created by this transaction");
                        }
                        continue;
                    }
                };
                match self.registry.get_by_id(&translation.editor_id) {
                    Some(surface) => {
                        debug!(editor_id = %translation.editor_id, op = ?translation.op, "sync to surface");
                        surface.apply(&translation.op);
                        delivered.push(translation);
                    }
                    None => {
                        debug!(editor_id = %translation.editor_id, "no surface attached, dropping op");
                    }
                }
            }
        }
        delivered
    }

    fn has_unidentified(&self, doc: &Node) -> bool {
        regions(doc, &self.kind).iter().any(|(_, id)| id.is_none())
    }

    fn region<'a>(&self, doc: &'a Node, editor_id: &str) -> Result<(usize, &'a Node), SyncError> {
        find_region_by_id(doc, &self.kind, editor_id).ok_or_else(|| SyncError::UnknownRegion(editor_id.to_string()))
    }

    /// The transaction performing a surface's local edit on the host.
    pub fn surface_edit(&self, state: &EditorState, editor_id: &str, edit: SurfaceEdit) -> EditorResult<Transaction> {
        let (pos, node) = self.region(state.doc(), editor_id)?;
        let len = node.content().size();
        if edit.offset() + edit.removed() > len {
            return Err(SyncError::OffsetOutOfRange {
                editor_id: editor_id.to_string(),
                offset: edit.offset(),
                len,
            }
            .into());
        }
        let from = pos + 1 + edit.offset();
        let mut tr = state.tr();
        tr.insert_text(edit.inserted(), from, from + edit.removed())?;
        tr.set_meta(CLIENT_ID_META, self.client.clone());
        Ok(tr)
    }

    /// Merge `attrs` into the region's attributes. The identity is kept.
    pub fn attribute_change(&self, state: &EditorState, editor_id: &str, attrs: &Attrs) -> EditorResult<Transaction> {
        let (pos, node) = self.region(state.doc(), editor_id)?;
        let mut merged = node.attrs().clone();
        for (name, value) in attrs {
            if name != super::EDITOR_ID_ATTR {
                merged.insert(name.clone(), value.clone());
            }
        }
        let mut tr = state.tr();
        tr.set_node_markup(pos, None, Some(merged))?;
        Ok(tr)
    }

    /// Turn the region back into the default textblock, caret at its start.
    /// Used when the surface reports backspace at its very start.
    pub fn exit_region(&self, state: &EditorState, editor_id: &str) -> EditorResult<Transaction> {
        let (pos, _) = self.region(state.doc(), editor_id)?;
        let kind = state
            .schema()
            .default_textblock()
            .ok_or_else(|| StepError::structure("exit region", "schema has no default textblock"))?
            .clone();
        let mut tr = state.tr();
        tr.set_node_markup(pos, Some(&kind), Some(Attrs::new()))?;
        tr.set_selection(Selection::cursor(pos + 1));
        Ok(tr)
    }

    /// Current text of a region.
    pub fn region_text(&self, doc: &Node, editor_id: &str) -> Option<String> {
        find_region_by_id(doc, &self.kind, editor_id).map(|(_, node)| node.text_content())
    }
}

/// Runs [`Synchronizer::host_to_surface`] after every `apply`.
pub struct SyncPlugin {
    key: String,
    sync: Arc<Synchronizer>,
}

impl SyncPlugin {
    pub fn new(sync: Arc<Synchronizer>) -> Self {
        Self {
            key: format!("sync:{}", sync.kind()),
            sync,
        }
    }
}

impl Plugin for SyncPlugin {
    fn key(&self) -> &str {
        &self.key
    }

    fn after_apply(&self, trs: &[Transaction], _old: &EditorState, _new: &EditorState) {
        self.sync.host_to_surface(trs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateConfig;
    use crate::sync::registry::InstanceRegistry;
    use crate::sync::surface::EmbeddedSurface;
    use crate::sync::EDITOR_ID_ATTR;
    use paper_model::{AttrSpec, Fragment, NodeSpec, Schema, SchemaSpec, Slice};
    use serde_json::{json, Value};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        ops: Mutex<Vec<SurfaceOp>>,
    }

    impl EmbeddedSurface for Recorder {
        fn set_content(&self, _text: &str) {}

        fn apply(&self, op: &SurfaceOp) {
            self.ops.lock().unwrap().push(op.clone());
        }
    }

    fn schema() -> Arc<Schema> {
        Schema::new(
            SchemaSpec::default()
                .node("doc", NodeSpec::new().content("block+"))
                .node("paragraph", NodeSpec::new().content("text*").group("block"))
                .node(
                    "code_block",
                    NodeSpec::new()
                        .content("text*")
                        .group("block")
                        .marks("")
                        .code()
                        .attr(EDITOR_ID_ATTR, AttrSpec::with_default(Value::Null))
                        .attr("language", AttrSpec::with_default(Value::Null)),
                )
                .node("text", NodeSpec::new()),
        )
        .unwrap()
    }

    /// `<p>ab</p><code id=c-1>hello</code>`: the code text starts at 5.
    fn state() -> EditorState {
        let schema = schema();
        let attrs = serde_json::from_value(json!({ EDITOR_ID_ATTR: "c-1" })).unwrap();
        let doc = schema
            .node(
                "doc",
                None,
                vec![
                    schema.node("paragraph", None, vec![schema.text("ab", vec![]).unwrap()]).unwrap(),
                    schema
                        .node("code_block", Some(&attrs), vec![schema.text("hello", vec![]).unwrap()])
                        .unwrap(),
                ],
            )
            .unwrap();
        EditorState::create(StateConfig::new(schema).with_doc(doc)).unwrap()
    }

    fn synchronizer() -> (Synchronizer, Arc<InstanceRegistry>) {
        let registry = Arc::new(InstanceRegistry::new());
        let sync = Synchronizer::new(ClientId::new("me"), "code_block", registry.clone());
        (sync, registry)
    }

    fn text_slice(state: &EditorState, text: &str) -> Slice {
        Slice::closed(Fragment::from_node(state.schema().text(text, vec![]).unwrap()))
    }

    #[test]
    fn test_translate_offsets() {
        let (sync, _) = synchronizer();
        let s = state();
        let doc = s.doc();

        let insert = Step::replace(6, 6, text_slice(&s, "X"));
        assert_eq!(
            sync.translate_step(&insert, doc).unwrap().map(|t| t.op),
            Some(SurfaceOp::Insert {
                offset: 1,
                text: "X".into()
            })
        );
        let delete = Step::replace(5, 10, Slice::empty());
        assert_eq!(
            sync.translate_step(&delete, doc).unwrap().map(|t| t.op),
            Some(SurfaceOp::Delete { offset: 0, len: 5 })
        );
        let replace = Step::replace(7, 9, text_slice(&s, "LL"));
        let translation = sync.translate_step(&replace, doc).unwrap().unwrap();
        assert_eq!(translation.editor_id, "c-1");
        assert_eq!(
            translation.op,
            SurfaceOp::Replace {
                offset: 2,
                len: 2,
                text: "LL".into()
            }
        );
    }

    #[test]
    fn test_edits_outside_regions_are_skipped() {
        let (sync, _) = synchronizer();
        let s = state();
        // In the paragraph.
        assert_eq!(sync.translate_step(&Step::replace(2, 2, text_slice(&s, "x")), s.doc()).unwrap(), None);
        // Across the region's opening boundary.
        assert_eq!(sync.translate_step(&Step::replace(3, 6, Slice::empty()), s.doc()).unwrap(), None);
        // Structure, not text.
        let block = Slice::closed(Fragment::from_node(s.schema().node("paragraph", None, vec![]).unwrap()));
        assert_eq!(sync.translate_step(&Step::replace(6, 6, block), s.doc()).unwrap(), None);
    }

    #[test]
    fn test_missing_identity_is_an_error() {
        let (sync, _) = synchronizer();
        let s = state();
        let mut tr = s.tr();
        tr.set_node_attribute(4, EDITOR_ID_ATTR, Value::Null).unwrap();
        let doc = tr.doc().clone();
        assert!(matches!(
            sync.translate_step(&Step::replace(6, 6, text_slice(&s, "x")), &doc),
            Err(SyncError::MissingIdentity { .. })
        ));
    }

    #[test]
    fn test_own_edits_are_not_echoed() {
        let (sync, registry) = synchronizer();
        let surface = Arc::new(Recorder::default());
        registry.set_by_id("c-1", surface.clone());
        let s = state();

        let tr = sync
            .surface_edit(
                &s,
                "c-1",
                SurfaceEdit::Insert {
                    offset: 5,
                    text: "!".into(),
                },
            )
            .unwrap();
        assert_eq!(tr.meta::<ClientId>(CLIENT_ID_META), Some(&ClientId::new("me")));
        let applied = s.apply_transaction(tr).unwrap();
        assert_eq!(sync.region_text(applied.state.doc(), "c-1").as_deref(), Some("hello!"));
        assert!(sync.host_to_surface(&applied.transactions).is_empty());

        // Another client's edit goes through.
        let mut tr = applied.state.tr();
        tr.insert_text("?", 5, 5).unwrap();
        tr.set_meta(CLIENT_ID_META, ClientId::new("other"));
        let delivered = sync.host_to_surface(&[tr]);
        assert_eq!(delivered.len(), 1);
        assert_eq!(surface.ops.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_ops_without_surface_are_dropped() {
        let (sync, _) = synchronizer();
        let s = state();
        let mut tr = s.tr();
        tr.insert_text("x", 6, 6).unwrap();
        assert!(sync.host_to_surface(&[tr]).is_empty());
    }

    #[test]
    fn test_new_region_does_not_stall_later_steps() {
        let (sync, registry) = synchronizer();
        let surface = Arc::new(Recorder::default());
        registry.set_by_id("c-1", surface.clone());
        let s = state();

        // A fresh region typed into, then an edit to the attached one,
        // now starting at 7 with its text at 8.
        let mut tr = s.tr();
        let fresh = s.schema().node("code_block", None, vec![]).unwrap();
        tr.insert(0, vec![fresh]).unwrap();
        tr.insert_text("x", 1, 1).unwrap();
        tr.insert_text("Z", 8, 8).unwrap();
        assert_eq!(sync.region_text(tr.doc(), "c-1").as_deref(), Some("Zhello"));

        let delivered = sync.host_to_surface(&[tr]);
        assert_eq!(delivered.len(), 1);
        assert_eq!(
            surface.ops.lock().unwrap().as_slice(),
            &[SurfaceOp::Insert {
                offset: 0,
                text: "Z".into()
            }]
        );
    }

    #[test]
    fn test_surface_edit_bounds() {
        let (sync, _) = synchronizer();
        let s = state();
        let err = sync
            .surface_edit(&s, "c-1", SurfaceEdit::Delete { offset: 3, len: 9 })
            .unwrap_err();
        assert!(matches!(
            err,
            crate::errors::EditorError::Sync(SyncError::OffsetOutOfRange { len: 5, .. })
        ));
        assert!(sync
            .surface_edit(&s, "nope", SurfaceEdit::Delete { offset: 0, len: 1 })
            .is_err());
    }

    #[test]
    fn test_attribute_change_and_exit() {
        let (sync, _) = synchronizer();
        let s = state();
        let attrs = serde_json::from_value(json!({ "language": "rust", EDITOR_ID_ATTR: "hijack" })).unwrap();
        let s = s.apply(sync.attribute_change(&s, "c-1", &attrs).unwrap()).unwrap();
        let code = s.doc().child(1).unwrap();
        assert_eq!(code.attr_str("language"), Some("rust"));
        assert_eq!(code.attr_str(EDITOR_ID_ATTR), Some("c-1"));

        let s = s.apply(sync.exit_region(&s, "c-1").unwrap()).unwrap();
        assert_eq!(s.doc().child(1).unwrap().type_name(), "paragraph");
        assert_eq!(s.doc().child(1).unwrap().text_content(), "hello");
        assert_eq!(s.selection(), &Selection::cursor(5));
    }
}
