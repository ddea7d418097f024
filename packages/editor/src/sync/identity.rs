//! Region identities.
//!
//! Every embedded-region node carries an `editorId` attribute. Nodes are
//! created without one (typing a fence, paste, undo), so after every
//! transaction [`EditorIdPlugin`] appends one corrective transaction that
//! gives each region lacking a usable id a fresh one, in document order.
//!
//! An id is unusable when it is missing, when another region already
//! holds it, or when it was retired. An id is retired the moment it
//! disappears from the document and is never handed out again.

use crate::mapping::Mapping;
use crate::plugin::{Plugin, PluginState};
use crate::state::EditorState;
use crate::transaction::Transaction;
use crc32fast::Hasher;
use paper_model::Node;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Attribute holding a region's identity.
pub const EDITOR_ID_ATTR: &str = "editorId";

/// Transaction meta set on identity assignments; holds the counter value
/// after the assignment.
pub const EDITOR_ID_META: &str = "editorId$";

/// Identity of one editing client, used to tag the transactions it
/// produces so they are not echoed back to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(String);

impl ClientId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Produces `{seed}-{n}` identities.
///
/// The generator holds no counter; the counter lives in the plugin state so
/// that replaying the same transactions gives the same ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdGenerator {
    seed: String,
}

impl IdGenerator {
    /// A generator with a random seed (CRC32 of a v4 UUID).
    pub fn random() -> Self {
        let mut hasher = Hasher::new();
        hasher.update(uuid::Uuid::new_v4().as_bytes());
        Self {
            seed: format!("{:08x}", hasher.finalize()),
        }
    }

    pub fn from_seed(seed: impl Into<String>) -> Self {
        Self { seed: seed.into() }
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    pub fn id(&self, n: u64) -> String {
        format!("{}-{}", self.seed, n)
    }
}

/// Identities seen so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentityLedger {
    next: u64,
    live: HashSet<String>,
    retired: HashSet<String>,
}

impl IdentityLedger {
    /// Last counter value handed out.
    pub fn next(&self) -> u64 {
        self.next
    }

    pub fn is_live(&self, id: &str) -> bool {
        self.live.contains(id)
    }

    pub fn is_retired(&self, id: &str) -> bool {
        self.retired.contains(id)
    }

    pub fn retired_count(&self) -> usize {
        self.retired.len()
    }

    fn is_taken(&self, id: &str) -> bool {
        self.is_live(id) || self.is_retired(id)
    }
}

/// Every region of `kind` in `doc` with its position and id, document order.
/// An empty id counts as missing.
pub fn regions(doc: &Node, kind: &str) -> Vec<(usize, Option<String>)> {
    let mut found = Vec::new();
    doc.descendants(|node: &Node, pos: usize, _: Option<&Node>, _: usize| {
        if node.type_name() == kind {
            let id = node
                .attr_str(EDITOR_ID_ATTR)
                .filter(|id| !id.is_empty())
                .map(str::to_string);
            found.push((pos, id));
            return false;
        }
        !node.is_textblock()
    });
    found
}

/// Position of the region holding `editor_id`.
pub fn find_region_by_id<'a>(doc: &'a Node, kind: &str, editor_id: &str) -> Option<(usize, &'a Node)> {
    let pos = regions(doc, kind)
        .into_iter()
        .find(|(_, id)| id.as_deref() == Some(editor_id))
        .map(|(pos, _)| pos)?;
    doc.node_at(pos).map(|node| (pos, node))
}

#[derive(Debug, Clone)]
pub struct EditorIdPlugin {
    key: String,
    kind: String,
    generator: IdGenerator,
}

impl EditorIdPlugin {
    pub fn new(kind: impl Into<String>, generator: IdGenerator) -> Self {
        let kind = kind.into();
        Self {
            key: format!("{EDITOR_ID_ATTR}:{kind}"),
            kind,
            generator,
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Ledger of `state`, if this plugin is installed there.
    pub fn ledger<'a>(&self, state: &'a EditorState) -> Option<&'a IdentityLedger> {
        state.plugin_state::<IdentityLedger>(&self.key)
    }

    fn live_ids(&self, doc: &Node) -> HashSet<String> {
        regions(doc, &self.kind).into_iter().filter_map(|(_, id)| id).collect()
    }

    /// Positions of regions in `new` that need a fresh id.
    fn needing_ids(&self, trs: &[Transaction], old: &Node, new: &Node, ledger: &IdentityLedger) -> Vec<usize> {
        let found = regions(new, &self.kind);

        let mut holders: HashMap<&str, Vec<usize>> = HashMap::new();
        for (pos, id) in &found {
            if let Some(id) = id {
                holders.entry(id.as_str()).or_default().push(*pos);
            }
        }

        // Where each id sat before `trs`, mapped forward; the region found
        // there keeps the id when it is held twice.
        let mut mapping = Mapping::new();
        for tr in trs {
            mapping.append_mapping(tr.mapping());
        }
        let before: HashMap<String, usize> = regions(old, &self.kind)
            .into_iter()
            .filter_map(|(pos, id)| id.map(|id| (id, mapping.map(pos, 1))))
            .collect();

        let mut keepers: HashMap<&str, usize> = HashMap::new();
        for (id, positions) in &holders {
            let keeper = before
                .get(*id)
                .filter(|mapped| positions.contains(*mapped))
                .copied()
                .unwrap_or(positions[0]);
            keepers.insert(*id, keeper);
        }

        found
            .iter()
            .filter(|(pos, id)| match id {
                None => true,
                Some(id) => ledger.is_retired(id) || keepers.get(id.as_str()) != Some(pos),
            })
            .map(|(pos, _)| *pos)
            .collect()
    }
}

impl Plugin for EditorIdPlugin {
    fn key(&self) -> &str {
        &self.key
    }

    fn init_state(&self, state: &EditorState) -> Option<PluginState> {
        Some(Arc::new(IdentityLedger {
            next: 0,
            live: self.live_ids(state.doc()),
            retired: HashSet::new(),
        }))
    }

    fn apply_state(&self, tr: &Transaction, value: &PluginState, _old: &EditorState, new: &EditorState) -> PluginState {
        let Some(ledger) = value.downcast_ref::<IdentityLedger>() else {
            return value.clone();
        };
        if !tr.doc_changed() {
            return value.clone();
        }
        let live = self.live_ids(new.doc());
        let mut retired = ledger.retired.clone();
        retired.extend(ledger.live.difference(&live).cloned());
        let next = tr
            .meta::<u64>(EDITOR_ID_META)
            .copied()
            .unwrap_or(ledger.next)
            .max(ledger.next);
        Arc::new(IdentityLedger { next, live, retired })
    }

    fn append_transaction(&self, trs: &[Transaction], old: &EditorState, new: &EditorState) -> Option<Transaction> {
        let ledger = self.ledger(new)?;
        let positions = self.needing_ids(trs, old.doc(), new.doc(), ledger);
        if positions.is_empty() {
            return None;
        }

        let mut tr = new.tr();
        let mut next = ledger.next;
        let mut assigned = HashSet::new();
        for pos in positions {
            let id = loop {
                next += 1;
                let id = self.generator.id(next);
                if !ledger.is_taken(&id) && !assigned.contains(&id) {
                    break id;
                }
            };
            if let Err(error) = tr.set_node_attribute(pos, EDITOR_ID_ATTR, Value::String(id.clone())) {
                warn!(%error, pos, "could not assign region identity");
                return None;
            }
            debug!(kind = %self.kind, pos, id = %id, "assigned region identity");
            assigned.insert(id);
        }
        tr.set_meta(EDITOR_ID_META, next);
        Some(tr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateConfig;
    use paper_model::{AttrSpec, NodeSpec, Schema, SchemaSpec, Slice};
    use serde_json::json;

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
                        .attr(EDITOR_ID_ATTR, AttrSpec::with_default(Value::Null)),
                )
                .node("text", NodeSpec::new()),
        )
        .unwrap()
    }

    fn state(doc: Option<Node>) -> EditorState {
        let schema = schema();
        let plugin = EditorIdPlugin::new("code_block", IdGenerator::from_seed("s"));
        let mut config = StateConfig::new(schema).with_plugins(vec![Arc::new(plugin)]);
        if let Some(doc) = doc {
            config = config.with_doc(doc);
        }
        EditorState::create(config).unwrap()
    }

    fn code(schema: &Schema, id: Option<&str>, text: &str) -> Node {
        let attrs = serde_json::from_value(json!({ EDITOR_ID_ATTR: id })).unwrap();
        let content = if text.is_empty() {
            vec![]
        } else {
            vec![schema.text(text, vec![]).unwrap()]
        };
        schema.node("code_block", Some(&attrs), content).unwrap()
    }

    fn ids(state: &EditorState) -> Vec<Option<String>> {
        regions(state.doc(), "code_block").into_iter().map(|(_, id)| id).collect()
    }

    #[test]
    fn test_generator() {
        let generator = IdGenerator::from_seed("abc");
        assert_eq!(generator.id(3), "abc-3");
        let random = IdGenerator::random();
        assert_eq!(random.seed().len(), 8);
        assert_ne!(ClientId::random(), ClientId::random());
    }

    #[test]
    fn test_assigns_missing_ids_in_document_order() {
        let s = state(None);
        let schema = s.schema().clone();
        let mut tr = s.tr();
        tr.insert(0, vec![code(&schema, None, "a"), code(&schema, None, "b")]).unwrap();
        let applied = s.apply_transaction(tr).unwrap();

        assert_eq!(applied.transactions.len(), 2);
        assert_eq!(ids(&applied.state), vec![Some("s-1".to_string()), Some("s-2".to_string())]);
    }

    #[test]
    fn test_retired_ids_are_not_reused() {
        let s = state(None);
        let schema = s.schema().clone();
        let mut tr = s.tr();
        tr.insert(0, vec![code(&schema, None, "a")]).unwrap();
        let s = s.apply(tr).unwrap();
        let size = s.doc().child(0).unwrap().node_size();
        let removed = s.doc().slice(0, size).unwrap();

        let mut tr = s.tr();
        tr.delete(0, size).unwrap();
        let s = s.apply(tr).unwrap();
        let plugin = EditorIdPlugin::new("code_block", IdGenerator::from_seed("s"));
        assert!(plugin.ledger(&s).unwrap().is_retired("s-1"));

        // Putting the same node back does not bring its id back.
        let mut tr = s.tr();
        tr.replace(0, 0, removed).unwrap();
        let s = s.apply(tr).unwrap();
        assert_eq!(ids(&s), vec![Some("s-2".to_string())]);
    }

    #[test]
    fn test_pasted_copy_gets_new_id() {
        let schema = schema();
        let doc = schema.node("doc", None, vec![code(&schema, Some("orig"), "x")]).unwrap();
        let s = state(Some(doc));
        let copy = Slice::closed(paper_model::Fragment::from_node(code(&schema, Some("orig"), "x")));

        let mut tr = s.tr();
        tr.replace(0, 0, copy).unwrap();
        let s = s.apply(tr).unwrap();
        // The original moved right and keeps its id.
        assert_eq!(ids(&s), vec![Some("s-1".to_string()), Some("orig".to_string())]);
    }

    #[test]
    fn test_nothing_to_assign() {
        let s = state(None);
        let mut tr = s.tr();
        tr.insert_text_at_selection("plain").unwrap();
        let applied = s.apply_transaction(tr).unwrap();
        assert_eq!(applied.transactions.len(), 1);
    }
}
