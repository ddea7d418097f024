//! # Transactions
//!
//! A transaction collects steps against one document, together with a
//! selection and a metadata map that tells plugins where the edit came
//! from.
//!
//! ## Design
//!
//! - Builder methods apply their steps immediately, so `doc()` is always
//!   the document after everything added so far
//! - A step that cannot be applied is not added; the transaction remembers
//!   the error and `EditorState::apply` rejects it as a whole
//! - The selection is kept as of the last `set_selection` and mapped
//!   forward on read
//! - Adding a step or setting the selection clears the stored marks

use crate::errors::StepError;
use crate::mapping::Mapping;
use crate::selection::Selection;
use crate::step::Step;
use crate::structure::find_wrapping;
use paper_model::{Attrs, Fragment, Mark, MarkType, Node, NodeRange, NodeType, Schema, Slice};
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Metadata value attached to a transaction.
pub type MetaValue = Arc<dyn Any + Send + Sync>;

/// `bool`: whether history should record the transaction (default true).
pub const ADD_TO_HISTORY: &str = "addToHistory";

/// [`AppendedFrom`]: set on transactions appended by plugins.
pub const APPENDED_TRANSACTION: &str = "appendedTransaction";

/// Metadata of the transaction an appended transaction was created for.
#[derive(Clone)]
pub struct AppendedFrom {
    meta: HashMap<String, MetaValue>,
}

impl AppendedFrom {
    pub fn meta<T: Any>(&self, key: &str) -> Option<&T> {
        self.meta.get(key).and_then(|value| value.downcast_ref())
    }

    pub fn has_meta(&self, key: &str) -> bool {
        self.meta.contains_key(key)
    }
}

#[derive(Clone)]
pub struct Transaction {
    schema: Arc<Schema>,
    before: Node,
    doc: Node,
    steps: Vec<Step>,
    docs: Vec<Node>,
    mapping: Mapping,
    selection: Selection,
    selection_for: usize,
    selection_set: bool,
    stored_marks: Option<Vec<Mark>>,
    stored_marks_set: bool,
    meta: HashMap<String, MetaValue>,
    error: Option<StepError>,
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.meta.keys().collect();
        keys.sort();
        f.debug_struct("Transaction")
            .field("steps", &self.steps)
            .field("selection", &self.selection())
            .field("meta", &keys)
            .field("error", &self.error)
            .finish()
    }
}

impl Transaction {
    pub(crate) fn new(
        schema: Arc<Schema>,
        doc: Node,
        selection: Selection,
        stored_marks: Option<Vec<Mark>>,
    ) -> Self {
        Self {
            schema,
            before: doc.clone(),
            doc,
            steps: Vec::new(),
            docs: Vec::new(),
            mapping: Mapping::new(),
            selection,
            selection_for: 0,
            selection_set: false,
            stored_marks,
            stored_marks_set: false,
            meta: HashMap::new(),
            error: None,
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// The document the transaction started from.
    pub fn before(&self) -> &Node {
        &self.before
    }

    /// The document after all steps so far.
    pub fn doc(&self) -> &Node {
        &self.doc
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// The document each step was applied to.
    pub fn docs(&self) -> &[Node] {
        &self.docs
    }

    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    pub fn doc_changed(&self) -> bool {
        !self.steps.is_empty()
    }

    pub fn error(&self) -> Option<&StepError> {
        self.error.as_ref()
    }

    pub fn selection(&self) -> Selection {
        if self.selection_for < self.steps.len() {
            self.selection
                .map(&self.doc, &self.mapping.slice(self.selection_for))
        } else {
            self.selection.clone()
        }
    }

    pub fn selection_set(&self) -> bool {
        self.selection_set
    }

    pub fn stored_marks(&self) -> Option<&[Mark]> {
        self.stored_marks.as_deref()
    }

    pub fn stored_marks_set(&self) -> bool {
        self.stored_marks_set
    }

    // Steps

    /// Apply and add a step. A failing step poisons the transaction.
    pub fn step(&mut self, step: Step) -> Result<&mut Self, StepError> {
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        match self.try_step(step) {
            Ok(()) => Ok(self),
            Err(error) => {
                self.error = Some(error.clone());
                Err(error)
            }
        }
    }

    /// Like [`Transaction::step`], but a failure leaves the transaction
    /// usable. Used when replaying steps that may no longer fit.
    pub fn maybe_step(&mut self, step: Step) -> Result<&mut Self, StepError> {
        self.try_step(step)?;
        Ok(self)
    }

    fn try_step(&mut self, step: Step) -> Result<(), StepError> {
        let doc = step.apply(&self.doc)?;
        self.mapping.append_map(step.step_map());
        self.docs.push(std::mem::replace(&mut self.doc, doc));
        self.steps.push(step);
        self.stored_marks = None;
        self.stored_marks_set = false;
        Ok(())
    }

    pub fn replace(&mut self, from: usize, to: usize, slice: Slice) -> Result<&mut Self, StepError> {
        if from == to && slice.is_empty() {
            return Ok(self);
        }
        self.step(Step::replace(from, to, slice))
    }

    pub fn replace_with(&mut self, from: usize, to: usize, nodes: Vec<Node>) -> Result<&mut Self, StepError> {
        self.replace(from, to, Slice::closed(Fragment::from_vec(nodes)))
    }

    pub fn insert(&mut self, pos: usize, nodes: Vec<Node>) -> Result<&mut Self, StepError> {
        self.replace_with(pos, pos, nodes)
    }

    pub fn delete(&mut self, from: usize, to: usize) -> Result<&mut Self, StepError> {
        self.replace(from, to, Slice::empty())
    }

    /// Replace `from..to` with text carrying the stored marks, or the marks
    /// at `from` when none are stored. Marks the parent does not allow are
    /// dropped.
    pub fn insert_text(&mut self, text: &str, from: usize, to: usize) -> Result<&mut Self, StepError> {
        if text.is_empty() {
            return self.delete(from, to);
        }
        let resolved = self.doc.resolve(from)?;
        let marks = match &self.stored_marks {
            Some(marks) => marks.clone(),
            None => resolved.marks(),
        };
        let parent = resolved.parent().kind().clone();
        let marks = marks
            .into_iter()
            .filter(|mark| parent.allows_mark_type(mark.kind()))
            .collect();
        let node = self.schema.text(text, marks)?;
        self.replace_with(from, to, vec![node])?;
        let selection = self.selection();
        if !selection.is_empty() {
            let near = Selection::near(&self.doc, selection.to(), 1);
            self.set_selection(near);
        }
        Ok(self)
    }

    /// Replace the selection with text.
    pub fn insert_text_at_selection(&mut self, text: &str) -> Result<&mut Self, StepError> {
        let selection = self.selection();
        self.insert_text(text, selection.from(), selection.to())
    }

    pub fn delete_selection(&mut self) -> Result<&mut Self, StepError> {
        let selection = self.selection();
        if selection.is_empty() {
            return Ok(self);
        }
        if let Selection::All { to } = selection {
            let empty = self.schema.empty_document()?;
            return self.replace(0, to, Slice::closed(empty.content().clone()));
        }
        self.delete(selection.from(), selection.to())
    }

    /// Add `mark` to the inline content in `from..to`, replacing marks it
    /// excludes.
    pub fn add_mark(&mut self, from: usize, to: usize, mark: Mark) -> Result<&mut Self, StepError> {
        let mut removed: Vec<(usize, usize, Mark)> = Vec::new();
        let mut added: Vec<(usize, usize)> = Vec::new();
        self.doc.nodes_between(from, to, |node: &Node, pos: usize, parent: Option<&Node>, _: usize| {
            if !node.is_inline() {
                return true;
            }
            let allowed = parent
                .map(|parent| parent.kind().allows_mark_type(mark.kind()))
                .unwrap_or(false);
            if !mark.is_in_set(node.marks()) && allowed {
                let start = pos.max(from);
                let end = (pos + node.node_size()).min(to);
                let new_set = mark.add_to_set(node.marks());
                for old in node.marks() {
                    if old.is_in_set(&new_set) {
                        continue;
                    }
                    match removed.last_mut() {
                        Some(last) if last.1 == start && last.2 == *old => last.1 = end,
                        _ => removed.push((start, end, old.clone())),
                    }
                }
                match added.last_mut() {
                    Some(last) if last.1 == start => last.1 = end,
                    _ => added.push((start, end)),
                }
            }
            true
        });
        for (from, to, mark) in removed {
            self.step(Step::RemoveMark { from, to, mark })?;
        }
        for (from, to) in added {
            self.step(Step::AddMark {
                from,
                to,
                mark: mark.clone(),
            })?;
        }
        Ok(self)
    }

    /// Remove every mark of `kind` from the inline content in `from..to`.
    pub fn remove_mark(&mut self, from: usize, to: usize, kind: &MarkType) -> Result<&mut Self, StepError> {
        // (mark, from, to, index of the inline node that last extended it)
        let mut matched: Vec<(Mark, usize, usize, usize)> = Vec::new();
        let mut index = 0;
        self.doc.nodes_between(from, to, |node: &Node, pos: usize, _: Option<&Node>, _: usize| {
            if !node.is_inline() {
                return true;
            }
            index += 1;
            let end = (pos + node.node_size()).min(to);
            for mark in node.marks().iter().filter(|mark| mark.kind().name() == kind.name()) {
                let continued = matched
                    .iter_mut()
                    .find(|m| m.3 + 1 == index && m.0 == *mark);
                match continued {
                    Some(m) => {
                        m.2 = end;
                        m.3 = index;
                    }
                    None => matched.push((mark.clone(), pos.max(from), end, index)),
                }
            }
            true
        });
        for (mark, from, to, _) in matched {
            self.step(Step::RemoveMark { from, to, mark })?;
        }
        Ok(self)
    }

    /// Change the node at `pos`. `None` keeps the current kind.
    pub fn set_node_markup(
        &mut self,
        pos: usize,
        kind: Option<&Arc<NodeType>>,
        attrs: Option<Attrs>,
    ) -> Result<&mut Self, StepError> {
        let node = self
            .doc
            .node_at(pos)
            .filter(|node| !node.is_text())
            .ok_or(StepError::NoNodeAt(pos))?;
        let kind = kind.unwrap_or(node.kind()).clone();
        let attrs = kind.compute_attrs(attrs.as_ref().or(Some(node.attrs())))?;
        let marks = node.marks().to_vec();
        self.step(Step::SetNodeMarkup {
            pos,
            kind,
            attrs,
            marks,
        })
    }

    /// Set one attribute of the node at `pos`.
    pub fn set_node_attribute(&mut self, pos: usize, name: &str, value: Value) -> Result<&mut Self, StepError> {
        let node = self
            .doc
            .node_at(pos)
            .filter(|node| !node.is_text())
            .ok_or(StepError::NoNodeAt(pos))?;
        let mut attrs = node.attrs().clone();
        attrs.insert(name.to_string(), value);
        self.set_node_markup(pos, None, Some(attrs))
    }

    /// Turn every textblock in `from..to` into `kind`, dropping content
    /// the new kind does not allow.
    pub fn set_block_type(
        &mut self,
        from: usize,
        to: usize,
        kind: &Arc<NodeType>,
        attrs: Option<&Attrs>,
    ) -> Result<&mut Self, StepError> {
        if !kind.is_textblock() {
            return Err(StepError::structure(
                "set block type",
                format!("{} is not a textblock", kind.name()),
            ));
        }
        let attrs = kind.compute_attrs(attrs)?;
        let map_from = self.steps.len();
        let mut targets: Vec<(usize, Vec<Mark>)> = Vec::new();
        self.doc.nodes_between(from, to, |node: &Node, pos: usize, _: Option<&Node>, _: usize| {
            if node.is_textblock() {
                if !node.has_markup(kind, &attrs, node.marks()) {
                    targets.push((pos, node.marks().to_vec()));
                }
                return false;
            }
            true
        });
        for (pos, marks) in targets {
            let mapped = self.mapping.slice(map_from).map(pos, 1);
            if !can_change_type(&self.doc, mapped, kind) {
                continue;
            }
            self.clear_incompatible(mapped, kind)?;
            let mapped = self.mapping.slice(map_from).map(pos, 1);
            self.step(Step::SetNodeMarkup {
                pos: mapped,
                kind: kind.clone(),
                attrs: attrs.clone(),
                marks,
            })?;
        }
        Ok(self)
    }

    /// Remove the children and marks of the node at `pos` that `kind`
    /// would not accept, and fill in required content.
    pub fn clear_incompatible(&mut self, pos: usize, kind: &Arc<NodeType>) -> Result<&mut Self, StepError> {
        let node = self
            .doc
            .node_at(pos)
            .filter(|node| !node.is_text())
            .ok_or(StepError::NoNodeAt(pos))?
            .clone();
        let mut deletions = Vec::new();
        let mut mark_removals = Vec::new();
        let mut matched = Some(kind.content_match());
        let mut cur = pos + 1;
        for child in node.content() {
            let end = cur + child.node_size();
            let next = matched.as_ref().and_then(|m| m.match_kind(child.kind().index()));
            match next {
                None => deletions.push((cur, end)),
                Some(next) => {
                    matched = Some(next);
                    for mark in child.marks() {
                        if !kind.allows_mark_type(mark.kind()) {
                            mark_removals.push((cur, end, mark.clone()));
                        }
                    }
                }
            }
            cur = end;
        }
        let fill = match &matched {
            Some(m) if !m.valid_end() => m
                .fill_before(&[], true, |k| {
                    self.schema
                        .node_types()
                        .get(k)
                        .map(|t| !t.is_text() && !t.has_required_attrs())
                        .unwrap_or(false)
                })
                .unwrap_or_default(),
            _ => Vec::new(),
        };
        for (from, to, mark) in mark_removals {
            self.step(Step::RemoveMark { from, to, mark })?;
        }
        if !fill.is_empty() {
            let mut nodes = Vec::new();
            for index in fill {
                let name = match self.schema.node_types().get(index) {
                    Some(kind) => kind.name().to_string(),
                    None => continue,
                };
                if let Some(node) = self.schema.create_and_fill(&name, None, Fragment::empty())? {
                    nodes.push(node);
                }
            }
            self.insert(cur, nodes)?;
        }
        for (from, to) in deletions.into_iter().rev() {
            self.delete(from, to)?;
        }
        Ok(self)
    }

    /// Wrap `range` in `kind`, adding the intermediate node `kind` needs.
    pub fn wrap(&mut self, range: &NodeRange, kind: &Arc<NodeType>, attrs: Option<&Attrs>) -> Result<&mut Self, StepError> {
        let wrappers = find_wrapping(&self.schema, range, kind)
            .ok_or_else(|| StepError::structure("wrap", format!("no valid wrapping in {}", kind.name())))?;
        let mut content = Fragment::empty();
        for (depth, wrapper) in wrappers.iter().enumerate().rev() {
            let wrapper_attrs = if depth == 0 { attrs } else { None };
            content = Fragment::from_node(wrapper.create(wrapper_attrs, content, Vec::new())?);
        }
        let (start, end) = (range.start(), range.end());
        self.step(Step::ReplaceAround {
            from: start,
            to: end,
            gap_from: start,
            gap_to: end,
            slice: Slice::closed(content),
            insert: wrappers.len(),
        })
    }

    /// Move the blocks in `range` out of their ancestors up to `target`
    /// depth, splitting ancestors that have content around the range.
    pub fn lift(&mut self, range: &NodeRange, target: usize) -> Result<&mut Self, StepError> {
        let from = range.from();
        let to = range.to();
        let depth = range.depth();
        let gap_start = from.before(depth + 1);
        let gap_end = to.after(depth + 1);
        let mut start = gap_start;
        let mut end = gap_end;

        let mut before = Fragment::empty();
        let mut open_start = 0;
        let mut splitting = false;
        for d in ((target + 1)..=depth).rev() {
            if splitting || from.index(d) > 0 {
                splitting = true;
                before = Fragment::from_node(from.node(d).copy(before));
                open_start += 1;
            } else {
                start -= 1;
            }
        }

        let mut after = Fragment::empty();
        let mut open_end = 0;
        splitting = false;
        for d in ((target + 1)..=depth).rev() {
            if splitting || to.after(d + 1) < to.end(d) {
                splitting = true;
                after = Fragment::from_node(to.node(d).copy(after));
                open_end += 1;
            } else {
                end += 1;
            }
        }

        let insert = before.size() - open_start;
        self.step(Step::ReplaceAround {
            from: start,
            to: end,
            gap_from: gap_start,
            gap_to: gap_end,
            slice: Slice::new(before.append(&after), open_start, open_end),
            insert,
        })
    }

    /// Split the node at `pos`, `depth` levels deep. The innermost new node
    /// gets `type_after` when given.
    pub fn split(
        &mut self,
        pos: usize,
        depth: usize,
        type_after: Option<(&Arc<NodeType>, Option<&Attrs>)>,
    ) -> Result<&mut Self, StepError> {
        let resolved = self.doc.resolve(pos)?;
        if depth == 0 || depth > resolved.depth() {
            return Err(StepError::structure("split", format!("depth {depth} at {pos}")));
        }
        let mut before = Fragment::empty();
        let mut after = Fragment::empty();
        let innermost = resolved.depth();
        for d in ((resolved.depth() - depth + 1)..=resolved.depth()).rev() {
            before = Fragment::from_node(resolved.node(d).copy(before));
            after = match type_after {
                Some((kind, attrs)) if d == innermost => {
                    Fragment::from_node(kind.create(attrs, after, Vec::new())?)
                }
                _ => Fragment::from_node(resolved.node(d).copy(after)),
            };
        }
        self.step(Step::replace(pos, pos, Slice::new(before.append(&after), depth, depth)))
    }

    /// Join the blocks on either side of `pos`.
    pub fn join(&mut self, pos: usize, depth: usize) -> Result<&mut Self, StepError> {
        if pos < depth {
            return Err(StepError::structure("join", format!("depth {depth} at {pos}")));
        }
        self.delete(pos - depth, pos + depth)
    }

    // Selection and marks

    pub fn set_selection(&mut self, selection: Selection) -> &mut Self {
        self.selection = selection;
        self.selection_for = self.steps.len();
        self.selection_set = true;
        self.stored_marks = None;
        self.stored_marks_set = false;
        self
    }

    /// Marks applied to the next typed text.
    pub fn set_stored_marks(&mut self, marks: Option<Vec<Mark>>) -> &mut Self {
        self.stored_marks = marks;
        self.stored_marks_set = true;
        self
    }

    pub fn add_stored_mark(&mut self, mark: &Mark) -> Result<&mut Self, StepError> {
        let current = self.current_marks()?;
        Ok(self.set_stored_marks(Some(mark.add_to_set(&current))))
    }

    pub fn remove_stored_mark(&mut self, kind: &MarkType) -> Result<&mut Self, StepError> {
        let current = self.current_marks()?;
        Ok(self.set_stored_marks(Some(kind.remove_from_set(&current))))
    }

    fn current_marks(&self) -> Result<Vec<Mark>, StepError> {
        match &self.stored_marks {
            Some(marks) => Ok(marks.clone()),
            None => Ok(self.doc.resolve(self.selection().head())?.marks()),
        }
    }

    // Metadata

    pub fn set_meta<T: Any + Send + Sync>(&mut self, key: &str, value: T) -> &mut Self {
        self.meta.insert(key.to_string(), Arc::new(value));
        self
    }

    pub fn meta<T: Any>(&self, key: &str) -> Option<&T> {
        self.meta.get(key).and_then(|value| value.downcast_ref())
    }

    pub fn has_meta(&self, key: &str) -> bool {
        self.meta.contains_key(key)
    }

    pub fn set_add_to_history(&mut self, record: bool) -> &mut Self {
        self.set_meta(ADD_TO_HISTORY, record)
    }

    pub fn add_to_history(&self) -> bool {
        self.meta::<bool>(ADD_TO_HISTORY).copied().unwrap_or(true)
    }

    /// Mark this transaction as appended on behalf of `root`.
    pub(crate) fn mark_appended(&mut self, root: &Transaction) {
        let from = AppendedFrom {
            meta: root.meta.clone(),
        };
        self.set_meta(APPENDED_TRANSACTION, from);
    }

    pub fn appended_from(&self) -> Option<&AppendedFrom> {
        self.meta(APPENDED_TRANSACTION)
    }
}

fn can_change_type(doc: &Node, pos: usize, kind: &NodeType) -> bool {
    match doc.resolve(pos) {
        Ok(resolved) => {
            let index = resolved.index(resolved.depth());
            resolved.parent().can_replace_with(index, index + 1, kind)
        }
        Err(_) => false,
    }
}
