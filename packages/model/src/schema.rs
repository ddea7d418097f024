//! # Schema
//!
//! The closed set of node and mark kinds a document may contain, together
//! with each kind's content expression, attributes and mark rules.
//!
//! Schemas are immutable once built and shared behind an `Arc`; every
//! [`Node`] holds an `Arc` to its [`NodeType`].

use crate::attrs::{compute_attrs, AttrSpec, Attrs};
use crate::content::{ContentExpr, ContentMatch};
use crate::error::{ModelError, ModelResult, SchemaError};
use crate::fragment::Fragment;
use crate::mark::Mark;
use crate::node::Node;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

/// Declaration of a node kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeSpec {
    /// Content expression; `None` means the kind is a leaf.
    pub content: Option<String>,
    /// Allowed marks: `None` allows every mark in inline content and none
    /// elsewhere, `""` allows none, `"_"` allows all.
    pub marks: Option<String>,
    /// Space separated groups the kind belongs to.
    pub group: Option<String>,
    pub inline: bool,
    pub atom: bool,
    /// Text inside is code: input rules do not fire and marks do not apply.
    pub code: bool,
    pub defining: bool,
    pub isolating: bool,
    pub attrs: BTreeMap<String, AttrSpec>,
}

impl NodeSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(mut self, expr: impl Into<String>) -> Self {
        self.content = Some(expr.into());
        self
    }

    pub fn marks(mut self, marks: impl Into<String>) -> Self {
        self.marks = Some(marks.into());
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn attr(mut self, name: impl Into<String>, spec: AttrSpec) -> Self {
        self.attrs.insert(name.into(), spec);
        self
    }

    pub fn inline(mut self) -> Self {
        self.inline = true;
        self
    }

    pub fn atom(mut self) -> Self {
        self.atom = true;
        self
    }

    pub fn code(mut self) -> Self {
        self.code = true;
        self
    }

    pub fn defining(mut self) -> Self {
        self.defining = true;
        self
    }

    pub fn isolating(mut self) -> Self {
        self.isolating = true;
        self
    }
}

/// Declaration of a mark kind.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkSpec {
    pub attrs: BTreeMap<String, AttrSpec>,
    /// Marks this one cannot coexist with: `None` excludes only itself,
    /// `""` excludes nothing, `"_"` excludes every mark.
    pub excludes: Option<String>,
    /// Whether the mark extends to text typed at its end.
    pub inclusive: bool,
    pub group: Option<String>,
}

impl Default for MarkSpec {
    fn default() -> Self {
        Self {
            attrs: BTreeMap::new(),
            excludes: None,
            inclusive: true,
            group: None,
        }
    }
}

impl MarkSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn excludes(mut self, excludes: impl Into<String>) -> Self {
        self.excludes = Some(excludes.into());
        self
    }

    pub fn attr(mut self, name: impl Into<String>, spec: AttrSpec) -> Self {
        self.attrs.insert(name.into(), spec);
        self
    }

    pub fn exclusive_end(mut self) -> Self {
        self.inclusive = false;
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }
}

/// Ordered node and mark declarations a schema is built from.
#[derive(Debug, Clone, Default)]
pub struct SchemaSpec {
    pub nodes: Vec<(String, NodeSpec)>,
    pub marks: Vec<(String, MarkSpec)>,
    /// Kind of the document root; defaults to the first node kind.
    pub top_node: Option<String>,
}

impl SchemaSpec {
    pub fn node(mut self, name: impl Into<String>, spec: NodeSpec) -> Self {
        self.nodes.push((name.into(), spec));
        self
    }

    pub fn mark(mut self, name: impl Into<String>, spec: MarkSpec) -> Self {
        self.marks.push((name.into(), spec));
        self
    }
}

pub struct NodeType {
    name: String,
    index: usize,
    spec: NodeSpec,
    groups: Vec<String>,
    content: ContentExpr,
    inline_content: bool,
    /// `None` allows every mark.
    allowed_marks: Option<BTreeSet<usize>>,
}

impl NodeType {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn spec(&self) -> &NodeSpec {
        &self.spec
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    pub fn content_expr(&self) -> &ContentExpr {
        &self.content
    }

    pub fn content_match(&self) -> ContentMatch<'_> {
        self.content.start()
    }

    pub fn is_text(&self) -> bool {
        self.name == "text"
    }

    pub fn is_inline(&self) -> bool {
        self.spec.inline || self.is_text()
    }

    pub fn is_block(&self) -> bool {
        !self.is_inline()
    }

    pub fn inline_content(&self) -> bool {
        self.inline_content
    }

    pub fn is_textblock(&self) -> bool {
        self.is_block() && self.inline_content
    }

    pub fn is_leaf(&self) -> bool {
        self.content.is_leaf()
    }

    pub fn is_atom(&self) -> bool {
        self.is_leaf() || self.spec.atom
    }

    pub fn is_code(&self) -> bool {
        self.spec.code
    }

    pub fn has_required_attrs(&self) -> bool {
        self.spec.attrs.values().any(AttrSpec::is_required)
    }

    pub fn allows_mark_type(&self, mark: &MarkType) -> bool {
        match &self.allowed_marks {
            None => true,
            Some(allowed) => allowed.contains(&mark.rank()),
        }
    }

    pub fn allows_marks(&self, marks: &[Mark]) -> bool {
        marks.iter().all(|mark| self.allows_mark_type(mark.kind()))
    }

    /// Whether nodes of the two kinds can be joined.
    pub fn compatible_content(&self, other: &NodeType) -> bool {
        self.name == other.name || self.content.compatible(&other.content)
    }

    pub fn compute_attrs(&self, given: Option<&Attrs>) -> ModelResult<Attrs> {
        compute_attrs(&self.spec.attrs, given).map_err(|attr| ModelError::MissingAttr {
            kind: self.name.clone(),
            attr,
        })
    }

    pub fn valid_content(&self, content: &Fragment) -> bool {
        self.content
            .matches(content.iter().map(|child| child.kind().index()))
            && content.iter().all(|child| self.allows_marks(child.marks()))
    }

    pub fn check_content(&self, content: &Fragment) -> ModelResult<()> {
        if self.valid_content(content) {
            Ok(())
        } else {
            Err(ModelError::InvalidContent(self.name.clone()))
        }
    }

    /// Create a node without validating its content.
    pub fn create(
        self: &Arc<Self>,
        attrs: Option<&Attrs>,
        content: Fragment,
        marks: Vec<Mark>,
    ) -> ModelResult<Node> {
        let attrs = self.compute_attrs(attrs)?;
        Ok(Node::new(self.clone(), attrs, content, marks))
    }

    /// Create a node, failing when the content does not fit the kind.
    pub fn create_checked(
        self: &Arc<Self>,
        attrs: Option<&Attrs>,
        content: Fragment,
        marks: Vec<Mark>,
    ) -> ModelResult<Node> {
        self.check_content(&content)?;
        self.create(attrs, content, marks)
    }
}

impl fmt::Debug for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeType({})", self.name)
    }
}

impl PartialEq for NodeType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

pub struct MarkType {
    name: String,
    rank: usize,
    spec: MarkSpec,
    excluded: BTreeSet<usize>,
}

impl MarkType {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn spec(&self) -> &MarkSpec {
        &self.spec
    }

    pub fn is_inclusive(&self) -> bool {
        self.spec.inclusive
    }

    pub fn excludes(&self, other: &MarkType) -> bool {
        self.excluded.contains(&other.rank)
    }

    pub fn create(self: &Arc<Self>, attrs: Option<&Attrs>) -> ModelResult<Mark> {
        let attrs = compute_attrs(&self.spec.attrs, attrs).map_err(|attr| {
            ModelError::MissingAttr {
                kind: self.name.clone(),
                attr,
            }
        })?;
        Ok(Mark::new(self.clone(), attrs))
    }

    /// Remove marks of this kind from a set.
    pub fn remove_from_set(&self, set: &[Mark]) -> Vec<Mark> {
        set.iter()
            .filter(|mark| mark.kind().name() != self.name)
            .cloned()
            .collect()
    }

    pub fn is_in_set<'a>(&self, set: &'a [Mark]) -> Option<&'a Mark> {
        set.iter().find(|mark| mark.kind().name() == self.name)
    }
}

impl fmt::Debug for MarkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MarkType({})", self.name)
    }
}

impl PartialEq for MarkType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

pub struct Schema {
    nodes: Vec<Arc<NodeType>>,
    marks: Vec<Arc<MarkType>>,
    node_index: HashMap<String, usize>,
    mark_index: HashMap<String, usize>,
    top: usize,
}

fn split_names(value: &str) -> impl Iterator<Item = &str> {
    value.split_whitespace()
}

impl Schema {
    pub fn new(spec: SchemaSpec) -> Result<Arc<Self>, SchemaError> {
        let mut node_index = HashMap::new();
        for (i, (name, _)) in spec.nodes.iter().enumerate() {
            if node_index.insert(name.clone(), i).is_some() {
                return Err(SchemaError::DuplicateNode(name.clone()));
            }
        }
        let mut mark_index = HashMap::new();
        for (i, (name, _)) in spec.marks.iter().enumerate() {
            if mark_index.insert(name.clone(), i).is_some() {
                return Err(SchemaError::DuplicateMark(name.clone()));
            }
        }
        if !node_index.contains_key("text") {
            return Err(SchemaError::MissingNode("text".to_string()));
        }
        let top = match &spec.top_node {
            Some(name) => *node_index
                .get(name)
                .ok_or_else(|| SchemaError::MissingNode(name.clone()))?,
            None if spec.nodes.is_empty() => {
                return Err(SchemaError::MissingNode("doc".to_string()))
            }
            None => 0,
        };

        let node_groups: Vec<Vec<String>> = spec
            .nodes
            .iter()
            .map(|(_, node)| {
                node.group
                    .as_deref()
                    .map(|g| split_names(g).map(str::to_string).collect())
                    .unwrap_or_default()
            })
            .collect();
        let inline: Vec<bool> = spec
            .nodes
            .iter()
            .map(|(name, node)| node.inline || name == "text")
            .collect();

        let resolve_nodes = |name: &str| -> Option<Vec<usize>> {
            if let Some(index) = node_index.get(name) {
                return Some(vec![*index]);
            }
            let members: Vec<usize> = node_groups
                .iter()
                .enumerate()
                .filter(|(_, groups)| groups.iter().any(|g| g == name))
                .map(|(i, _)| i)
                .collect();
            if members.is_empty() {
                None
            } else {
                Some(members)
            }
        };

        let mark_groups: Vec<Option<&str>> =
            spec.marks.iter().map(|(_, m)| m.group.as_deref()).collect();
        let resolve_marks = |owner: &str, value: &str| -> Result<BTreeSet<usize>, SchemaError> {
            let mut out = BTreeSet::new();
            for name in split_names(value) {
                if name == "_" {
                    out.extend(0..spec.marks.len());
                    continue;
                }
                if let Some(index) = mark_index.get(name) {
                    out.insert(*index);
                    continue;
                }
                let before = out.len();
                for (i, group) in mark_groups.iter().enumerate() {
                    if group.map(|g| split_names(g).any(|g| g == name)).unwrap_or(false) {
                        out.insert(i);
                    }
                }
                if out.len() == before {
                    return Err(SchemaError::UnknownMark {
                        owner: owner.to_string(),
                        name: name.to_string(),
                    });
                }
            }
            Ok(out)
        };

        let mut nodes = Vec::with_capacity(spec.nodes.len());
        for (index, (name, node_spec)) in spec.nodes.iter().enumerate() {
            let content = match &node_spec.content {
                Some(expr) => ContentExpr::parse(expr, resolve_nodes)?,
                None => ContentExpr::empty(),
            };
            let kinds = content.kinds();
            let inline_content = kinds.iter().next().map(|k| inline[*k]).unwrap_or(false);
            if kinds.iter().any(|k| inline[*k] != inline_content) {
                return Err(SchemaError::MixedContent(content.source().to_string()));
            }
            let allowed_marks = match node_spec.marks.as_deref() {
                Some("_") => None,
                Some(value) => Some(resolve_marks(name, value)?),
                None if inline_content => None,
                None => Some(BTreeSet::new()),
            };
            nodes.push(Arc::new(NodeType {
                name: name.clone(),
                index,
                spec: node_spec.clone(),
                groups: node_groups[index].clone(),
                content,
                inline_content,
                allowed_marks,
            }));
        }

        let mut marks = Vec::with_capacity(spec.marks.len());
        for (rank, (name, mark_spec)) in spec.marks.iter().enumerate() {
            let excluded = match mark_spec.excludes.as_deref() {
                None => BTreeSet::from([rank]),
                Some(value) => resolve_marks(name, value)?,
            };
            marks.push(Arc::new(MarkType {
                name: name.clone(),
                rank,
                spec: mark_spec.clone(),
                excluded,
            }));
        }

        Ok(Arc::new(Self {
            nodes,
            marks,
            node_index,
            mark_index,
            top,
        }))
    }

    pub fn node_type(&self, name: &str) -> Option<&Arc<NodeType>> {
        self.node_index.get(name).map(|i| &self.nodes[*i])
    }

    pub fn mark_type(&self, name: &str) -> Option<&Arc<MarkType>> {
        self.mark_index.get(name).map(|i| &self.marks[*i])
    }

    pub fn node_types(&self) -> &[Arc<NodeType>] {
        &self.nodes
    }

    pub fn mark_types(&self) -> &[Arc<MarkType>] {
        &self.marks
    }

    pub fn top_node_type(&self) -> &Arc<NodeType> {
        &self.nodes[self.top]
    }

    pub(crate) fn node_type_or_err(&self, name: &str) -> ModelResult<&Arc<NodeType>> {
        self.node_type(name)
            .ok_or_else(|| ModelError::UnknownNode(name.to_string()))
    }

    /// First textblock kind that can appear in the top node's content.
    pub fn default_textblock(&self) -> Option<&Arc<NodeType>> {
        self.nodes.iter().find(|kind| {
            kind.is_textblock() && self.nodes.iter().any(|n| n.content.kinds().contains(&kind.index))
        })
    }

    pub fn text(&self, text: impl Into<String>, marks: Vec<Mark>) -> ModelResult<Node> {
        let text = text.into();
        if text.is_empty() {
            return Err(ModelError::EmptyText);
        }
        let kind = self.node_type_or_err("text")?;
        Ok(Node::new_text(kind.clone(), text, marks))
    }

    pub fn mark(&self, name: &str, attrs: Option<&Attrs>) -> ModelResult<Mark> {
        self.mark_type(name)
            .ok_or_else(|| ModelError::UnknownMark(name.to_string()))?
            .create(attrs)
    }

    /// Create a node of kind `name` with validated content.
    pub fn node(&self, name: &str, attrs: Option<&Attrs>, content: Vec<Node>) -> ModelResult<Node> {
        self.node_type_or_err(name)?
            .create_checked(attrs, Fragment::from_vec(content), Vec::new())
    }

    /// Create a node, inserting default children where its content
    /// expression requires them. Returns `None` when no filling works.
    pub fn create_and_fill(
        &self,
        name: &str,
        attrs: Option<&Attrs>,
        content: Fragment,
    ) -> ModelResult<Option<Node>> {
        let kind = self.node_type_or_err(name)?;
        let kinds: Vec<usize> = content.iter().map(|child| child.kind().index()).collect();
        let start = kind.content_match();
        let before = match start.fill_before(&kinds, false, |k| self.generatable(k)) {
            Some(before) => before,
            None => return Ok(None),
        };
        let mut children = Vec::new();
        for filler in before {
            match self.create_and_fill(self.nodes[filler].name(), None, Fragment::empty())? {
                Some(node) => children.push(node),
                None => return Ok(None),
            }
        }
        children.extend(content.iter().cloned());

        let matched = start.match_kinds(children.iter().map(|c| c.kind().index()));
        let after = match matched.and_then(|m| m.fill_before(&[], true, |k| self.generatable(k))) {
            Some(after) => after,
            None => return Ok(None),
        };
        for filler in after {
            match self.create_and_fill(self.nodes[filler].name(), None, Fragment::empty())? {
                Some(node) => children.push(node),
                None => return Ok(None),
            }
        }
        Ok(Some(kind.create(attrs, Fragment::from_vec(children), Vec::new())?))
    }

    fn generatable(&self, kind: usize) -> bool {
        let kind = &self.nodes[kind];
        !kind.is_text() && !kind.has_required_attrs()
    }

    /// An empty document: the top node filled with its default content.
    pub fn empty_document(&self) -> ModelResult<Node> {
        let name = self.top_node_type().name().to_string();
        self.create_and_fill(&name, None, Fragment::empty())?
            .ok_or(ModelError::InvalidContent(name))
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("nodes", &self.nodes.iter().map(|n| n.name()).collect::<Vec<_>>())
            .field("marks", &self.marks.iter().map(|m| m.name()).collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec() -> SchemaSpec {
        SchemaSpec::default()
            .node("doc", NodeSpec::new().content("block+"))
            .node("paragraph", NodeSpec::new().content("inline*").group("block"))
            .node(
                "heading",
                NodeSpec::new()
                    .content("text*")
                    .marks("")
                    .group("block")
                    .attr("level", AttrSpec::with_default(1)),
            )
            .node("text", NodeSpec::new().group("inline"))
            .mark("strong", MarkSpec::new())
            .mark("code", MarkSpec::new().excludes("_"))
    }

    #[test]
    fn test_builds_node_flags() {
        let schema = Schema::new(spec()).unwrap();
        let paragraph = schema.node_type("paragraph").unwrap();
        assert!(paragraph.is_textblock());
        assert!(paragraph.in_group("block"));
        assert!(!paragraph.is_leaf());

        let text = schema.node_type("text").unwrap();
        assert!(text.is_inline());
        assert!(text.is_leaf());

        assert_eq!(schema.top_node_type().name(), "doc");
        assert_eq!(schema.default_textblock().unwrap().name(), "paragraph");
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let spec = spec().node("paragraph", NodeSpec::new());
        assert_eq!(
            Schema::new(spec).unwrap_err(),
            SchemaError::DuplicateNode("paragraph".to_string())
        );
    }

    #[test]
    fn test_duplicate_mark_rejected() {
        let spec = spec().mark("strong", MarkSpec::new());
        assert_eq!(
            Schema::new(spec).unwrap_err(),
            SchemaError::DuplicateMark("strong".to_string())
        );
    }

    #[test]
    fn test_unknown_content_name_rejected() {
        let spec = spec().node("quote", NodeSpec::new().content("blocks+"));
        assert!(matches!(
            Schema::new(spec),
            Err(SchemaError::UnknownContentName { .. })
        ));
    }

    #[test]
    fn test_mark_rules() {
        let schema = Schema::new(spec()).unwrap();
        let strong = schema.mark_type("strong").unwrap();
        let code = schema.mark_type("code").unwrap();
        assert!(strong.excludes(strong));
        assert!(!strong.excludes(code));
        assert!(code.excludes(strong));

        let heading = schema.node_type("heading").unwrap();
        let paragraph = schema.node_type("paragraph").unwrap();
        assert!(!heading.allows_mark_type(strong));
        assert!(paragraph.allows_mark_type(strong));
    }

    #[test]
    fn test_attr_defaults() {
        let schema = Schema::new(spec()).unwrap();
        let heading = schema.node("heading", None, vec![]).unwrap();
        assert_eq!(heading.attr("level"), Some(&json!(1)));
    }

    #[test]
    fn test_empty_document_is_filled() {
        let schema = Schema::new(spec()).unwrap();
        let doc = schema.empty_document().unwrap();
        assert_eq!(doc.child_count(), 1);
        assert_eq!(doc.child(0).unwrap().type_name(), "paragraph");
        assert_eq!(doc.node_size(), 4);
    }

    #[test]
    fn test_text_must_not_be_empty() {
        let schema = Schema::new(spec()).unwrap();
        assert_eq!(schema.text("", vec![]).unwrap_err(), ModelError::EmptyText);
    }
}
