//! # Extensions
//!
//! An editor is assembled from extensions. Each one implements any subset
//! of the capabilities below; every capability except the name (and the
//! schema contribution of node and mark extensions) has an empty default.
//!
//! ```text
//! NodeExtension ─┐                       ┌─► input rules   (nodes, marks)
//! MarkExtension ─┼─► build_schema() ─► aggregate() ─► keymap  (nodes, marks, extensions)
//! Extension ─────┘                       ├─► menus         (marks, nodes)
//!                                        ├─► plugins       (nodes, extensions)
//!                                        └─► node views, default value, handlers
//! ```
//!
//! Within each group, registration order decides precedence.

use crate::config::EditorConfig;
use crate::errors::ConfigError;
use crate::input_rules::InputRule;
use crate::keymap::{KeyBinding, Keymap};
use crate::menu::MenuItem;
use crate::plugin::Plugin;
use crate::state::EditorState;
use crate::transaction::Transaction;
use crate::view::NodeViewFactory;
use paper_model::{MarkSpec, MarkType, NodeJson, NodeSpec, NodeType, Schema, SchemaError, SchemaSpec};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Called with the settled state and the transactions that produced it.
pub type TransactionHandler = Arc<dyn Fn(&EditorState, &[Transaction]) + Send + Sync>;

pub struct NodeContext<'a> {
    pub schema: &'a Arc<Schema>,
    pub kind: &'a Arc<NodeType>,
    pub config: &'a EditorConfig,
}

pub struct MarkContext<'a> {
    pub schema: &'a Arc<Schema>,
    pub kind: &'a Arc<MarkType>,
    pub config: &'a EditorConfig,
}

pub struct ExtensionContext<'a> {
    pub schema: &'a Arc<Schema>,
    pub config: &'a EditorConfig,
}

/// Contributes one node kind, and possibly the kinds it needs.
pub trait NodeExtension: Send + Sync {
    /// Kind name; unique across the schema.
    fn name(&self) -> &str;

    fn spec(&self) -> NodeSpec;

    /// Kinds this one requires (a list needs its item kind).
    fn child_nodes(&self) -> Vec<Arc<dyn NodeExtension>> {
        Vec::new()
    }

    fn input_rules(&self, _cx: &NodeContext) -> Result<Vec<InputRule>, ConfigError> {
        Ok(Vec::new())
    }

    fn key_bindings(&self, _cx: &NodeContext) -> Vec<KeyBinding> {
        Vec::new()
    }

    fn menus(&self, _cx: &NodeContext) -> Vec<MenuItem> {
        Vec::new()
    }

    fn plugins(&self, _cx: &NodeContext) -> Vec<Arc<dyn Plugin>> {
        Vec::new()
    }

    fn node_view(&self, _cx: &NodeContext) -> Option<Arc<dyn NodeViewFactory>> {
        None
    }
}

pub trait MarkExtension: Send + Sync {
    fn name(&self) -> &str;

    fn spec(&self) -> MarkSpec;

    fn input_rules(&self, _cx: &MarkContext) -> Result<Vec<InputRule>, ConfigError> {
        Ok(Vec::new())
    }

    fn key_bindings(&self, _cx: &MarkContext) -> Vec<KeyBinding> {
        Vec::new()
    }

    fn menus(&self, _cx: &MarkContext) -> Vec<MenuItem> {
        Vec::new()
    }
}

/// Behaviour that contributes no kind.
pub trait Extension: Send + Sync {
    fn name(&self) -> &str;

    fn plugins(&self, _cx: &ExtensionContext) -> Vec<Arc<dyn Plugin>> {
        Vec::new()
    }

    fn key_bindings(&self, _cx: &ExtensionContext) -> Vec<KeyBinding> {
        Vec::new()
    }

    /// Initial document, when the editor is created without one.
    fn default_value(&self, _cx: &ExtensionContext) -> Option<NodeJson> {
        None
    }

    fn on_transaction(&self, _cx: &ExtensionContext) -> Option<TransactionHandler> {
        None
    }
}

/// Everything the extensions contribute besides the schema.
#[derive(Default)]
pub struct Aggregate {
    pub input_rules: Vec<InputRule>,
    pub keymap: Keymap,
    pub menus: Vec<MenuItem>,
    pub plugins: Vec<Arc<dyn Plugin>>,
    pub node_views: Vec<Arc<dyn NodeViewFactory>>,
    pub default_value: Option<NodeJson>,
    pub transaction_handlers: Vec<TransactionHandler>,
}

impl fmt::Debug for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aggregate")
            .field("input_rules", &self.input_rules.len())
            .field("keymap", &self.keymap)
            .field("menus", &self.menus)
            .field("plugins", &self.plugins.iter().map(|p| p.key().to_string()).collect::<Vec<_>>())
            .field("node_views", &self.node_views.iter().map(|v| v.kind().to_string()).collect::<Vec<_>>())
            .field("default_value", &self.default_value.is_some())
            .field("transaction_handlers", &self.transaction_handlers.len())
            .finish()
    }
}

/// The registered extensions, in registration order.
#[derive(Clone, Default)]
pub struct ExtensionSet {
    nodes: Vec<Arc<dyn NodeExtension>>,
    marks: Vec<Arc<dyn MarkExtension>>,
    extensions: Vec<Arc<dyn Extension>>,
}

impl fmt::Debug for ExtensionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionSet")
            .field("nodes", &self.nodes.iter().map(|e| e.name()).collect::<Vec<_>>())
            .field("marks", &self.marks.iter().map(|e| e.name()).collect::<Vec<_>>())
            .field("extensions", &self.extensions.iter().map(|e| e.name()).collect::<Vec<_>>())
            .finish()
    }
}

impl ExtensionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(mut self, extension: impl NodeExtension + 'static) -> Self {
        self.nodes.push(Arc::new(extension));
        self
    }

    pub fn mark(mut self, extension: impl MarkExtension + 'static) -> Self {
        self.marks.push(Arc::new(extension));
        self
    }

    pub fn extension(mut self, extension: impl Extension + 'static) -> Self {
        self.extensions.push(Arc::new(extension));
        self
    }

    /// Node extensions with their child nodes flattened in, depth first,
    /// each paired with the registered extension that brought it in. A
    /// child kind required by several extensions is included once when
    /// they all declare the same spec; a differing spec is kept so that
    /// the schema build reports the clash.
    fn flat_nodes(&self) -> Vec<(Arc<dyn NodeExtension>, String)> {
        fn walk(
            ext: &Arc<dyn NodeExtension>,
            owner: &str,
            is_child: bool,
            children: &mut HashMap<String, NodeSpec>,
            out: &mut Vec<(Arc<dyn NodeExtension>, String)>,
        ) {
            if is_child {
                let spec = ext.spec();
                match children.get(ext.name()) {
                    Some(seen) if *seen == spec => return,
                    Some(_) => {}
                    None => {
                        children.insert(ext.name().to_string(), spec);
                    }
                }
            }
            out.push((ext.clone(), owner.to_string()));
            for child in ext.child_nodes() {
                walk(&child, owner, true, children, out);
            }
        }
        let mut children = HashMap::new();
        let mut out = Vec::new();
        for ext in &self.nodes {
            walk(ext, ext.name(), false, &mut children, &mut out);
        }
        out
    }

    /// Merge the schema contributions. The first node becomes the top node.
    pub fn build_schema(&self) -> Result<Arc<Schema>, ConfigError> {
        let mut owners: HashMap<String, String> = HashMap::new();
        let mut claim = |kind: &str, owner: &str| -> Result<(), ConfigError> {
            if owners.insert(kind.to_string(), owner.to_string()).is_some() {
                return Err(ConfigError::DuplicateKind {
                    kind: kind.to_string(),
                    extension: owner.to_string(),
                });
            }
            Ok(())
        };

        let mut spec = SchemaSpec::default();
        for (ext, owner) in self.flat_nodes() {
            claim(ext.name(), &owner)?;
            spec = spec.node(ext.name(), ext.spec());
        }
        for ext in &self.marks {
            claim(ext.name(), ext.name())?;
            spec = spec.mark(ext.name(), ext.spec());
        }
        let schema = Schema::new(spec)?;
        info!(
            nodes = schema.node_types().len(),
            marks = schema.mark_types().len(),
            top = schema.top_node_type().name(),
            "built schema"
        );
        Ok(schema)
    }

    /// Collect every contribution against `schema`.
    pub fn aggregate(&self, schema: &Arc<Schema>, config: &EditorConfig) -> Result<Aggregate, ConfigError> {
        let mut agg = Aggregate::default();
        let mut node_menus = Vec::new();
        let mut node_bindings = Vec::new();
        let nodes = self.flat_nodes();

        for (ext, _) in &nodes {
            let kind = schema
                .node_type(ext.name())
                .ok_or_else(|| SchemaError::MissingNode(ext.name().to_string()))?;
            let cx = NodeContext { schema, kind, config };
            agg.input_rules.extend(ext.input_rules(&cx)?);
            node_bindings.extend(ext.key_bindings(&cx));
            node_menus.extend(ext.menus(&cx));
            agg.plugins.extend(ext.plugins(&cx));
            agg.node_views.extend(ext.node_view(&cx));
        }

        let mut mark_bindings = Vec::new();
        for ext in &self.marks {
            let kind = schema
                .mark_type(ext.name())
                .ok_or_else(|| SchemaError::UnknownMark {
                    owner: ext.name().to_string(),
                    name: ext.name().to_string(),
                })?;
            let cx = MarkContext { schema, kind, config };
            agg.input_rules.extend(ext.input_rules(&cx)?);
            mark_bindings.extend(ext.key_bindings(&cx));
            agg.menus.extend(ext.menus(&cx));
        }
        agg.menus.extend(node_menus);

        let cx = ExtensionContext { schema, config };
        let mut extension_bindings = Vec::new();
        for ext in &self.extensions {
            agg.plugins.extend(ext.plugins(&cx));
            extension_bindings.extend(ext.key_bindings(&cx));
            if agg.default_value.is_none() {
                agg.default_value = ext.default_value(&cx);
            }
            agg.transaction_handlers.extend(ext.on_transaction(&cx));
        }

        agg.keymap.extend(node_bindings, config.platform)?;
        agg.keymap.extend(mark_bindings, config.platform)?;
        agg.keymap.extend(extension_bindings, config.platform)?;

        info!(
            input_rules = agg.input_rules.len(),
            bindings = agg.keymap.len(),
            menus = agg.menus.len(),
            plugins = agg.plugins.len(),
            node_views = agg.node_views.len(),
            "aggregated extensions"
        );
        Ok(agg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{command, select_all};
    use crate::input_rules::mark_input_rule;

    struct TestNode {
        name: &'static str,
        content: &'static str,
        children: Vec<Arc<dyn NodeExtension>>,
    }

    fn node(name: &'static str, content: &'static str) -> TestNode {
        TestNode {
            name,
            content,
            children: Vec::new(),
        }
    }

    impl NodeExtension for TestNode {
        fn name(&self) -> &str {
            self.name
        }

        fn spec(&self) -> NodeSpec {
            let spec = NodeSpec::new().content(self.content);
            if self.name == "doc" || self.name == "text" {
                spec
            } else {
                spec.group("block")
            }
        }

        fn child_nodes(&self) -> Vec<Arc<dyn NodeExtension>> {
            self.children.clone()
        }

        fn key_bindings(&self, _cx: &NodeContext) -> Vec<KeyBinding> {
            vec![KeyBinding::new("Mod-a", command(|_| None))]
        }

        fn menus(&self, cx: &NodeContext) -> Vec<MenuItem> {
            if cx.kind.is_textblock() {
                vec![MenuItem::new(
                    self.name,
                    Arc::new(|_: &EditorState| false),
                    command(|_| None),
                )]
            } else {
                Vec::new()
            }
        }
    }

    struct Bold;

    impl MarkExtension for Bold {
        fn name(&self) -> &str {
            "bold"
        }

        fn spec(&self) -> MarkSpec {
            MarkSpec::new()
        }

        fn input_rules(&self, cx: &MarkContext) -> Result<Vec<InputRule>, ConfigError> {
            Ok(vec![mark_input_rule(r"\*\*([^*]+)\*\*$", cx.kind.clone(), None)?])
        }

        fn menus(&self, cx: &MarkContext) -> Vec<MenuItem> {
            vec![MenuItem::for_mark("bold", cx.kind.clone(), command(|_| None))]
        }
    }

    struct Behaviour(&'static str, bool);

    impl Extension for Behaviour {
        fn name(&self) -> &str {
            self.0
        }

        fn key_bindings(&self, _cx: &ExtensionContext) -> Vec<KeyBinding> {
            vec![KeyBinding::new("Mod-a", select_all())]
        }

        fn default_value(&self, _cx: &ExtensionContext) -> Option<NodeJson> {
            self.1.then(|| NodeJson::new(self.0))
        }
    }

    fn base() -> ExtensionSet {
        ExtensionSet::new()
            .node(node("doc", "block+"))
            .node(node("text", ""))
            .node(node("paragraph", "text*"))
    }

    #[test]
    fn test_child_nodes_are_flattened() {
        let list = TestNode {
            name: "list",
            content: "item+",
            children: vec![Arc::new(node("item", "paragraph"))],
        };
        let schema = base().node(list).mark(Bold).build_schema().unwrap();
        assert!(schema.node_type("item").is_some());
        assert_eq!(schema.top_node_type().name(), "doc");
        assert!(schema.mark_type("bold").is_some());
    }

    #[test]
    fn test_shared_child_is_included_once() {
        let item = || -> Vec<Arc<dyn NodeExtension>> { vec![Arc::new(node("item", "paragraph"))] };
        let set = base()
            .node(TestNode {
                name: "bullets",
                content: "item+",
                children: item(),
            })
            .node(TestNode {
                name: "numbers",
                content: "item+",
                children: item(),
            });
        let schema = set.build_schema().unwrap();
        assert_eq!(schema.node_types().iter().filter(|k| k.name() == "item").count(), 1);
        let agg = set.aggregate(&schema, &EditorConfig::default()).unwrap();
        // doc, text, paragraph, bullets, item, numbers
        assert_eq!(agg.keymap.len(), 6);
    }

    #[test]
    fn test_conflicting_child_specs_are_rejected() {
        let set = base()
            .node(TestNode {
                name: "bullets",
                content: "item+",
                children: vec![Arc::new(node("item", "paragraph"))],
            })
            .node(TestNode {
                name: "numbers",
                content: "item+",
                children: vec![Arc::new(node("item", "paragraph+"))],
            });
        assert!(matches!(
            set.build_schema(),
            Err(ConfigError::DuplicateKind { kind, extension }) if kind == "item" && extension == "numbers"
        ));
    }

    #[test]
    fn test_duplicate_kind_is_rejected() {
        let list = TestNode {
            name: "list",
            content: "paragraph+",
            children: vec![Arc::new(node("paragraph", "text*"))],
        };
        assert_eq!(
            base().node(list).build_schema().unwrap_err(),
            ConfigError::DuplicateKind {
                kind: "paragraph".into(),
                extension: "list".into()
            }
        );
    }

    #[test]
    fn test_aggregate_order() {
        let set = base()
            .mark(Bold)
            .extension(Behaviour("first", false))
            .extension(Behaviour("second", true))
            .extension(Behaviour("third", true));
        let schema = set.build_schema().unwrap();
        let agg = set.aggregate(&schema, &EditorConfig::default()).unwrap();

        assert_eq!(agg.input_rules.len(), 1);
        let menus: Vec<_> = agg.menus.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(menus, vec!["bold", "paragraph"]);
        assert_eq!(agg.default_value.map(|v| v.kind), Some("second".to_string()));
        // Three nodes and three behaviours bind Mod-a.
        assert_eq!(agg.keymap.len(), 6);

        // Node bindings come first but decline; the first behaviour handles it.
        let state = EditorState::create(crate::state::StateConfig::new(schema)).unwrap();
        let tr = agg
            .keymap
            .handle(&crate::keymap::KeyEvent::new("a").ctrl(), &state)
            .unwrap();
        assert!(matches!(tr.selection(), crate::selection::Selection::All { .. }));
    }
}
