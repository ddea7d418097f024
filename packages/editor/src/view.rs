//! Node views.
//!
//! Some node kinds are rendered by custom views (a code block hosts an
//! embedded text surface). The host keeps one view per keyed node and,
//! after every dispatch, creates views for new nodes, updates the
//! surviving ones and destroys the views of nodes that are gone.

use paper_model::Node;
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

pub trait NodeView: Send + Sync {
    /// The node changed (or moved to `pos`). Return false to have the view
    /// destroyed and created again.
    fn update(&mut self, _node: &Node, _pos: usize) -> bool {
        true
    }

    fn destroy(&mut self) {}

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

pub trait NodeViewFactory: Send + Sync {
    /// Name of the node kind the views are for.
    fn kind(&self) -> &str;

    /// Stable key of the view for `node`; `None` when the node cannot
    /// have a view yet.
    fn view_key(&self, node: &Node) -> Option<String>;

    fn create(&self, node: &Node, pos: usize) -> Box<dyn NodeView>;
}

#[derive(Default)]
pub struct NodeViewHost {
    views: HashMap<String, Box<dyn NodeView>>,
}

impl fmt::Debug for NodeViewHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.views.keys().collect();
        keys.sort();
        f.debug_struct("NodeViewHost").field("views", &keys).finish()
    }
}

impl NodeViewHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.views.contains_key(key)
    }

    pub fn get<V: NodeView + 'static>(&self, key: &str) -> Option<&V> {
        self.views.get(key).and_then(|view| view.as_any().downcast_ref())
    }

    pub fn get_mut<V: NodeView + 'static>(&mut self, key: &str) -> Option<&mut V> {
        self.views
            .get_mut(key)
            .and_then(|view| view.as_any_mut().downcast_mut())
    }

    /// Bring the views in line with `doc`.
    pub fn sync(&mut self, doc: &Node, factories: &[Arc<dyn NodeViewFactory>]) {
        if factories.is_empty() && self.views.is_empty() {
            return;
        }
        let mut seen = HashSet::new();
        let mut found: Vec<(String, Node, usize, Arc<dyn NodeViewFactory>)> = Vec::new();
        doc.descendants(|node: &Node, pos: usize, _: Option<&Node>, _: usize| {
            if let Some(factory) = factories.iter().find(|f| f.kind() == node.type_name()) {
                if let Some(key) = factory.view_key(node) {
                    if seen.insert(key.clone()) {
                        found.push((key, node.clone(), pos, factory.clone()));
                    }
                }
            }
            !node.is_textblock()
        });

        let stale: Vec<String> = self
            .views
            .keys()
            .filter(|key| !seen.contains(*key))
            .cloned()
            .collect();
        for key in stale {
            if let Some(mut view) = self.views.remove(&key) {
                debug!(key = %key, "destroying node view");
                view.destroy();
            }
        }

        for (key, node, pos, factory) in found {
            let keep = match self.views.get_mut(&key) {
                Some(view) => view.update(&node, pos),
                None => false,
            };
            if !keep {
                if let Some(mut old) = self.views.remove(&key) {
                    old.destroy();
                }
                debug!(key = %key, pos, "creating node view");
                self.views.insert(key, factory.create(&node, pos));
            }
        }
    }

    /// Destroy every view.
    pub fn clear(&mut self) {
        for (_, mut view) in self.views.drain() {
            view.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paper_model::{AttrSpec, NodeSpec, Schema, SchemaSpec};
    use serde_json::{json, Value};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Log(Mutex<Vec<String>>);

    struct Figure {
        key: String,
        log: Arc<Log>,
    }

    impl NodeView for Figure {
        fn update(&mut self, node: &Node, _pos: usize) -> bool {
            self.log.0.lock().unwrap().push(format!("update {}", self.key));
            node.attr_str("id") == Some(self.key.as_str())
        }

        fn destroy(&mut self) {
            self.log.0.lock().unwrap().push(format!("destroy {}", self.key));
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    struct Figures(Arc<Log>);

    impl NodeViewFactory for Figures {
        fn kind(&self) -> &str {
            "figure"
        }

        fn view_key(&self, node: &Node) -> Option<String> {
            node.attr_str("id").map(str::to_string)
        }

        fn create(&self, node: &Node, _pos: usize) -> Box<dyn NodeView> {
            let key = node.attr_str("id").unwrap_or_default().to_string();
            self.0.lock_push(format!("create {key}"));
            Box::new(Figure { key, log: self.0.clone() })
        }
    }

    impl Log {
        fn lock_push(&self, entry: String) {
            self.0.lock().unwrap().push(entry);
        }

        fn take(&self) -> Vec<String> {
            std::mem::take(&mut *self.0.lock().unwrap())
        }
    }

    #[test]
    fn test_views_follow_document() {
        let schema = Schema::new(
            SchemaSpec::default()
                .node("doc", NodeSpec::new().content("figure*"))
                .node("figure", NodeSpec::new().attr("id", AttrSpec::with_default(Value::Null)))
                .node("text", NodeSpec::new()),
        )
        .unwrap();
        let figure = |id: Value| {
            let attrs = serde_json::from_value(json!({ "id": id })).unwrap();
            schema.node("figure", Some(&attrs), vec![]).unwrap()
        };
        let log = Arc::new(Log::default());
        let factories: Vec<Arc<dyn NodeViewFactory>> = vec![Arc::new(Figures(log.clone()))];
        let mut host = NodeViewHost::new();

        let doc = schema
            .node("doc", None, vec![figure(json!("a")), figure(Value::Null), figure(json!("b"))])
            .unwrap();
        host.sync(&doc, &factories);
        assert_eq!(log.take(), vec!["create a", "create b"]);
        assert!(host.get::<Figure>("a").is_some());

        let doc = schema.node("doc", None, vec![figure(json!("b"))]).unwrap();
        host.sync(&doc, &factories);
        assert_eq!(log.take(), vec!["destroy a", "update b"]);
        assert_eq!(host.len(), 1);

        host.clear();
        assert_eq!(log.take(), vec!["destroy b"]);
    }
}
