//! JSON document form.
//!
//! ```json
//! {"type": "doc", "content": [
//!   {"type": "paragraph", "content": [
//!     {"type": "text", "text": "hi", "marks": [{"type": "bold"}]}
//!   ]}
//! ]}
//! ```

use crate::attrs::Attrs;
use crate::error::{ModelError, ModelResult};
use crate::fragment::Fragment;
use crate::mark::Mark;
use crate::node::Node;
use crate::schema::Schema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeJson {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Attrs>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<NodeJson>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marks: Option<Vec<MarkJson>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkJson {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Attrs>,
}

impl NodeJson {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attrs: None,
            content: None,
            text: None,
            marks: None,
        }
    }
}

impl Mark {
    pub fn to_json(&self) -> MarkJson {
        MarkJson {
            kind: self.type_name().to_string(),
            attrs: if self.attrs().is_empty() {
                None
            } else {
                Some(self.attrs().clone())
            },
        }
    }
}

impl Node {
    pub fn to_json(&self) -> NodeJson {
        NodeJson {
            kind: self.type_name().to_string(),
            attrs: if self.attrs().is_empty() {
                None
            } else {
                Some(self.attrs().clone())
            },
            content: if self.child_count() == 0 {
                None
            } else {
                Some(self.content().iter().map(Node::to_json).collect())
            },
            text: self.text().map(str::to_string),
            marks: if self.marks().is_empty() {
                None
            } else {
                Some(self.marks().iter().map(Mark::to_json).collect())
            },
        }
    }

    /// Build a node tree from JSON and validate it against the schema.
    pub fn from_json(schema: &Schema, json: &NodeJson) -> ModelResult<Node> {
        let node = build(schema, json)?;
        node.check()?;
        Ok(node)
    }

    pub fn to_json_string(&self) -> ModelResult<String> {
        Ok(serde_json::to_string(&self.to_json())?)
    }

    pub fn from_json_str(schema: &Schema, source: &str) -> ModelResult<Node> {
        let json: NodeJson = serde_json::from_str(source)?;
        Node::from_json(schema, &json)
    }
}

fn build(schema: &Schema, json: &NodeJson) -> ModelResult<Node> {
    let mut marks = Vec::new();
    for mark in json.marks.iter().flatten() {
        let mark = schema.mark(&mark.kind, mark.attrs.as_ref())?;
        marks = mark.add_to_set(&marks);
    }
    if json.kind == "text" {
        let text = json
            .text
            .clone()
            .ok_or_else(|| ModelError::Json("text node without text".to_string()))?;
        return schema.text(text, marks);
    }
    let kind = schema
        .node_type(&json.kind)
        .ok_or_else(|| ModelError::UnknownNode(json.kind.clone()))?;
    let children = json
        .content
        .iter()
        .flatten()
        .map(|child| build(schema, child))
        .collect::<ModelResult<Vec<_>>>()?;
    kind.create(json.attrs.as_ref(), Fragment::from_vec(children), marks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs::AttrSpec;
    use crate::schema::{MarkSpec, NodeSpec, SchemaSpec};
    use serde_json::json;
    use std::sync::Arc;

    fn schema() -> Arc<Schema> {
        Schema::new(
            SchemaSpec::default()
                .node("doc", NodeSpec::new().content("block+"))
                .node("paragraph", NodeSpec::new().content("inline*").group("block"))
                .node(
                    "heading",
                    NodeSpec::new()
                        .content("text*")
                        .group("block")
                        .attr("level", AttrSpec::with_default(1)),
                )
                .node("text", NodeSpec::new().group("inline"))
                .mark("bold", MarkSpec::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_round_trip() {
        let schema = schema();
        let source = json!({
            "type": "doc",
            "content": [
                {"type": "heading", "attrs": {"level": 2}, "content": [{"type": "text", "text": "Title"}]},
                {"type": "paragraph", "content": [
                    {"type": "text", "text": "plain "},
                    {"type": "text", "text": "bold", "marks": [{"type": "bold"}]}
                ]},
                {"type": "paragraph"}
            ]
        });
        let json: NodeJson = serde_json::from_value(source.clone()).unwrap();
        let doc = Node::from_json(&schema, &json).unwrap();
        assert_eq!(serde_json::to_value(doc.to_json()).unwrap(), source);

        let again = Node::from_json_str(&schema, &doc.to_json_string().unwrap()).unwrap();
        assert_eq!(again, doc);
    }

    #[test]
    fn test_invalid_documents_rejected() {
        let schema = schema();
        let unknown = json!({"type": "doc", "content": [{"type": "table"}]});
        let json: NodeJson = serde_json::from_value(unknown).unwrap();
        assert_eq!(
            Node::from_json(&schema, &json).unwrap_err(),
            ModelError::UnknownNode("table".to_string())
        );

        let text_in_doc = json!({"type": "doc", "content": [{"type": "text", "text": "x"}]});
        let json: NodeJson = serde_json::from_value(text_in_doc).unwrap();
        assert!(matches!(
            Node::from_json(&schema, &json),
            Err(ModelError::InvalidContent(_))
        ));

        let marked_heading = json!({"type": "doc", "content": [
            {"type": "heading", "content": [{"type": "text", "text": "x", "marks": [{"type": "bold"}]}]}
        ]});
        let json: NodeJson = serde_json::from_value(marked_heading).unwrap();
        assert!(Node::from_json(&schema, &json).is_ok());
    }

    #[test]
    fn test_malformed_json() {
        let schema = schema();
        assert!(matches!(
            Node::from_json_str(&schema, "{not json"),
            Err(ModelError::Json(_))
        ));
    }
}
