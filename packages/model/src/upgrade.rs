use crate::json::NodeJson;

/// Node kinds renamed since the first stored documents.
const RENAMED_KINDS: &[(&str, &str)] = &[("ordered_item", "list_item"), ("bullet_item", "list_item")];

/// Bring a stored document up to the current kind names.
///
/// This is the only migration step: documents written before list items were
/// unified used separate item kinds per list type.
pub fn upgrade_document(node: NodeJson) -> NodeJson {
    let kind = RENAMED_KINDS
        .iter()
        .find(|(old, _)| *old == node.kind)
        .map(|(_, new)| new.to_string())
        .unwrap_or(node.kind);
    NodeJson {
        kind,
        content: node
            .content
            .map(|children| children.into_iter().map(upgrade_document).collect()),
        ..node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_renames_legacy_items() {
        let doc: NodeJson = serde_json::from_value(json!({
            "type": "doc",
            "content": [
                {"type": "bullet_list", "content": [
                    {"type": "bullet_item", "content": [{"type": "paragraph"}]}
                ]},
                {"type": "ordered_list", "content": [
                    {"type": "ordered_item", "content": [{"type": "paragraph"}]}
                ]}
            ]
        }))
        .unwrap();

        let upgraded = serde_json::to_value(upgrade_document(doc)).unwrap();
        assert_eq!(upgraded["content"][0]["content"][0]["type"], "list_item");
        assert_eq!(upgraded["content"][1]["content"][0]["type"], "list_item");
        assert_eq!(upgraded["content"][1]["type"], "ordered_list");
    }

    #[test]
    fn test_current_documents_unchanged() {
        let doc: NodeJson = serde_json::from_value(json!({
            "type": "doc",
            "content": [{"type": "paragraph", "content": [{"type": "text", "text": "x"}]}]
        }))
        .unwrap();
        assert_eq!(upgrade_document(doc.clone()), doc);
    }
}
