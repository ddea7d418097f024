//! # Input Rules
//!
//! Auto-formatting triggered by typing. After each text input the text
//! before the caret (plus the typed text) is matched against every rule's
//! pattern; the first rule whose handler returns a transaction replaces
//! the plain insertion.
//!
//! Patterns must be anchored at the end (`$`). Rules never fire inside
//! code nodes.

use crate::errors::ConfigError;
use crate::state::EditorState;
use crate::structure::find_wrapping;
use crate::transaction::Transaction;
use paper_model::{Attrs, MarkType, Node, NodeType};
use regex::Regex;
use std::fmt;
use std::sync::Arc;

/// Placeholder for leaf nodes in the matched text.
const LEAF_CHAR: &str = "\u{fffc}";

/// Capture groups of a successful match; `groups[0]` is the whole match.
#[derive(Debug, Clone, PartialEq)]
pub struct InputMatch {
    pub groups: Vec<Option<String>>,
}

impl InputMatch {
    pub fn group(&self, index: usize) -> Option<&str> {
        self.groups.get(index).and_then(|group| group.as_deref())
    }

    pub fn full(&self) -> &str {
        self.group(0).unwrap_or("")
    }
}

/// Builds the transaction for a match covering `start..end`.
pub type RuleHandler = Arc<dyn Fn(&EditorState, &InputMatch, usize, usize) -> Option<Transaction> + Send + Sync>;

/// Computes node or mark attributes from a match.
pub type AttrsFromMatch = Arc<dyn Fn(&InputMatch) -> Option<Attrs> + Send + Sync>;

#[derive(Clone)]
pub struct InputRule {
    pattern: Regex,
    handler: RuleHandler,
}

impl fmt::Debug for InputRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputRule")
            .field("pattern", &self.pattern.as_str())
            .finish()
    }
}

impl InputRule {
    pub fn new(pattern: &str, handler: RuleHandler) -> Result<Self, ConfigError> {
        let pattern = Regex::new(pattern).map_err(|err| ConfigError::InputRule {
            pattern: pattern.to_string(),
            message: err.to_string(),
        })?;
        Ok(Self { pattern, handler })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    fn exec(&self, text: &str) -> Option<InputMatch> {
        let captures = self.pattern.captures(text)?;
        Some(InputMatch {
            groups: captures
                .iter()
                .map(|group| group.map(|m| m.as_str().to_string()))
                .collect(),
        })
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Char offset of the first occurrence of `needle` in `haystack`.
fn char_index_of(haystack: &str, needle: &str) -> Option<usize> {
    haystack.find(needle).map(|byte| char_len(&haystack[..byte]))
}

fn char_last_index_of(haystack: &str, needle: &str) -> Option<usize> {
    haystack.rfind(needle).map(|byte| char_len(&haystack[..byte]))
}

/// Run `rules` for `text` typed over `from..to`. Returns the transaction of
/// the first rule that handles it.
pub fn run_input_rules(
    state: &EditorState,
    from: usize,
    to: usize,
    text: &str,
    rules: &[InputRule],
    lookbehind: usize,
) -> Option<Transaction> {
    let resolved = state.doc().resolve(from).ok()?;
    if resolved.parent().kind().is_code() {
        return None;
    }
    let offset = resolved.parent_offset();
    let text_before = resolved
        .parent()
        .text_between(offset.saturating_sub(lookbehind), offset, LEAF_CHAR)
        + text;
    let typed = char_len(text);
    rules.iter().find_map(|rule| {
        let found = rule.exec(&text_before)?;
        let matched = char_len(found.full());
        let start = (from + typed).checked_sub(matched)?;
        (rule.handler)(state, &found, start, to)
    })
}

/// Wrap the last capture group in `kind`, removing the surrounding
/// delimiters.
pub fn mark_input_rule(pattern: &str, kind: Arc<MarkType>, attrs: Option<AttrsFromMatch>) -> Result<InputRule, ConfigError> {
    let handler: RuleHandler = Arc::new(move |state: &EditorState, found: &InputMatch, start: usize, end: usize| {
        let mark_attrs = attrs.as_ref().and_then(|attrs| attrs(found));
        let mark = kind.create(mark_attrs.as_ref()).ok()?;
        let mut tr = state.tr();
        let last = found.groups.len() - 1;
        let (mut mark_start, mut mark_end) = (start, end);

        if let (Some(text), true) = (found.group(last), last > 0) {
            let outer = found.group(last - 1)?;
            let match_start = start + char_index_of(found.full(), outer)?;
            // The last typed char is not in the document yet.
            let match_end = match_start + char_len(outer) - 1;
            let text_start = match_start + char_last_index_of(outer, text)?;
            let text_end = text_start + char_len(text);

            let mut excluded = false;
            state.doc().nodes_between(start, end, |node: &Node, pos: usize, _: Option<&Node>, _: usize| {
                if node.is_inline()
                    && pos + node.node_size() > match_start
                    && node.marks().iter().any(|existing| existing.kind().excludes(&kind))
                {
                    excluded = true;
                }
                !excluded
            });
            if excluded {
                return None;
            }
            if text_end < match_end {
                tr.delete(text_end, match_end).ok()?;
            }
            if text_start > match_start {
                tr.delete(match_start, text_start).ok()?;
            }
            mark_start = match_start;
            mark_end = mark_start + char_len(text);
        }
        tr.add_mark(mark_start, mark_end, mark).ok()?;
        tr.remove_stored_mark(&kind).ok()?;
        Some(tr)
    });
    InputRule::new(pattern, handler)
}

/// Turn the textblock the match is in into `kind`.
pub fn textblock_type_input_rule(
    pattern: &str,
    kind: Arc<NodeType>,
    attrs: Option<AttrsFromMatch>,
) -> Result<InputRule, ConfigError> {
    let handler: RuleHandler = Arc::new(move |state: &EditorState, found: &InputMatch, start: usize, end: usize| {
        let resolved = state.doc().resolve(start).ok()?;
        if resolved.depth() == 0 {
            return None;
        }
        let depth = resolved.depth() - 1;
        if !resolved
            .node(depth)
            .can_replace_with(resolved.index(depth), resolved.index_after(depth), &kind)
        {
            return None;
        }
        let node_attrs = attrs.as_ref().and_then(|attrs| attrs(found));
        let mut tr = state.tr();
        tr.delete(start, end).ok()?;
        tr.set_block_type(start, start, &kind, node_attrs.as_ref()).ok()?;
        Some(tr)
    });
    InputRule::new(pattern, handler)
}

/// Wrap the textblock the match is in with `kind`, joining with a
/// preceding node of the same kind.
pub fn wrapping_input_rule(pattern: &str, kind: Arc<NodeType>, attrs: Option<AttrsFromMatch>) -> Result<InputRule, ConfigError> {
    let handler: RuleHandler = Arc::new(move |state: &EditorState, found: &InputMatch, start: usize, end: usize| {
        let node_attrs = attrs.as_ref().and_then(|attrs| attrs(found));
        let mut tr = state.tr();
        tr.delete(start, end).ok()?;
        let resolved = tr.doc().resolve(start).ok()?;
        let range = resolved.block_range(&resolved)?;
        find_wrapping(state.schema(), &range, &kind)?;
        tr.wrap(&range, &kind, node_attrs.as_ref()).ok()?;

        let join_at = start.checked_sub(1)?;
        let boundary = tr.doc().resolve(join_at).ok()?;
        if let (Some(before), Some(after)) = (boundary.node_before(), boundary.node_after()) {
            let joinable = before.kind().as_ref() == kind.as_ref()
                && after.kind().as_ref() == kind.as_ref()
                && kind.valid_content(&before.content().append(after.content()));
            if joinable {
                tr.join(join_at, 1).ok()?;
            }
        }
        Some(tr)
    });
    InputRule::new(pattern, handler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::Selection;
    use crate::state::StateConfig;
    use paper_model::{AttrSpec, MarkSpec, NodeSpec, Schema, SchemaSpec};
    use serde_json::{json, Value};

    fn schema() -> Arc<Schema> {
        Schema::new(
            SchemaSpec::default()
                .node("doc", NodeSpec::new().content("block+"))
                .node("paragraph", NodeSpec::new().content("inline*").group("block"))
                .node("blockquote", NodeSpec::new().content("block+").group("block"))
                .node(
                    "code_block",
                    NodeSpec::new()
                        .content("text*")
                        .marks("")
                        .group("block")
                        .code()
                        .attr("language", AttrSpec::with_default(Value::Null)),
                )
                .node("text", NodeSpec::new().group("inline"))
                .mark("bold", MarkSpec::new())
                .mark("code", MarkSpec::new().excludes("_")),
        )
        .unwrap()
    }

    fn state_with(schema: &Arc<Schema>, block: Node, caret: usize) -> EditorState {
        let doc = schema.node("doc", None, vec![block]).unwrap();
        EditorState::create(
            StateConfig::new(schema.clone())
                .with_doc(doc)
                .with_selection(Selection::cursor(caret)),
        )
        .unwrap()
    }

    fn para(schema: &Schema, text: &str) -> Node {
        schema
            .node("paragraph", None, vec![schema.text(text, vec![]).unwrap()])
            .unwrap()
    }

    #[test]
    fn test_mark_rule_strips_delimiters() {
        let schema = schema();
        let bold = schema.mark_type("bold").unwrap().clone();
        let rule = mark_input_rule(r"(?:\*\*)([^*]+)(?:\*\*)$", bold.clone(), None).unwrap();
        // "a **bold*" with the caret at the end, typing the closing "*"
        let state = state_with(&schema, para(&schema, "a **bold*"), 10);

        let tr = run_input_rules(&state, 10, 10, "*", &[rule], 500).unwrap();
        let next = state.apply(tr).unwrap();
        let block = next.doc().child(0).unwrap();
        assert_eq!(block.text_content(), "a bold");
        assert!(next.doc().range_has_mark(3, 7, &bold));
        assert!(!next.doc().range_has_mark(1, 3, &bold));
    }

    #[test]
    fn test_textblock_rule_captures_language() {
        let schema = schema();
        let code = schema.node_type("code_block").unwrap().clone();
        let attrs: AttrsFromMatch = Arc::new(|found: &InputMatch| {
            let language = found.group(1).map(Value::from).unwrap_or(Value::Null);
            serde_json::from_value(json!({ "language": language })).ok()
        });
        let rule = textblock_type_input_rule(r"^```([a-z]+)?\s$", code, Some(attrs)).unwrap();
        let state = state_with(&schema, para(&schema, "```py"), 6);

        let tr = run_input_rules(&state, 6, 6, " ", &[rule], 500).unwrap();
        let next = state.apply(tr).unwrap();
        let block = next.doc().child(0).unwrap();
        assert_eq!(block.type_name(), "code_block");
        assert_eq!(block.attr_str("language"), Some("py"));
        assert_eq!(block.content().size(), 0);
    }

    #[test]
    fn test_wrapping_rule() {
        let schema = schema();
        let quote = schema.node_type("blockquote").unwrap().clone();
        let rule = wrapping_input_rule(r"^\s*>\s$", quote, None).unwrap();
        let state = state_with(&schema, para(&schema, ">"), 2);

        let tr = run_input_rules(&state, 2, 2, " ", &[rule], 500).unwrap();
        let next = state.apply(tr).unwrap();
        assert_eq!(next.doc().child(0).unwrap().type_name(), "blockquote");
        assert_eq!(next.doc().text_content(), "");
    }

    #[test]
    fn test_rules_skip_code_and_lookbehind() {
        let schema = schema();
        let bold = schema.mark_type("bold").unwrap().clone();
        let rule = mark_input_rule(r"(?:\*\*)([^*]+)(?:\*\*)$", bold, None).unwrap();
        let code = schema
            .node("code_block", None, vec![schema.text("**x*", vec![]).unwrap()])
            .unwrap();
        let state = state_with(&schema, code, 5);
        assert!(run_input_rules(&state, 5, 5, "*", std::slice::from_ref(&rule), 500).is_none());

        let state = state_with(&schema, para(&schema, "**x*"), 5);
        assert!(run_input_rules(&state, 5, 5, "*", std::slice::from_ref(&rule), 2).is_none());
        assert!(run_input_rules(&state, 5, 5, "*", &[rule], 4).is_some());
    }

    #[test]
    fn test_invalid_pattern() {
        let schema = schema();
        let bold = schema.mark_type("bold").unwrap().clone();
        assert!(matches!(
            mark_input_rule("(unclosed", bold, None),
            Err(ConfigError::InputRule { .. })
        ));
    }
}
