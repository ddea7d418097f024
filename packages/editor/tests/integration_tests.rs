//! Integration tests for editor crate

use paper_editor::model::{AttrSpec, Fragment, MarkSpec, NodeSpec, Schema, SchemaSpec, Slice};
use paper_editor::sync::{
    regions, ClientId, EditorIdPlugin, EmbeddedSurface, IdGenerator, InstanceRegistry, SurfaceEdit, SurfaceOp,
    SurfaceRegistry, SyncPlugin, Synchronizer, CLIENT_ID_META, EDITOR_ID_ATTR,
};
use paper_editor::{
    history::{redo_depth, undo_depth},
    redo, undo, EditorState, HistoryPlugin, Plugin, Selection, StateConfig, Step, TransactionError,
};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

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
            .node("text", NodeSpec::new())
            .mark("bold", MarkSpec::new()),
    )
    .unwrap()
}

/// Surface keeping its own copy of the text.
#[derive(Default)]
struct TextSurface {
    text: Mutex<String>,
    ops: Mutex<Vec<SurfaceOp>>,
}

impl EmbeddedSurface for TextSurface {
    fn set_content(&self, text: &str) {
        *self.text.lock().unwrap() = text.to_string();
    }

    fn apply(&self, op: &SurfaceOp) {
        let mut text = self.text.lock().unwrap();
        *text = op.apply_to(&text).expect("op inside the surface text");
        self.ops.lock().unwrap().push(op.clone());
    }
}

struct Setup {
    state: EditorState,
    sync: Arc<Synchronizer>,
    registry: Arc<InstanceRegistry>,
}

fn setup(code: &str) -> Setup {
    let schema = schema();
    let registry = Arc::new(InstanceRegistry::new());
    let sync = Arc::new(Synchronizer::new(ClientId::new("surface"), "code_block", registry.clone()));
    let plugins: Vec<Arc<dyn Plugin>> = vec![
        Arc::new(HistoryPlugin::new(50)),
        Arc::new(EditorIdPlugin::new("code_block", IdGenerator::from_seed("t"))),
        Arc::new(SyncPlugin::new(sync.clone())),
    ];
    let content = if code.is_empty() {
        vec![]
    } else {
        vec![schema.text(code, vec![]).unwrap()]
    };
    let doc = schema
        .node(
            "doc",
            None,
            vec![
                schema.node("paragraph", None, vec![schema.text("ab", vec![]).unwrap()]).unwrap(),
                schema.node("code_block", None, content).unwrap(),
            ],
        )
        .unwrap();
    let state = EditorState::create(StateConfig::new(schema).with_doc(doc).with_plugins(plugins)).unwrap();
    let mut tr = state.tr();
    tr.set_add_to_history(false);
    let state = state.apply(tr).unwrap();
    Setup { state, sync, registry }
}

fn attach(setup: &Setup) -> Arc<TextSurface> {
    let surface = Arc::new(TextSurface::default());
    let node = setup.state.doc().child(1).unwrap();
    surface.set_content(&node.text_content());
    setup.registry.set(node, surface.clone()).unwrap();
    surface
}

#[test]
fn test_initial_transaction_assigns_identity() {
    let setup = setup("fn main() {}");
    let ids: Vec<_> = regions(setup.state.doc(), "code_block").into_iter().map(|(_, id)| id).collect();
    assert_eq!(ids, vec![Some("t-1".to_string())]);
    assert_eq!(undo_depth(&setup.state), 0);
}

#[test]
fn test_host_edits_reach_the_surface() {
    let setup = setup("let x = 1;");
    let surface = attach(&setup);

    // Code text starts at 5.
    let mut tr = setup.state.tr();
    tr.insert_text("mut ", 9, 9).unwrap();
    let state = setup.state.apply(tr).unwrap();

    assert_eq!(surface.ops.lock().unwrap().len(), 1);
    assert_eq!(*surface.text.lock().unwrap(), "let mut x = 1;");
    assert_eq!(setup.sync.region_text(state.doc(), "t-1").as_deref(), Some("let mut x = 1;"));
}

#[test]
fn test_surface_edits_round_trip_without_echo() {
    let setup = setup("abc");
    let surface = attach(&setup);
    surface.apply(&SurfaceOp::Delete { offset: 1, len: 1 });
    surface.ops.lock().unwrap().clear();

    let tr = setup
        .sync
        .surface_edit(&setup.state, "t-1", SurfaceEdit::Delete { offset: 1, len: 1 })
        .unwrap();
    assert_eq!(tr.meta::<ClientId>(CLIENT_ID_META), Some(setup.sync.client()));
    let state = setup.state.apply(tr).unwrap();

    assert!(surface.ops.lock().unwrap().is_empty());
    assert_eq!(state.doc().child(1).unwrap().text_content(), "ac");
    assert_eq!(*surface.text.lock().unwrap(), "ac");
}

#[test]
fn test_undo_of_surface_edit_is_synced_back() {
    let setup = setup("abc");
    let surface = attach(&setup);
    let tr = setup
        .sync
        .surface_edit(
            &setup.state,
            "t-1",
            SurfaceEdit::Insert {
                offset: 3,
                text: "d".into(),
            },
        )
        .unwrap();
    surface.apply(&SurfaceOp::Insert {
        offset: 3,
        text: "d".into(),
    });
    let state = setup.state.apply(tr).unwrap();
    assert_eq!(undo_depth(&state), 1);

    // The undo carries no client tag, so the surface hears about it.
    let state = state.apply(undo()(&state).unwrap()).unwrap();
    assert_eq!(*surface.text.lock().unwrap(), "abc");
    assert_eq!(redo_depth(&state), 1);
    let state = state.apply(redo()(&state).unwrap()).unwrap();
    assert_eq!(*surface.text.lock().unwrap(), "abcd");
    assert_eq!(state.doc().child(1).unwrap().attr_str(EDITOR_ID_ATTR), Some("t-1"));
}

#[test]
fn test_undo_restoring_deleted_region_gets_fresh_identity() {
    let setup = setup("x");
    let code = setup.state.doc().child(1).unwrap().node_size();
    let mut tr = setup.state.tr();
    tr.delete(4, 4 + code).unwrap();
    let state = setup.state.apply(tr).unwrap();
    assert!(regions(state.doc(), "code_block").is_empty());

    let state = state.apply(undo()(&state).unwrap()).unwrap();
    let ids: Vec<_> = regions(state.doc(), "code_block").into_iter().map(|(_, id)| id).collect();
    assert_eq!(ids, vec![Some("t-2".to_string())]);
}

#[test]
fn test_invalid_content_leaves_state_unchanged() {
    let setup = setup("x");
    let mut tr = setup.state.tr();
    // Text directly under the document.
    let text = Slice::closed(Fragment::from_node(setup.state.schema().text("loose", vec![]).unwrap()));
    assert!(tr.replace(0, 0, text).is_err());
    assert!(matches!(setup.state.apply(tr), Err(TransactionError::Step(_))));
}

#[test]
fn test_apply_is_deterministic() {
    let setup = setup("x");
    let build = || {
        let mut tr = setup.state.tr();
        tr.insert_text("y", 2, 2).unwrap();
        tr.set_selection(Selection::cursor(3));
        tr
    };
    let a = setup.state.apply(build()).unwrap();
    let b = setup.state.apply(build()).unwrap();
    assert_eq!(a.doc(), b.doc());
    assert_eq!(a.to_json(), b.to_json());
}

#[test]
fn test_marks_are_refused_in_code() {
    let setup = setup("abc");
    let bold = setup.state.schema().mark("bold", None).unwrap();
    let mut tr = setup.state.tr();
    tr.add_mark(5, 8, bold).unwrap();
    let state = setup.state.apply(tr).unwrap();
    assert!(state.doc().child(1).unwrap().child(0).unwrap().marks().is_empty());
}

#[test]
fn test_attribute_change_keeps_identity() {
    let setup = setup("abc");
    let attrs = serde_json::from_value(json!({ EDITOR_ID_ATTR: "other" })).unwrap();
    let tr = setup.sync.attribute_change(&setup.state, "t-1", &attrs).unwrap();
    let state = setup.state.apply(tr).unwrap();
    assert_eq!(state.doc().child(1).unwrap().attr_str(EDITOR_ID_ATTR), Some("t-1"));
}

proptest! {
    #[test]
    fn prop_host_replace_translates_to_local_offsets(
        code in "[a-z]{1,24}",
        a in 0usize..24,
        b in 0usize..24,
        insert in "[A-Z]{0,4}",
    ) {
        let len = code.chars().count();
        let (a, b) = (a.min(b).min(len), a.max(b).min(len));
        let setup = setup(&code);
        // Region starts at 4; its text at 5.
        let start = 5;
        let slice = if insert.is_empty() {
            Slice::empty()
        } else {
            Slice::closed(Fragment::from_node(setup.state.schema().text(insert.as_str(), vec![]).unwrap()))
        };
        let step = Step::replace(start + a, start + b, slice);
        let translated = setup.sync.translate_step(&step, setup.state.doc()).unwrap();
        let expected = SurfaceOp::from_parts(a, b - a, &insert);
        prop_assert_eq!(translated.map(|t| t.op), expected);
    }
}
