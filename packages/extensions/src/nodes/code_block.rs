//! Code blocks are embedded regions: their text is edited by an external
//! plain-text surface and kept in sync both ways.
//!
//! ```text
//! host transaction ──► SyncPlugin ──► InstanceRegistry[editorId] ──► surface
//! surface edit ──► Synchronizer::surface_edit (tagged) ──► Editor::dispatch
//! ```

use paper_editor::commands::{command, newline_in_code, Command};
use paper_editor::input_rules::{textblock_type_input_rule, AttrsFromMatch};
use paper_editor::sync::{
    editor_id, ClientId, EditorIdPlugin, EmbeddedSurface, IdGenerator, InstanceRegistry, SurfaceRegistry, SyncPlugin,
    Synchronizer, EDITOR_ID_ATTR,
};
use paper_editor::{
    ConfigError, InputMatch, InputRule, KeyBinding, NodeContext, NodeExtension, NodeView, NodeViewFactory, Plugin,
};
use paper_model::{AttrSpec, Attrs, Node, NodeSpec};
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

pub const CODE_BLOCK: &str = "code_block";

/// Creates the surface for a newly rendered code block.
pub type SurfaceFactory = Arc<dyn Fn(&Node) -> Arc<dyn EmbeddedSurface> + Send + Sync>;

pub struct CodeBlock {
    generator: IdGenerator,
    registry: Arc<InstanceRegistry>,
    sync: Arc<Synchronizer>,
    surfaces: Option<SurfaceFactory>,
}

impl fmt::Debug for CodeBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodeBlock")
            .field("generator", &self.generator)
            .field("client", self.sync.client())
            .field("registry", &self.registry)
            .finish()
    }
}

impl Default for CodeBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeBlock {
    /// A code block with a random client identity and id seed.
    pub fn new() -> Self {
        Self::with_identity(ClientId::random(), IdGenerator::random())
    }

    pub fn with_identity(client: ClientId, generator: IdGenerator) -> Self {
        let registry = Arc::new(InstanceRegistry::new());
        let sync = Arc::new(Synchronizer::new(client, CODE_BLOCK, registry.clone()));
        Self {
            generator,
            registry,
            sync,
            surfaces: None,
        }
    }

    /// Attach a surface to every code block view as soon as it is created.
    pub fn with_surfaces(mut self, factory: SurfaceFactory) -> Self {
        self.surfaces = Some(factory);
        self
    }

    /// Translates edits between the host document and the surfaces.
    pub fn synchronizer(&self) -> &Arc<Synchronizer> {
        &self.sync
    }

    pub fn registry(&self) -> &Arc<InstanceRegistry> {
        &self.registry
    }
}

impl NodeExtension for CodeBlock {
    fn name(&self) -> &str {
        CODE_BLOCK
    }

    fn spec(&self) -> NodeSpec {
        NodeSpec::new()
            .content("text*")
            .marks("")
            .group("block")
            .code()
            .defining()
            .isolating()
            .attr(EDITOR_ID_ATTR, AttrSpec::with_default(Value::Null))
            .attr("language", AttrSpec::with_default(Value::Null))
    }

    fn input_rules(&self, cx: &NodeContext) -> Result<Vec<InputRule>, ConfigError> {
        let fallback = cx.config.code_block.default_language.clone();
        let language: AttrsFromMatch = Arc::new(move |found: &InputMatch| {
            let language = found.group(1).map(str::to_string).or_else(|| fallback.clone());
            Some(Attrs::from([(
                "language".to_string(),
                language.map(Value::from).unwrap_or(Value::Null),
            )]))
        });
        Ok(vec![textblock_type_input_rule(r"^```([a-z]+)?\s$", cx.kind.clone(), Some(language))?])
    }

    fn key_bindings(&self, _cx: &NodeContext) -> Vec<KeyBinding> {
        vec![
            KeyBinding::new("Enter", newline_in_code()),
            KeyBinding::new("Backspace", exit_at_start(self.sync.clone())),
        ]
    }

    fn plugins(&self, _cx: &NodeContext) -> Vec<Arc<dyn Plugin>> {
        vec![
            Arc::new(EditorIdPlugin::new(CODE_BLOCK, self.generator.clone())),
            Arc::new(SyncPlugin::new(self.sync.clone())),
        ]
    }

    fn node_view(&self, _cx: &NodeContext) -> Option<Arc<dyn NodeViewFactory>> {
        Some(Arc::new(CodeBlockViews {
            registry: self.registry.clone(),
            surfaces: self.surfaces.clone(),
        }))
    }
}

/// Backspace with the caret at the very start of a code block turns it
/// back into a paragraph.
fn exit_at_start(sync: Arc<Synchronizer>) -> Command {
    command(move |state| {
        let pos = state.selection().cursor_pos()?;
        let resolved = state.doc().resolve(pos).ok()?;
        let parent = resolved.parent();
        if parent.type_name() != CODE_BLOCK || resolved.parent_offset() > 0 {
            return None;
        }
        let id = editor_id(parent).ok()?;
        sync.exit_region(state, id).ok()
    })
}

struct CodeBlockViews {
    registry: Arc<InstanceRegistry>,
    surfaces: Option<SurfaceFactory>,
}

impl NodeViewFactory for CodeBlockViews {
    fn kind(&self) -> &str {
        CODE_BLOCK
    }

    fn view_key(&self, node: &Node) -> Option<String> {
        editor_id(node).ok().map(str::to_string)
    }

    fn create(&self, node: &Node, pos: usize) -> Box<dyn NodeView> {
        let mut view = CodeBlockView {
            editor_id: editor_id(node).unwrap_or_default().to_string(),
            node: node.clone(),
            pos,
            registry: self.registry.clone(),
            surface: None,
        };
        if let Some(factory) = &self.surfaces {
            view.attach(factory(node));
        }
        Box::new(view)
    }
}

/// The rendered code block. Holds the surface once one is attached.
pub struct CodeBlockView {
    editor_id: String,
    node: Node,
    pos: usize,
    registry: Arc<InstanceRegistry>,
    surface: Option<Arc<dyn EmbeddedSurface>>,
}

impl fmt::Debug for CodeBlockView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodeBlockView")
            .field("editor_id", &self.editor_id)
            .field("pos", &self.pos)
            .field("attached", &self.surface.is_some())
            .finish()
    }
}

fn surface_attrs(node: &Node) -> Attrs {
    let mut attrs = node.attrs().clone();
    attrs.remove(EDITOR_ID_ATTR);
    attrs
}

impl CodeBlockView {
    pub fn editor_id(&self) -> &str {
        &self.editor_id
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn is_attached(&self) -> bool {
        self.surface.is_some()
    }

    /// Bind `surface`: it gets the current text and is registered so host
    /// edits reach it. Replaces any surface attached before.
    pub fn attach(&mut self, surface: Arc<dyn EmbeddedSurface>) {
        if let Some(old) = self.surface.take() {
            old.dispose();
        }
        surface.set_content(&self.node.text_content());
        surface.set_attributes(&surface_attrs(&self.node));
        self.registry.set_by_id(&self.editor_id, surface.clone());
        debug!(editor_id = %self.editor_id, "surface attached");
        self.surface = Some(surface);
    }
}

impl NodeView for CodeBlockView {
    fn update(&mut self, node: &Node, pos: usize) -> bool {
        if editor_id(node).ok() != Some(self.editor_id.as_str()) {
            return false;
        }
        if node.attrs() != self.node.attrs() {
            if let Some(surface) = &self.surface {
                surface.set_attributes(&surface_attrs(node));
            }
        }
        self.node = node.clone();
        self.pos = pos;
        true
    }

    fn destroy(&mut self) {
        match self.registry.delete_by_id(&self.editor_id) {
            Some(_) => debug!(editor_id = %self.editor_id, "surface released"),
            None if self.surface.is_some() => warn!(editor_id = %self.editor_id, "surface was not registered"),
            None => {}
        }
        if let Some(surface) = self.surface.take() {
            surface.dispose();
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
