use paper_editor::{EditorState, Extension, ExtensionContext, Transaction, TransactionHandler};
use paper_model::NodeJson;
use std::sync::Arc;

/// Called with the new document after every change.
pub type ChangeHandler = Arc<dyn Fn(&NodeJson) + Send + Sync>;

/// The initial document and a change callback, for hosts that store the
/// document as JSON.
#[derive(Default)]
pub struct Value {
    initial: Option<NodeJson>,
    on_change: Option<ChangeHandler>,
}

impl Value {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, doc: NodeJson) -> Self {
        self.initial = Some(doc);
        self
    }

    pub fn on_change(mut self, handler: impl Fn(&NodeJson) + Send + Sync + 'static) -> Self {
        self.on_change = Some(Arc::new(handler));
        self
    }
}

impl Extension for Value {
    fn name(&self) -> &str {
        "value"
    }

    fn default_value(&self, _cx: &ExtensionContext) -> Option<NodeJson> {
        self.initial.clone()
    }

    fn on_transaction(&self, _cx: &ExtensionContext) -> Option<TransactionHandler> {
        let handler = self.on_change.clone()?;
        Some(Arc::new(move |state: &EditorState, trs: &[Transaction]| {
            if trs.iter().any(Transaction::doc_changed) {
                handler(&state.to_json());
            }
        }))
    }
}
