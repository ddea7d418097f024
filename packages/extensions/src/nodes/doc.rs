use paper_editor::NodeExtension;
use paper_model::NodeSpec;

/// The top node.
pub struct Doc;

impl NodeExtension for Doc {
    fn name(&self) -> &str {
        "doc"
    }

    fn spec(&self) -> NodeSpec {
        NodeSpec::new().content("block+")
    }
}

pub struct Text;

impl NodeExtension for Text {
    fn name(&self) -> &str {
        "text"
    }

    fn spec(&self) -> NodeSpec {
        NodeSpec::new().group("inline")
    }
}

pub struct Paragraph;

impl NodeExtension for Paragraph {
    fn name(&self) -> &str {
        "paragraph"
    }

    fn spec(&self) -> NodeSpec {
        NodeSpec::new().content("inline*").group("block")
    }
}
