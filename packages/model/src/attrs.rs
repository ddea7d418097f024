use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Attribute values of a node or mark, keyed by attribute name.
pub type Attrs = BTreeMap<String, Value>;

/// Declaration of a single attribute.
///
/// An attribute without a default is required: creating a node or mark
/// without supplying it fails.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttrSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl AttrSpec {
    pub fn required() -> Self {
        Self { default: None }
    }

    pub fn with_default(value: impl Into<Value>) -> Self {
        Self {
            default: Some(value.into()),
        }
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// Fill in defaults for `given`, dropping attributes the kind does not declare.
///
/// Returns the name of the first required attribute with no value.
pub(crate) fn compute_attrs(
    specs: &BTreeMap<String, AttrSpec>,
    given: Option<&Attrs>,
) -> Result<Attrs, String> {
    let mut attrs = Attrs::new();
    for (name, spec) in specs {
        let value = given
            .and_then(|given| given.get(name))
            .cloned()
            .or_else(|| spec.default.clone());
        match value {
            Some(value) => {
                attrs.insert(name.clone(), value);
            }
            None => return Err(name.clone()),
        }
    }
    Ok(attrs)
}
