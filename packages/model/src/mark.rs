use crate::attrs::Attrs;
use crate::schema::MarkType;
use std::sync::Arc;

/// A formatting annotation over inline content.
///
/// Mark sets are kept sorted by mark rank (declaration order), so two equal
/// sets always compare equal element-wise.
#[derive(Clone, Debug, PartialEq)]
pub struct Mark {
    kind: Arc<MarkType>,
    attrs: Attrs,
}

impl Mark {
    pub(crate) fn new(kind: Arc<MarkType>, attrs: Attrs) -> Self {
        Self { kind, attrs }
    }

    pub fn kind(&self) -> &Arc<MarkType> {
        &self.kind
    }

    pub fn type_name(&self) -> &str {
        self.kind.name()
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    /// Add this mark to `set`, respecting exclusion and rank order.
    pub fn add_to_set(&self, set: &[Mark]) -> Vec<Mark> {
        let mut copy: Option<Vec<Mark>> = None;
        let mut placed = false;
        for (i, other) in set.iter().enumerate() {
            if self == other {
                return set.to_vec();
            }
            if self.kind.excludes(&other.kind) {
                if copy.is_none() {
                    copy = Some(set[..i].to_vec());
                }
            } else if other.kind.excludes(&self.kind) {
                return set.to_vec();
            } else {
                if !placed && other.kind.rank() > self.kind.rank() {
                    let copy = copy.get_or_insert_with(|| set[..i].to_vec());
                    copy.push(self.clone());
                    placed = true;
                }
                if let Some(copy) = copy.as_mut() {
                    copy.push(other.clone());
                }
            }
        }
        let mut copy = copy.unwrap_or_else(|| set.to_vec());
        if !placed {
            copy.push(self.clone());
        }
        copy
    }

    pub fn remove_from_set(&self, set: &[Mark]) -> Vec<Mark> {
        set.iter().filter(|mark| *mark != self).cloned().collect()
    }

    pub fn is_in_set(&self, set: &[Mark]) -> bool {
        set.iter().any(|mark| mark == self)
    }

    pub fn same_set(a: &[Mark], b: &[Mark]) -> bool {
        a == b
    }
}
