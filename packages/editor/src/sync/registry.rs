//! Lookup of live surfaces by region identity.

use super::identity::EDITOR_ID_ATTR;
use super::surface::EmbeddedSurface;
use crate::errors::SyncError;
use paper_model::Node;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// The region identity of `node`.
///
/// A region without one means the identity pass was bypassed, which is an
/// invariant violation rather than a recoverable condition.
pub fn editor_id(node: &Node) -> Result<&str, SyncError> {
    node.attr_str(EDITOR_ID_ATTR)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| SyncError::MissingIdentity {
            kind: node.type_name().to_string(),
        })
}

pub trait SurfaceRegistry: Send + Sync {
    fn get_by_id(&self, editor_id: &str) -> Option<Arc<dyn EmbeddedSurface>>;

    fn set_by_id(&self, editor_id: &str, surface: Arc<dyn EmbeddedSurface>);

    fn delete_by_id(&self, editor_id: &str) -> Option<Arc<dyn EmbeddedSurface>>;

    fn get(&self, node: &Node) -> Result<Option<Arc<dyn EmbeddedSurface>>, SyncError> {
        Ok(self.get_by_id(editor_id(node)?))
    }

    fn set(&self, node: &Node, surface: Arc<dyn EmbeddedSurface>) -> Result<(), SyncError> {
        self.set_by_id(editor_id(node)?, surface);
        Ok(())
    }

    fn delete(&self, node: &Node) -> Result<Option<Arc<dyn EmbeddedSurface>>, SyncError> {
        Ok(self.delete_by_id(editor_id(node)?))
    }
}

/// In-memory registry shared between node views and the synchronizer.
#[derive(Default)]
pub struct InstanceRegistry {
    instances: RwLock<HashMap<String, Arc<dyn EmbeddedSurface>>>,
}

impl fmt::Debug for InstanceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<String> = self.read().keys().cloned().collect();
        ids.sort();
        f.debug_struct("InstanceRegistry").field("instances", &ids).finish()
    }
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn contains(&self, editor_id: &str) -> bool {
        self.read().contains_key(editor_id)
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<dyn EmbeddedSurface>>> {
        self.instances.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<dyn EmbeddedSurface>>> {
        self.instances.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SurfaceRegistry for InstanceRegistry {
    fn get_by_id(&self, editor_id: &str) -> Option<Arc<dyn EmbeddedSurface>> {
        self.read().get(editor_id).cloned()
    }

    fn set_by_id(&self, editor_id: &str, surface: Arc<dyn EmbeddedSurface>) {
        self.write().insert(editor_id.to_string(), surface);
    }

    fn delete_by_id(&self, editor_id: &str) -> Option<Arc<dyn EmbeddedSurface>> {
        self.write().remove(editor_id)
    }
}
