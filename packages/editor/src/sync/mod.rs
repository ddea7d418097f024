//! Nested-region synchronization.
//!
//! A region is a node (a code block) whose text is edited by an external
//! plain-text surface. [`EditorIdPlugin`] gives every region a stable
//! identity, [`InstanceRegistry`] maps identities to live surfaces and
//! [`Synchronizer`] translates edits between the two.

mod identity;
mod registry;
mod surface;
mod synchronizer;

pub use identity::{
    find_region_by_id, regions, ClientId, EditorIdPlugin, IdGenerator, IdentityLedger, EDITOR_ID_ATTR, EDITOR_ID_META,
};
pub use registry::{editor_id, InstanceRegistry, SurfaceRegistry};
pub use surface::{EmbeddedSurface, SurfaceEdit, SurfaceOp};
pub use synchronizer::{SyncPlugin, Synchronizer, Translation};

/// Transaction meta naming the client a transaction came from.
pub const CLIENT_ID_META: &str = "clientId";
