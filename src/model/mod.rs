//! The in-memory document model.
//!
//! The tree mirrors the file: a [`FamosHeader`] owns groups, fields and raw
//! blocks; fields own components; components own their pack, buffer and
//! calibration descriptions. Relationships the file expresses through
//! integer indices (buffer to raw block, pack info to buffers, channel to
//! group, event reference to event list) are held as [`EntityId`] handles
//! instead. The integer fields are a wire-format artifact and are only
//! trustworthy directly after loading or directly before saving.

use core::sync::atomic::{AtomicU64, Ordering};

mod buffer;
mod calibration;
mod component;
mod event;
mod field;
mod group;
mod header;
mod metadata;
mod pack_info;
mod raw_block;
mod scaling;
mod types;

pub use buffer::{Buffer, BufferInfo};
pub use calibration::{CalibrationInfo, DisplayInfo};
pub use component::{Component, ComponentKind};
pub use event::{Event, EventInfo, EventReference};
pub use field::Field;
pub use group::Group;
pub use header::FamosHeader;
pub(crate) use header::{ValueLocation, WrittenSkeleton};
pub use metadata::{
    Channel, CustomKey, LanguageInfo, OriginInfo, Property, PropertyInfo, SingleValue, Text,
};
pub use pack_info::PackInfo;
pub use raw_block::RawBlock;
pub use scaling::{TriggerTime, XAxisScaling, ZAxisScaling};
pub use types::{
    BufferAlignment, ComponentRole, CompressionType, DataType, FieldType, Origin, PropertyType,
    TimeMode,
};

static NEXT_ENTITY_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a referenceable entity.
///
/// A fresh id is allocated whenever an entity is constructed or parsed.
/// Cloning an entity keeps its id, so the clone is "the same instance" as far
/// as reference resolution and validation are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "u64", into = "u64"))]
pub struct EntityId(u64);

impl EntityId {
    /// Allocate a new, never before used id.
    pub fn new() -> Self {
        EntityId(NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Rebuild an id, e.g. from exported metadata. Fresh ids allocated
/// afterwards never collide with it.
impl From<u64> for EntityId {
    fn from(raw: u64) -> Self {
        NEXT_ENTITY_ID.fetch_max(raw.saturating_add(1), Ordering::Relaxed);
        EntityId(raw)
    }
}

impl From<EntityId> for u64 {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for EntityId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
