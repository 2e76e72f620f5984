//! # Entity Store Trait
//!
//! This is THE contract between the view factor relation and the object
//! model that hosts zones, surfaces and records. The relation only ever
//! talks to the model through it.
//!
//! ## Implementations
//!
//! | Store | Module | Description |
//! |-------|--------|-------------|
//! | `MemoryStore` | `memory` | In-memory object model for embedding/testing |

pub mod memory;

use crate::config::RelationConfig;
use crate::model::*;
use crate::Result;

pub use memory::MemoryStore;

// ============================================================================
// EntityStore Trait
// ============================================================================

/// The object model contract.
///
/// Methods take `&self`; implementations serialize their own mutation (the
/// memory store uses `RwLock`s). The relation assumes a single writer per
/// zone, so multi-step operations built on this trait are not atomic across
/// concurrent writers.
pub trait EntityStore: Send + Sync {
    // ========================================================================
    // Entities
    // ========================================================================

    /// Get an entity by handle. `None` if it doesn't exist (or was removed).
    fn entity(&self, id: EntityId) -> Option<Entity>;

    /// Classify a handle. `None` for stale handles.
    fn kind_of(&self, id: EntityId) -> Option<EntityKind> {
        self.entity(id).map(|e| e.kind)
    }

    /// Handle + kind + name snapshot, ready to build a `ViewFactor` from.
    fn entity_ref(&self, id: EntityId) -> Option<EntityRef> {
        self.entity(id).map(|e| e.to_ref())
    }

    /// The entity's immediate container (space, base surface or zone).
    fn parent_of(&self, id: EntityId) -> Option<EntityId> {
        self.entity(id).and_then(|e| e.parent)
    }

    /// Resolve a participant to the zone enclosing it.
    ///
    /// Walks the participant kind's parent chain, checking each hop has the
    /// expected kind. Returns `None` for non-participants, stale handles,
    /// unattached elements and spaces without a zone.
    fn resolve_enclosing_zone(&self, id: EntityId) -> Option<EntityId> {
        let kind = ParticipantKind::try_from(self.kind_of(id)?).ok()?;
        let mut current = id;
        for expected in kind.zone_path() {
            let parent = self.parent_of(current)?;
            if self.kind_of(parent)? != *expected {
                return None;
            }
            current = parent;
        }
        Some(current)
    }

    // ========================================================================
    // Relation registry (one user view factors record per zone)
    // ========================================================================

    /// The user view factors record registered against a zone, if any.
    fn relation_of(&self, zone: EntityId) -> Option<RecordId>;

    fn has_relation(&self, zone: EntityId) -> bool {
        self.relation_of(zone).is_some()
    }

    /// Create a record bound to `zone` and register it, carrying `config`
    /// as its validation policy.
    ///
    /// Fails with `DuplicateRelation` if the zone already has one,
    /// `InvalidZone` if the entity isn't a zone, `NotFound` if it doesn't exist.
    fn register_relation(&self, zone: EntityId, config: RelationConfig) -> Result<RecordId>;

    /// The validation policy stored on a record.
    fn relation_config(&self, record: RecordId) -> Result<RelationConfig>;

    /// Replace the validation policy stored on a record.
    fn set_relation_config(&self, record: RecordId, config: RelationConfig) -> Result<()>;

    /// Drop a record and its registration. Returns true if it existed.
    fn unregister_relation(&self, record: RecordId) -> Result<bool>;

    /// The zone a record is bound to.
    fn relation_zone(&self, record: RecordId) -> Option<EntityId>;

    // ========================================================================
    // Extensible groups
    // ========================================================================

    /// Number of extensible groups on a record.
    fn num_groups(&self, record: RecordId) -> Result<usize>;

    /// Append a group. Returns its index.
    fn push_group(&self, record: RecordId, group: ExtensibleGroup) -> Result<usize>;

    /// Erase the group at `index`, shifting later groups down by one.
    /// Returns false if `index` is out of range.
    fn erase_group(&self, record: RecordId, index: usize) -> Result<bool>;

    /// Erase every group.
    fn clear_groups(&self, record: RecordId) -> Result<()>;

    /// Snapshot of all groups, in order.
    fn groups(&self, record: RecordId) -> Result<Vec<ExtensibleGroup>>;

    /// Single group by index.
    fn group(&self, record: RecordId, index: usize) -> Result<Option<ExtensibleGroup>> {
        Ok(self.groups(record)?.into_iter().nth(index))
    }
}
