//! In-memory entity store.
//!
//! This is the reference implementation of `EntityStore`.
//! It uses hash maps protected by RwLock, behind an `Arc` so clones are
//! cheap handles onto the same model.
//!
//! ## Limitations
//!
//! - **Single-writer only**: per-collection locks mean multi-step mutations
//!   are NOT atomic.
//! - **No cascading cleanup of groups**: removing a surface does not touch
//!   the extensible groups that point at it. Those groups become stale and
//!   are reported as such on read.
//! - Removing a zone drops its user view factors record.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::config::RelationConfig;
use crate::model::*;
use crate::{Error, Result};
use super::EntityStore;

// ============================================================================
// MemoryStore
// ============================================================================

/// In-memory building model.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    entities: RwLock<HashMap<EntityId, Entity>>,
    records: RwLock<HashMap<RecordId, Record>>,
    /// zone → its user view factors record
    zone_index: RwLock<HashMap<EntityId, RecordId>>,
    next_entity_id: AtomicU64,
    next_record_id: AtomicU64,
}

struct Record {
    zone: EntityId,
    config: RelationConfig,
    groups: Vec<ExtensibleGroup>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_entity_id(&self) -> EntityId {
        EntityId(self.inner.next_entity_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    // ========================================================================
    // Builders
    // ========================================================================

    /// Insert an entity of any kind. The parent, if given, must exist.
    pub fn add_entity(
        &self,
        kind: EntityKind,
        name: impl Into<String>,
        parent: Option<EntityId>,
    ) -> Result<EntityId> {
        let mut entities = self.inner.entities.write();
        if let Some(p) = parent {
            if !entities.contains_key(&p) {
                return Err(Error::NotFound(format!("Parent entity {p}")));
            }
        }
        let id = self.allocate_entity_id();
        let mut entity = Entity::new(id, kind, name);
        entity.parent = parent;
        tracing::debug!(%id, %kind, name = %entity.name, "added entity");
        entities.insert(id, entity);
        Ok(id)
    }

    pub fn add_zone(&self, name: impl Into<String>) -> EntityId {
        let id = self.allocate_entity_id();
        let entity = Entity::new(id, EntityKind::Zone, name);
        tracing::debug!(%id, name = %entity.name, "added zone");
        self.inner.entities.write().insert(id, entity);
        id
    }

    /// Add a space, optionally assigned to a zone.
    pub fn add_space(&self, name: impl Into<String>, zone: Option<EntityId>) -> Result<EntityId> {
        if let Some(z) = zone {
            self.expect_kind(z, EntityKind::Zone)?;
        }
        self.add_entity(EntityKind::Space, name, zone)
    }

    /// Assign (or unassign) a space's zone.
    pub fn set_space_zone(&self, space: EntityId, zone: Option<EntityId>) -> Result<()> {
        self.expect_kind(space, EntityKind::Space)?;
        if let Some(z) = zone {
            self.expect_kind(z, EntityKind::Zone)?;
        }
        self.set_parent(space, zone)
    }

    pub fn add_surface(&self, name: impl Into<String>, space: EntityId) -> Result<EntityId> {
        self.expect_kind(space, EntityKind::Space)?;
        self.add_entity(EntityKind::Surface, name, Some(space))
    }

    pub fn add_sub_surface(&self, name: impl Into<String>, surface: EntityId) -> Result<EntityId> {
        self.expect_kind(surface, EntityKind::Surface)?;
        self.add_entity(EntityKind::SubSurface, name, Some(surface))
    }

    pub fn add_internal_mass(&self, name: impl Into<String>, space: EntityId) -> Result<EntityId> {
        self.expect_kind(space, EntityKind::Space)?;
        self.add_entity(EntityKind::InternalMass, name, Some(space))
    }

    /// Re-parent an entity without kind checks. `None` detaches it.
    pub fn set_parent(&self, id: EntityId, parent: Option<EntityId>) -> Result<()> {
        let mut entities = self.inner.entities.write();
        if let Some(p) = parent {
            if !entities.contains_key(&p) {
                return Err(Error::NotFound(format!("Parent entity {p}")));
            }
        }
        let entity = entities.get_mut(&id).ok_or_else(|| Error::NotFound(format!("Entity {id}")))?;
        entity.parent = parent;
        Ok(())
    }

    pub fn rename(&self, id: EntityId, name: impl Into<String>) -> Result<()> {
        let mut entities = self.inner.entities.write();
        let entity = entities.get_mut(&id).ok_or_else(|| Error::NotFound(format!("Entity {id}")))?;
        entity.name = name.into();
        Ok(())
    }

    /// Remove an entity out-of-band. Returns true if it existed.
    ///
    /// Children keep their (now dangling) parent handle. Removing a zone
    /// also drops its user view factors record.
    pub fn remove_entity(&self, id: EntityId) -> bool {
        let removed = self.inner.entities.write().remove(&id);
        if let Some(entity) = &removed {
            if entity.kind == EntityKind::Zone {
                if let Some(record) = self.inner.zone_index.write().remove(&id) {
                    self.inner.records.write().remove(&record);
                    tracing::debug!(zone = %id, %record, "dropped user view factors record with its zone");
                }
            }
            tracing::debug!(%id, kind = %entity.kind, "removed entity");
        }
        removed.is_some()
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    pub fn relation_count(&self) -> usize {
        self.inner.records.read().len()
    }

    /// All entities of one kind, sorted by handle.
    pub fn entities_by_kind(&self, kind: EntityKind) -> Vec<Entity> {
        let mut found: Vec<Entity> = self
            .inner
            .entities
            .read()
            .values()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect();
        found.sort_by_key(|e| e.id);
        found
    }

    fn expect_kind(&self, id: EntityId, expected: EntityKind) -> Result<()> {
        match self.kind_of(id) {
            Some(kind) if kind == expected => Ok(()),
            Some(kind) if expected == EntityKind::Zone => Err(Error::InvalidZone { entity: id, kind }),
            Some(kind) => Err(Error::NotFound(format!("{expected} {id} (entity is a {kind})"))),
            None => Err(Error::NotFound(format!("{expected} {id}"))),
        }
    }

    fn with_record<T>(&self, record: RecordId, f: impl FnOnce(&Record) -> T) -> Result<T> {
        let records = self.inner.records.read();
        let rec = records.get(&record).ok_or_else(|| Error::NotFound(format!("Record {record}")))?;
        Ok(f(rec))
    }

    fn with_record_mut<T>(&self, record: RecordId, f: impl FnOnce(&mut Record) -> T) -> Result<T> {
        let mut records = self.inner.records.write();
        let rec = records.get_mut(&record).ok_or_else(|| Error::NotFound(format!("Record {record}")))?;
        Ok(f(rec))
    }
}

// ============================================================================
// EntityStore impl
// ============================================================================

impl EntityStore for MemoryStore {
    fn entity(&self, id: EntityId) -> Option<Entity> {
        self.inner.entities.read().get(&id).cloned()
    }

    fn kind_of(&self, id: EntityId) -> Option<EntityKind> {
        self.inner.entities.read().get(&id).map(|e| e.kind)
    }

    fn parent_of(&self, id: EntityId) -> Option<EntityId> {
        self.inner.entities.read().get(&id).and_then(|e| e.parent)
    }

    fn relation_of(&self, zone: EntityId) -> Option<RecordId> {
        self.inner.zone_index.read().get(&zone).copied()
    }

    fn register_relation(&self, zone: EntityId, config: RelationConfig) -> Result<RecordId> {
        self.expect_kind(zone, EntityKind::Zone)?;

        // Hold the index lock across check-and-insert
        let mut index = self.inner.zone_index.write();
        if index.contains_key(&zone) {
            return Err(Error::DuplicateRelation(zone));
        }
        let record = RecordId(self.inner.next_record_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.inner.records.write().insert(record, Record { zone, config, groups: Vec::new() });
        index.insert(zone, record);
        Ok(record)
    }

    fn unregister_relation(&self, record: RecordId) -> Result<bool> {
        let removed = self.inner.records.write().remove(&record);
        match removed {
            Some(rec) => {
                self.inner.zone_index.write().remove(&rec.zone);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn relation_zone(&self, record: RecordId) -> Option<EntityId> {
        self.inner.records.read().get(&record).map(|r| r.zone)
    }

    fn relation_config(&self, record: RecordId) -> Result<RelationConfig> {
        self.with_record(record, |r| r.config)
    }

    fn set_relation_config(&self, record: RecordId, config: RelationConfig) -> Result<()> {
        self.with_record_mut(record, |r| r.config = config)
    }

    fn num_groups(&self, record: RecordId) -> Result<usize> {
        self.with_record(record, |r| r.groups.len())
    }

    fn push_group(&self, record: RecordId, group: ExtensibleGroup) -> Result<usize> {
        self.with_record_mut(record, |r| {
            r.groups.push(group);
            r.groups.len() - 1
        })
    }

    fn erase_group(&self, record: RecordId, index: usize) -> Result<bool> {
        self.with_record_mut(record, |r| {
            if index < r.groups.len() {
                r.groups.remove(index);
                true
            } else {
                false
            }
        })
    }

    fn clear_groups(&self, record: RecordId) -> Result<()> {
        self.with_record_mut(record, |r| r.groups.clear())
    }

    fn groups(&self, record: RecordId) -> Result<Vec<ExtensibleGroup>> {
        self.with_record(record, |r| r.groups.clone())
    }

    fn group(&self, record: RecordId, index: usize) -> Result<Option<ExtensibleGroup>> {
        self.with_record(record, |r| r.groups.get(index).cloned())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    fn zone_with_space(store: &MemoryStore) -> (EntityId, EntityId) {
        let zone = store.add_zone("Zone 1");
        let space = store.add_space("Space 1", Some(zone)).unwrap();
        (zone, space)
    }

    #[test]
    fn test_resolve_enclosing_zone_per_kind() {
        let store = MemoryStore::new();
        let (zone, space) = zone_with_space(&store);
        let wall = store.add_surface("Wall", space).unwrap();
        let window = store.add_sub_surface("Window", wall).unwrap();
        let mass = store.add_internal_mass("Furniture", space).unwrap();

        assert_eq!(store.resolve_enclosing_zone(wall), Some(zone));
        assert_eq!(store.resolve_enclosing_zone(window), Some(zone));
        assert_eq!(store.resolve_enclosing_zone(mass), Some(zone));
    }

    #[test]
    fn test_resolve_non_participants_and_unattached() {
        let store = MemoryStore::new();
        let (zone, space) = zone_with_space(&store);
        let orphan_space = store.add_space("Orphan", None).unwrap();
        let orphan_wall = store.add_surface("Orphan Wall", orphan_space).unwrap();

        assert_eq!(store.resolve_enclosing_zone(zone), None);
        assert_eq!(store.resolve_enclosing_zone(space), None);
        assert_eq!(store.resolve_enclosing_zone(orphan_wall), None);
        assert_eq!(store.resolve_enclosing_zone(EntityId(999)), None);
    }

    #[test]
    fn test_resolve_follows_space_reassignment() {
        let store = MemoryStore::new();
        let (zone, space) = zone_with_space(&store);
        let other = store.add_zone("Zone 2");
        let wall = store.add_surface("Wall", space).unwrap();

        store.set_space_zone(space, Some(other)).unwrap();
        assert_eq!(store.resolve_enclosing_zone(wall), Some(other));
        assert_ne!(store.resolve_enclosing_zone(wall), Some(zone));
    }

    #[test]
    fn test_resolve_rejects_wrong_parent_kind() {
        let store = MemoryStore::new();
        let (zone, _space) = zone_with_space(&store);
        // Surface hung directly off the zone skips the space hop
        let bogus = store.add_entity(EntityKind::Surface, "Bogus", Some(zone)).unwrap();
        assert_eq!(store.resolve_enclosing_zone(bogus), None);
    }

    #[test]
    fn test_builders_check_parent_kind() {
        let store = MemoryStore::new();
        let (zone, space) = zone_with_space(&store);
        assert!(store.add_surface("Wall", zone).is_err());
        assert!(store.add_sub_surface("Window", space).is_err());
        assert!(matches!(
            store.add_space("Space 2", Some(space)),
            Err(Error::InvalidZone { .. })
        ));
    }

    #[test]
    fn test_register_relation_once_per_zone() {
        let store = MemoryStore::new();
        let (zone, space) = zone_with_space(&store);

        let record = store.register_relation(zone, RelationConfig::default()).unwrap();
        assert_eq!(store.relation_of(zone), Some(record));
        assert_eq!(store.relation_zone(record), Some(zone));
        assert!(matches!(store.register_relation(zone, RelationConfig::default()), Err(Error::DuplicateRelation(z)) if z == zone));
        assert!(matches!(store.register_relation(space, RelationConfig::default()), Err(Error::InvalidZone { .. })));

        assert!(store.unregister_relation(record).unwrap());
        assert!(!store.has_relation(zone));
        assert!(!store.unregister_relation(record).unwrap());
        assert!(store.register_relation(zone, RelationConfig::default()).is_ok());
    }

    #[test]
    fn test_relation_config_stored_on_record() {
        let store = MemoryStore::new();
        let (zone, _) = zone_with_space(&store);
        let record = store.register_relation(zone, RelationConfig::strict()).unwrap();
        assert_eq!(store.relation_config(record).unwrap(), RelationConfig::strict());

        store.set_relation_config(record, RelationConfig::default()).unwrap();
        assert_eq!(store.relation_config(record).unwrap(), RelationConfig::default());

        store.unregister_relation(record).unwrap();
        assert!(matches!(store.relation_config(record), Err(Error::NotFound(_))));
        assert!(store.set_relation_config(record, RelationConfig::strict()).is_err());
    }

    #[test]
    fn test_group_crud_shifts_indices() {
        let store = MemoryStore::new();
        let (zone, _) = zone_with_space(&store);
        let record = store.register_relation(zone, RelationConfig::default()).unwrap();

        for i in 0..3 {
            let idx = store
                .push_group(record, smallvec![FieldValue::Real(i as f64)])
                .unwrap();
            assert_eq!(idx, i);
        }
        assert!(store.erase_group(record, 0).unwrap());
        assert!(!store.erase_group(record, 2).unwrap());

        let groups = store.groups(record).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0][0].as_real(), Some(1.0));
        assert_eq!(store.group(record, 1).unwrap().unwrap()[0].as_real(), Some(2.0));
        assert_eq!(store.group(record, 2).unwrap(), None);

        store.clear_groups(record).unwrap();
        assert_eq!(store.num_groups(record).unwrap(), 0);
    }

    #[test]
    fn test_remove_zone_drops_record() {
        let store = MemoryStore::new();
        let (zone, _) = zone_with_space(&store);
        let record = store.register_relation(zone, RelationConfig::default()).unwrap();

        assert!(store.remove_entity(zone));
        assert_eq!(store.relation_count(), 0);
        assert!(store.num_groups(record).is_err());
        assert!(!store.remove_entity(zone));
    }

    #[test]
    fn test_clones_share_state() {
        let store = MemoryStore::new();
        let other = store.clone();
        let zone = store.add_zone("Shared");
        assert_eq!(other.kind_of(zone), Some(EntityKind::Zone));
        other.rename(zone, "Renamed").unwrap();
        assert_eq!(store.entity(zone).unwrap().name, "Renamed");
        assert_eq!(store.entities_by_kind(EntityKind::Zone).len(), 1);
    }
}
