//! Entities of the building model: zones, spaces and the radiating elements.

use serde::{Deserialize, Serialize};

/// Opaque entity handle. Allocated by the store, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque handle of a record carrying extensible groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(pub u64);

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Concrete kind of an entity, as classified by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Zone,
    Space,
    Surface,
    SubSurface,
    InternalMass,
    /// Anything else the host model knows about (constructions, schedules, ...).
    Other,
}

impl EntityKind {
    /// IDD-style object name, as it appears in logs and exported IDF.
    pub fn object_name(&self) -> &'static str {
        match self {
            EntityKind::Zone => "Zone",
            EntityKind::Space => "Space",
            EntityKind::Surface => "Surface",
            EntityKind::SubSurface => "SubSurface",
            EntityKind::InternalMass => "InternalMass",
            EntityKind::Other => "Other",
        }
    }

    pub fn is_participant(&self) -> bool {
        ParticipantKind::try_from(*self).is_ok()
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.object_name())
    }
}

/// The closed set of kinds that may sit at either end of a view factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParticipantKind {
    Surface,
    SubSurface,
    InternalMass,
}

impl ParticipantKind {
    pub const ALL: [ParticipantKind; 3] = [
        ParticipantKind::Surface,
        ParticipantKind::SubSurface,
        ParticipantKind::InternalMass,
    ];

    /// The chain of parent kinds walked to reach the enclosing zone.
    ///
    /// A sub-surface hangs off its base surface; surfaces and internal mass
    /// hang off a space; the space points at its zone.
    pub fn zone_path(&self) -> &'static [EntityKind] {
        match self {
            ParticipantKind::SubSurface => &[EntityKind::Surface, EntityKind::Space, EntityKind::Zone],
            ParticipantKind::Surface | ParticipantKind::InternalMass => {
                &[EntityKind::Space, EntityKind::Zone]
            }
        }
    }
}

impl TryFrom<EntityKind> for ParticipantKind {
    type Error = EntityKind;

    fn try_from(kind: EntityKind) -> std::result::Result<Self, EntityKind> {
        match kind {
            EntityKind::Surface => Ok(ParticipantKind::Surface),
            EntityKind::SubSurface => Ok(ParticipantKind::SubSurface),
            EntityKind::InternalMass => Ok(ParticipantKind::InternalMass),
            other => Err(other),
        }
    }
}

impl From<ParticipantKind> for EntityKind {
    fn from(kind: ParticipantKind) -> Self {
        match kind {
            ParticipantKind::Surface => EntityKind::Surface,
            ParticipantKind::SubSurface => EntityKind::SubSurface,
            ParticipantKind::InternalMass => EntityKind::InternalMass,
        }
    }
}

/// An entity record as held by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub name: String,
    /// Space for surfaces and internal mass, base surface for sub-surfaces,
    /// zone for spaces. `None` for zones and unattached entities.
    pub parent: Option<EntityId>,
}

impl Entity {
    pub fn new(id: EntityId, kind: EntityKind, name: impl Into<String>) -> Self {
        Self { id, kind, name: name.into(), parent: None }
    }

    pub fn to_ref(&self) -> EntityRef {
        EntityRef { id: self.id, kind: self.kind, name: self.name.clone() }
    }
}

/// A borrowed view of an entity: handle, kind tag and a name snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: EntityId,
    pub kind: EntityKind,
    pub name: String,
}

impl EntityRef {
    pub fn new(id: EntityId, kind: EntityKind, name: impl Into<String>) -> Self {
        Self { id, kind, name: name.into() }
    }

    pub fn participant_kind(&self) -> Option<ParticipantKind> {
        ParticipantKind::try_from(self.kind).ok()
    }

    /// `Surface 'Wall 1'`-style description for log lines.
    pub fn brief_description(&self) -> String {
        format!("{} '{}'", self.kind, self.name)
    }
}
