//! # zone-view-factors — User View Factors for Thermal Zones
//!
//! A typed, validated ordered relation between the radiating elements of a
//! thermal zone, stored as extensible groups on a single per-zone record.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `EntityStore` is the contract between the relation and
//!    whatever object model hosts the zones, surfaces and records
//! 2. **Clean DTOs**: `EntityRef`, `ViewFactor`, `ExtensibleGroup` cross all boundaries
//! 3. **Handles, not owners**: the relation never owns entity lifetime
//! 4. **Validate on the way in**: a malformed edge can't be constructed, and an
//!    edge whose endpoints live in another zone can't be stored
//!
//! ## Quick Start
//!
//! ```rust
//! use zone_view_factors::{MemoryStore, ViewFactor, ViewFactorRelation};
//! use zone_view_factors::storage::EntityStore;
//!
//! # fn example() -> zone_view_factors::Result<()> {
//! let store = MemoryStore::new();
//! let zone = store.add_zone("Zone 1");
//! let space = store.add_space("Space 1", Some(zone))?;
//! let wall = store.add_surface("Wall 1", space)?;
//! let window = store.add_sub_surface("Window 1", wall)?;
//!
//! let mut relation = ViewFactorRelation::new(store.clone(), zone)?;
//! let from = store.entity_ref(wall).expect("wall exists");
//! let to = store.entity_ref(window).expect("window exists");
//! relation.add_view_factor(&ViewFactor::new(from, to, 0.5)?)?;
//!
//! assert_eq!(relation.num_view_factors(), 1);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! ## Stores
//!
//! | Store | Module | Description |
//! |-------|--------|-------------|
//! | `MemoryStore` | `storage::memory` | In-memory object model for embedding and testing |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod storage;
pub mod relation;
pub mod config;
pub mod export;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    Endpoint, Entity, EntityId, EntityKind, EntityRef, ExtensibleGroup, FieldValue,
    ParticipantKind, RecordId, ViewFactor,
};

// ============================================================================
// Re-exports: Storage, relation, config
// ============================================================================

pub use storage::{EntityStore, MemoryStore};
pub use relation::ViewFactorRelation;
pub use config::RelationConfig;
pub use export::{export_idf, export_idf_string};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid view factor {0}: must be within [0, 1]")]
    InvalidWeight(f64),

    #[error("Invalid {endpoint} endpoint: expected Surface, SubSurface or InternalMass, got {kind}")]
    InvalidEndpointType { endpoint: Endpoint, kind: EntityKind },

    #[error("{endpoint} endpoint {entity} is not part of zone {zone}")]
    EndpointNotInZone { endpoint: Endpoint, entity: EntityId, zone: EntityId },

    #[error("Zone {0} already has a user view factors record")]
    DuplicateRelation(EntityId),

    #[error("Stale reference in extensible group {group}: {message}")]
    StaleReference { group: usize, message: String },

    #[error("Entity {entity} is a {kind}, not a Zone")]
    InvalidZone { entity: EntityId, kind: EntityKind },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Cloning a user view factors record is not allowed: zone {0} must keep exactly one")]
    CloneNotAllowed(EntityId),

    #[error("Self view factor on entity {0} is not allowed by the relation config")]
    SelfViewFactor(EntityId),

    #[error("View factors leaving entity {entity} would sum to {sum}, above 1")]
    SourceSumExceeded { entity: EntityId, sum: f64 },

    #[error("Cannot write '{value}' as IDF field {field}: names may not contain ',', ';' or '!'")]
    InvalidIdfField { field: String, value: String },

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the error is a caller-input error the caller can correct.
    ///
    /// `InvariantViolation` is never recoverable: it means the store refused
    /// a write that had already passed validation.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Error::InvariantViolation(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
