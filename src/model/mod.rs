//! # Building Model DTOs
//!
//! Clean DTOs for the slice of the building model the view factor relation
//! touches: entity handles and kinds, the extensible group field block, and
//! the view factor edge itself.
//!
//! Design rule: this module is pure data — no locks, no store access, no I/O.

pub mod entity;
pub mod group;
pub mod view_factor;

pub use entity::{Entity, EntityId, EntityKind, EntityRef, ParticipantKind, RecordId};
pub use group::{ExtensibleGroup, FieldValue};
pub use view_factor::{Endpoint, ViewFactor};
