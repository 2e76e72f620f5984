//! Extensible groups — the repeated field blocks appended to a record.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::EntityId;

/// A single field value inside an extensible group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum FieldValue {
    /// Pointer field: a handle to another entity.
    Handle(EntityId),
    Real(f64),
}

impl FieldValue {
    pub fn as_handle(&self) -> Option<EntityId> {
        match self {
            FieldValue::Handle(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            FieldValue::Real(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<EntityId> for FieldValue {
    fn from(id: EntityId) -> Self {
        FieldValue::Handle(id)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Real(v)
    }
}

/// One extensible group. View factor groups carry exactly three fields,
/// so they never spill to the heap.
pub type ExtensibleGroup = SmallVec<[FieldValue; 3]>;

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn test_accessors_match_variant() {
        let group: ExtensibleGroup = smallvec![
            FieldValue::from(EntityId(3)),
            FieldValue::from(EntityId(4)),
            FieldValue::from(0.25),
        ];
        assert_eq!(group[0].as_handle(), Some(EntityId(3)));
        assert_eq!(group[1].as_real(), None);
        assert_eq!(group[2].as_real(), Some(0.25));
        assert_eq!(group[2].as_handle(), None);
        assert!(!group.spilled());
    }
}
