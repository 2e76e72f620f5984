//! ViewFactor — a directed, weighted edge between two radiating elements.

use serde::{Deserialize, Serialize};

use super::{EntityRef, ParticipantKind};
use crate::{Error, Result};

/// Which end of a view factor an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Endpoint {
    From,
    To,
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::From => f.write_str("from"),
            Endpoint::To => f.write_str("to"),
        }
    }
}

/// A view factor from one surface, sub-surface or internal mass to another.
///
/// Construction validates the factor range and both endpoint kinds, so a
/// `ViewFactor` value is always well-formed. Zone membership is checked
/// later, when the edge is added to a relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewFactor {
    from: EntityRef,
    to: EntityRef,
    view_factor: f64,
}

impl ViewFactor {
    pub fn new(from: EntityRef, to: EntityRef, view_factor: f64) -> Result<Self> {
        // NaN fails the range check as well
        if !(0.0..=1.0).contains(&view_factor) {
            tracing::error!(view_factor, "Unable to create view factor, factor outside [0, 1]");
            return Err(Error::InvalidWeight(view_factor));
        }
        check_endpoint(&from, Endpoint::From)?;
        check_endpoint(&to, Endpoint::To)?;

        Ok(Self { from, to, view_factor })
    }

    pub fn from_surface(&self) -> &EntityRef {
        &self.from
    }

    pub fn to_surface(&self) -> &EntityRef {
        &self.to
    }

    pub fn view_factor(&self) -> f64 {
        self.view_factor
    }

    pub fn is_self_view(&self) -> bool {
        self.from.id == self.to.id
    }
}

fn check_endpoint(entity: &EntityRef, endpoint: Endpoint) -> Result<ParticipantKind> {
    ParticipantKind::try_from(entity.kind).map_err(|kind| {
        tracing::error!(
            %endpoint,
            entity = %entity.id,
            %kind,
            "Endpoint can be only of type Surface, SubSurface or InternalMass"
        );
        Error::InvalidEndpointType { endpoint, kind }
    })
}

impl std::fmt::Display for ViewFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "(from {}='{}', to {}='{}', view factor={})",
            self.from.kind, self.from.name, self.to.kind, self.to.name, self.view_factor
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntityId, EntityKind};

    fn wall() -> EntityRef {
        EntityRef::new(EntityId(1), EntityKind::Surface, "Wall")
    }

    fn window() -> EntityRef {
        EntityRef::new(EntityId(2), EntityKind::SubSurface, "Window")
    }

    #[test]
    fn test_bounds_inclusive() {
        assert!(ViewFactor::new(wall(), window(), 0.0).is_ok());
        assert!(ViewFactor::new(wall(), window(), 1.0).is_ok());
    }

    #[test]
    fn test_out_of_range_rejected() {
        for bad in [1.0 + 1e-12, 1.5, -0.01, f64::NAN, f64::INFINITY] {
            let err = ViewFactor::new(wall(), window(), bad).unwrap_err();
            assert!(matches!(err, Error::InvalidWeight(_)), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_endpoint_kind_reports_side() {
        let zone = EntityRef::new(EntityId(9), EntityKind::Zone, "Zone");
        match ViewFactor::new(zone.clone(), window(), 0.5) {
            Err(Error::InvalidEndpointType { endpoint, kind }) => {
                assert_eq!(endpoint, Endpoint::From);
                assert_eq!(kind, EntityKind::Zone);
            }
            other => panic!("expected InvalidEndpointType, got {other:?}"),
        }
        match ViewFactor::new(wall(), zone, 0.5) {
            Err(Error::InvalidEndpointType { endpoint, .. }) => assert_eq!(endpoint, Endpoint::To),
            other => panic!("expected InvalidEndpointType, got {other:?}"),
        }
    }

    #[test]
    fn test_display() {
        let vf = ViewFactor::new(wall(), window(), 0.5).unwrap();
        assert_eq!(vf.to_string(), "(from Surface='Wall', to SubSurface='Window', view factor=0.5)");
    }

    #[test]
    fn test_self_view_allowed_at_construction() {
        let vf = ViewFactor::new(wall(), wall(), 0.1).unwrap();
        assert!(vf.is_self_view());
    }
}
