//! # User View Factors Relation
//!
//! The ordered, validated collection of view factors attached to one zone.
//! The edges live in the store as extensible groups on the zone's user view
//! factors record, three fields per group:
//!
//! ```text
//! [ Handle(from) | Handle(to) | Real(view factor) ]
//! ```
//!
//! Every edge is checked on the way in: both endpoints must resolve to the
//! owning zone. Nothing is re-validated afterwards, but reads fail as a whole
//! if any stored handle has gone stale.

use smallvec::smallvec;

use crate::config::{RelationConfig, SUM_TOLERANCE};
use crate::model::*;
use crate::storage::EntityStore;
use crate::{Error, Result};

/// IDD object name of the user view factors record.
pub const IDD_OBJECT_NAME: &str = "ZoneProperty:UserViewFactors:BySurfaceName";

const FROM_FIELD: usize = 0;
const TO_FIELD: usize = 1;
const VIEW_FACTOR_FIELD: usize = 2;

/// Handle onto the user view factors record of a zone.
///
/// Deliberately not `Clone`: a zone owns exactly one record, so a second
/// handle can only be obtained through [`ViewFactorRelation::for_zone`].
pub struct ViewFactorRelation<S: EntityStore> {
    store: S,
    record: RecordId,
    zone: EntityId,
}

impl<S: EntityStore> ViewFactorRelation<S> {
    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Create the user view factors record for `zone`.
    ///
    /// Fails with `DuplicateRelation` if the zone already has one; use
    /// [`ViewFactorRelation::for_zone`] to get at it instead.
    pub fn new(store: S, zone: EntityId) -> Result<Self> {
        Self::with_config(store, zone, RelationConfig::default())
    }

    pub fn with_config(store: S, zone: EntityId, config: RelationConfig) -> Result<Self> {
        let record = store.register_relation(zone, config).inspect_err(|e| {
            tracing::error!(%zone, error = %e, "Cannot create {IDD_OBJECT_NAME}");
        })?;
        tracing::debug!(%zone, %record, "created {IDD_OBJECT_NAME}");
        Ok(Self { store, record, zone })
    }

    /// The record already registered against `zone`, if any. The handle
    /// enforces the policy stored on the record.
    pub fn for_zone(store: S, zone: EntityId) -> Option<Self> {
        let record = store.relation_of(zone)?;
        Some(Self { store, record, zone })
    }

    /// The zone's record, created with the default policy on first use.
    pub fn get_or_create(store: S, zone: EntityId) -> Result<Self> {
        match store.relation_of(zone) {
            Some(record) => Ok(Self { store, record, zone }),
            None => Self::new(store, zone),
        }
    }

    /// Always fails: a clone would either be a second record for the same
    /// zone or an orphan with no zone. Create a fresh relation against the
    /// target zone and re-add the edges instead.
    pub fn try_clone(&self) -> Result<Self> {
        tracing::error!(
            zone = %self.zone,
            "Cloning isn't allowed for {IDD_OBJECT_NAME}: every record needs a zone, and a zone has only one record"
        );
        Err(Error::CloneNotAllowed(self.zone))
    }

    /// Delete the record. The zone may get a new one afterwards.
    pub fn remove(self) -> Result<()> {
        let existed = self.store.unregister_relation(self.record)?;
        if existed {
            tracing::debug!(zone = %self.zone, record = %self.record, "removed {IDD_OBJECT_NAME}");
        } else {
            tracing::warn!(zone = %self.zone, record = %self.record, "{IDD_OBJECT_NAME} was already removed");
        }
        Ok(())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn thermal_zone(&self) -> EntityId {
        self.zone
    }

    pub fn record_id(&self) -> RecordId {
        self.record
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The validation policy stored on the record.
    pub fn config(&self) -> Result<RelationConfig> {
        self.store.relation_config(self.record)
    }

    /// Replace the record's policy. Every handle onto the record sees it.
    /// Edges already stored are not re-checked.
    pub fn set_config(&mut self, config: RelationConfig) -> Result<()> {
        self.store.set_relation_config(self.record, config)
    }

    /// `ZoneProperty:UserViewFactors:BySurfaceName for Zone 'Zone 1'`.
    pub fn brief_description(&self) -> String {
        match self.store.entity_ref(self.zone) {
            Some(zone) => format!("{IDD_OBJECT_NAME} for {}", zone.brief_description()),
            None => format!("{IDD_OBJECT_NAME} for zone {}", self.zone),
        }
    }

    // ========================================================================
    // Insertion
    // ========================================================================

    /// Append one view factor.
    ///
    /// `from` is checked before `to`, and the first endpoint outside the zone
    /// is reported. Nothing is written unless every check passes.
    pub fn add_view_factor(&mut self, view_factor: &ViewFactor) -> Result<()> {
        self.check_in_zone(view_factor.from_surface(), Endpoint::From)?;
        self.check_in_zone(view_factor.to_surface(), Endpoint::To)?;

        let config = self
            .store
            .relation_config(self.record)
            .map_err(|e| self.record_unavailable(view_factor, e))?;

        if !config.allow_self_view && view_factor.is_self_view() {
            tracing::error!(%view_factor, "Cannot add self view factor to {}", self.brief_description());
            return Err(Error::SelfViewFactor(view_factor.from_surface().id));
        }

        if config.enforce_source_sum {
            let from = view_factor.from_surface().id;
            let outgoing = self
                .outgoing_sum(from)
                .map_err(|e| self.record_unavailable(view_factor, e))?;
            let sum = outgoing + view_factor.view_factor();
            if sum > 1.0 + SUM_TOLERANCE {
                tracing::error!(%view_factor, sum, "Cannot add view factor to {}: outgoing sum above 1", self.brief_description());
                return Err(Error::SourceSumExceeded { entity: from, sum });
            }
        }

        let group: ExtensibleGroup = smallvec![
            FieldValue::Handle(view_factor.from_surface().id),
            FieldValue::Handle(view_factor.to_surface().id),
            FieldValue::Real(view_factor.view_factor()),
        ];
        let index = self
            .store
            .push_group(self.record, group)
            .map_err(|e| self.record_unavailable(view_factor, e))?;

        tracing::debug!(%view_factor, index, zone = %self.zone, "added view factor");
        Ok(())
    }

    /// Any store failure on the record after the endpoints were validated.
    fn record_unavailable(&self, view_factor: &ViewFactor, e: Error) -> Error {
        tracing::error!(%view_factor, error = %e, "Unable to write view factor group to {}", self.brief_description());
        Error::InvariantViolation(format!(
            "record {} refused a validated view factor group: {e}",
            self.record
        ))
    }

    /// Build and append a view factor from two handles.
    ///
    /// Both handles are classified through the store, so any pairing of
    /// surface, sub-surface and internal mass is accepted.
    pub fn add_view_factor_between(&mut self, from: EntityId, to: EntityId, value: f64) -> Result<()> {
        let from = self
            .store
            .entity_ref(from)
            .ok_or_else(|| Error::NotFound(format!("from surface {from}")))?;
        let to = self
            .store
            .entity_ref(to)
            .ok_or_else(|| Error::NotFound(format!("to surface {to}")))?;
        let view_factor = ViewFactor::new(from, to, value)?;
        self.add_view_factor(&view_factor)
    }

    /// Append each view factor in order, skipping the ones that fail.
    ///
    /// Returns true only if every one was added.
    pub fn add_view_factors(&mut self, view_factors: &[ViewFactor]) -> bool {
        let mut all_added = true;
        for view_factor in view_factors {
            if let Err(e) = self.add_view_factor(view_factor) {
                tracing::error!(
                    %view_factor,
                    error = %e,
                    "Could not add view factor to {}. Continuing with others.",
                    self.brief_description()
                );
                all_added = false;
            }
        }
        all_added
    }

    fn check_in_zone(&self, entity: &EntityRef, endpoint: Endpoint) -> Result<()> {
        if self.store.resolve_enclosing_zone(entity.id) == Some(self.zone) {
            return Ok(());
        }
        tracing::error!(
            %endpoint,
            entity = %entity.brief_description(),
            "Cannot add view factor to {}: {endpoint} surface is not part of the zone",
            self.brief_description()
        );
        Err(Error::EndpointNotInZone { endpoint, entity: entity.id, zone: self.zone })
    }

    // ========================================================================
    // Removal
    // ========================================================================

    /// Remove the view factor at `index`; later ones shift down by one.
    /// Returns false if `index` is out of range.
    pub fn remove_view_factor(&mut self, index: usize) -> bool {
        match self.store.erase_group(self.record, index) {
            Ok(removed) => {
                if removed {
                    tracing::debug!(index, zone = %self.zone, "removed view factor");
                }
                removed
            }
            Err(e) => {
                tracing::error!(index, error = %e, "Could not remove view factor from {}", self.brief_description());
                false
            }
        }
    }

    pub fn remove_all_view_factors(&mut self) {
        if let Err(e) = self.store.clear_groups(self.record) {
            tracing::error!(error = %e, "Could not clear view factors of {}", self.brief_description());
        }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub fn num_view_factors(&self) -> usize {
        self.store.num_groups(self.record).unwrap_or_else(|e| {
            tracing::warn!(record = %self.record, error = %e, "could not count view factor groups");
            0
        })
    }

    /// All view factors in insertion order, or an empty vector if any of
    /// them no longer resolves.
    pub fn view_factors(&self) -> Vec<ViewFactor> {
        self.try_view_factors().unwrap_or_else(|e| {
            tracing::error!(error = %e, "Could not read view factors of {}", self.brief_description());
            Vec::new()
        })
    }

    /// All view factors in insertion order. Fails with `StaleReference` on
    /// the first group that no longer resolves.
    pub fn try_view_factors(&self) -> Result<Vec<ViewFactor>> {
        self.store
            .groups(self.record)?
            .iter()
            .enumerate()
            .map(|(index, group)| self.decode_group(index, group))
            .collect()
    }

    /// The view factor at `index`, if it exists and resolves.
    pub fn view_factor(&self, index: usize) -> Option<ViewFactor> {
        let group = self.store.group(self.record, index).ok()??;
        self.decode_group(index, &group).ok()
    }

    /// Sum of the view factors currently leaving `from`.
    pub fn outgoing_sum(&self, from: EntityId) -> Result<f64> {
        Ok(self
            .store
            .groups(self.record)?
            .iter()
            .filter(|g| g.get(FROM_FIELD).and_then(FieldValue::as_handle) == Some(from))
            .filter_map(|g| g.get(VIEW_FACTOR_FIELD).and_then(FieldValue::as_real))
            .sum())
    }

    fn decode_group(&self, index: usize, group: &ExtensibleGroup) -> Result<ViewFactor> {
        let from = self.resolve_handle(index, group, FROM_FIELD, "from surface")?;
        let to = self.resolve_handle(index, group, TO_FIELD, "to surface")?;
        let value = group
            .get(VIEW_FACTOR_FIELD)
            .and_then(FieldValue::as_real)
            .ok_or_else(|| Error::StaleReference {
                group: index,
                message: "could not retrieve view factor".into(),
            })?;
        ViewFactor::new(from, to, value)
    }

    fn resolve_handle(
        &self,
        index: usize,
        group: &ExtensibleGroup,
        field: usize,
        what: &str,
    ) -> Result<EntityRef> {
        let handle = group
            .get(field)
            .and_then(FieldValue::as_handle)
            .ok_or_else(|| Error::StaleReference {
                group: index,
                message: format!("could not retrieve {what}"),
            })?;
        self.store.entity_ref(handle).ok_or_else(|| Error::StaleReference {
            group: index,
            message: format!("{what} {handle} no longer exists"),
        })
    }
}

impl<S: EntityStore> std::fmt::Debug for ViewFactorRelation<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewFactorRelation")
            .field("record", &self.record)
            .field("zone", &self.zone)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
