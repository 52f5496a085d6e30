//! # Waypoint Store
//!
//! The ordered waypoint collection and the single source of truth for it.
//!
//! ## Ownership
//!
//! The store owns:
//! - The waypoint sequence (display order = route-request order)
//! - The selection set used for bulk removal
//! - The user-facing status line
//!
//! Every mutation of the sequence is written through the
//! [`WaypointRepository`] before the call returns, so memory and durable
//! storage never diverge. Selection changes are not persisted.
//!
//! Waypoints carry a synthetic [`WaypointId`] assigned at insertion. Selection
//! and removal key on that id, so two waypoints with the same name are still
//! independent.

use std::collections::BTreeSet;
use std::fmt;

use log::{debug, info};
use serde::Serialize;

use crate::error::OptionExt;
use crate::persistence::WaypointRepository;
use crate::status::StatusMessage;
use crate::storage::KeyValueStore;
use crate::{GpsPoint, Location, PlannerError, Result};

/// Stable identifier of a waypoint within one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct WaypointId(pub u64);

impl fmt::Display for WaypointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A location in the sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Waypoint {
    pub id: WaypointId,
    pub location: Location,
}

impl Waypoint {
    pub fn point(&self) -> GpsPoint {
        self.location.point()
    }
}

/// Ordered waypoint collection with selection and status.
#[derive(Debug)]
pub struct WaypointStore<S> {
    waypoints: Vec<Waypoint>,
    selection: BTreeSet<WaypointId>,
    status: Option<StatusMessage>,
    next_id: u64,
    /// Bumped on every successful change to the sequence
    revision: u64,
    repository: WaypointRepository<S>,
}

impl<S: KeyValueStore> WaypointStore<S> {
    /// Open a store, loading whatever the repository holds.
    pub fn open(repository: WaypointRepository<S>) -> Self {
        let locations = repository.load();
        info!(
            "[WaypointStore] Loaded {} waypoints from '{}'",
            locations.len(),
            repository.key()
        );

        let mut store = Self {
            waypoints: Vec::with_capacity(locations.len()),
            selection: BTreeSet::new(),
            status: None,
            next_id: 0,
            revision: 0,
            repository,
        };
        for location in locations {
            let id = store.allocate_id();
            store.waypoints.push(Waypoint { id, location });
        }
        store
    }

    fn allocate_id(&mut self) -> WaypointId {
        let id = WaypointId(self.next_id);
        self.next_id += 1;
        id
    }

    fn persist(&mut self) {
        let locations = self.locations();
        self.repository.save(&locations);
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn get(&self, id: WaypointId) -> Option<&Waypoint> {
        self.waypoints.iter().find(|w| w.id == id)
    }

    /// Locations in sequence order, as persisted.
    pub fn locations(&self) -> Vec<Location> {
        self.waypoints.iter().map(|w| w.location.clone()).collect()
    }

    /// Coordinates in sequence order.
    pub fn points(&self) -> Vec<GpsPoint> {
        self.waypoints.iter().map(Waypoint::point).collect()
    }

    pub fn selection(&self) -> &BTreeSet<WaypointId> {
        &self.selection
    }

    pub fn is_selected(&self, id: WaypointId) -> bool {
        self.selection.contains(&id)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn repository(&self) -> &WaypointRepository<S> {
        &self.repository
    }

    pub fn into_repository(self) -> WaypointRepository<S> {
        self.repository
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Append a location and persist. Returns the new sequence.
    pub fn add(&mut self, location: Location) -> Result<&[Waypoint]> {
        if !location.is_valid() {
            return Err(PlannerError::InvalidCoordinates {
                name: location.name,
                lat: location.lat,
                lng: location.lng,
            });
        }

        let id = self.allocate_id();
        debug!(
            "[WaypointStore] Adding {} '{}' ({:.5}, {:.5})",
            id, location.name, location.lat, location.lng
        );
        self.waypoints.push(Waypoint { id, location });
        self.revision += 1;
        self.persist();
        Ok(&self.waypoints)
    }

    /// Remove every selected waypoint and clear the selection.
    ///
    /// Survivors keep their relative order. Returns how many were removed.
    pub fn remove_selected(&mut self) -> usize {
        let before = self.waypoints.len();
        let selection = std::mem::take(&mut self.selection);
        self.waypoints.retain(|w| !selection.contains(&w.id));
        let removed = before - self.waypoints.len();

        if removed > 0 {
            self.revision += 1;
        }
        self.persist();
        info!(
            "[WaypointStore] Removed {} selected waypoints, {} remain",
            removed,
            self.waypoints.len()
        );
        removed
    }

    /// Empty the sequence and selection and erase the stored key.
    pub fn clear_all(&mut self) {
        if !self.waypoints.is_empty() {
            self.revision += 1;
        }
        self.waypoints.clear();
        self.selection.clear();
        self.repository.clear();
        info!("[WaypointStore] Cleared all waypoints");
    }

    /// Move the waypoint at `source` so it ends up at `destination`.
    ///
    /// Both indices refer to the current sequence and must be in range;
    /// otherwise nothing changes.
    pub fn reorder(&mut self, source: usize, destination: usize) -> Result<()> {
        let len = self.waypoints.len();
        self.waypoints.get(source).ok_or_out_of_range(source, len)?;
        self.waypoints
            .get(destination)
            .ok_or_out_of_range(destination, len)?;

        if source == destination {
            return Ok(());
        }

        let moved = self.waypoints.remove(source);
        debug!(
            "[WaypointStore] Moving '{}' from {} to {}",
            moved.location.name, source, destination
        );
        self.waypoints.insert(destination, moved);
        self.revision += 1;
        self.persist();
        Ok(())
    }

    /// Toggle selection of a waypoint. Returns whether it is now selected.
    pub fn toggle_selection(&mut self, id: WaypointId) -> Result<bool> {
        self.get(id).ok_or_unknown_waypoint(id.0)?;

        if self.selection.remove(&id) {
            Ok(false)
        } else {
            self.selection.insert(id);
            Ok(true)
        }
    }

    // ========================================================================
    // Status line
    // ========================================================================

    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    pub fn set_status(&mut self, status: StatusMessage) {
        debug!("[WaypointStore] Status: {:?}", status);
        self.status = Some(status);
    }

    /// Record an error in the status line using its user-facing text.
    pub fn report(&mut self, error: &PlannerError) {
        if error.is_user_visible() {
            self.set_status(StatusMessage::error(error.user_message()));
        }
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }
}
