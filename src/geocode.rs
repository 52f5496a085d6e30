//! # Geocode Orchestrator
//!
//! Turns a free-text query into a short list of search candidates through a
//! [`Geocoder`], and turns a chosen candidate into a waypoint.
//!
//! A search is two halves: [`GeocodeOrchestrator::begin_search`] validates the
//! query and takes a request ticket, [`GeocodeOrchestrator::complete_search`]
//! applies the service outcome if that ticket is still the latest. Two
//! overlapping searches therefore cannot let the older answer overwrite the
//! newer one, whatever order they complete in.

use log::{debug, info, warn};
use serde::Serialize;

use crate::request::{RequestTicket, RequestTracker};
use crate::storage::KeyValueStore;
use crate::store::{Waypoint, WaypointStore};
use crate::{Location, PlannerError, Result};

/// Default cap on candidates per search.
pub const DEFAULT_RESULT_LIMIT: u32 = 5;

/// One raw geocoder match.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeHit {
    pub display_name: Option<String>,
    pub lat: f64,
    pub lng: f64,
}

/// Address lookup service.
#[allow(async_fn_in_trait)]
pub trait Geocoder {
    /// Look up `query`, returning at most `limit` matches in ranking order.
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<GeocodeHit>>;
}

impl<T: Geocoder + ?Sized> Geocoder for &T {
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<GeocodeHit>> {
        (**self).search(query, limit).await
    }
}

/// A search result offered to the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchCandidate {
    /// Label shown in the list
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    /// Full address; becomes the waypoint name when chosen
    pub full_location: String,
}

impl SearchCandidate {
    fn from_hit(index: usize, hit: GeocodeHit) -> Self {
        let name = hit
            .display_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("位置 {}", index + 1));
        let full_location = hit.display_name.unwrap_or_else(|| name.clone());
        Self {
            name,
            lat: hit.lat,
            lng: hit.lng,
            full_location,
        }
    }
}

/// A search that has been issued but not yet applied.
#[derive(Debug, Clone)]
pub struct PendingSearch {
    pub ticket: RequestTicket,
    pub query: String,
    pub limit: u32,
}

/// Owns the pending candidate list.
#[derive(Debug)]
pub struct GeocodeOrchestrator {
    candidates: Vec<SearchCandidate>,
    requests: RequestTracker,
    result_limit: u32,
}

impl Default for GeocodeOrchestrator {
    fn default() -> Self {
        Self::new(DEFAULT_RESULT_LIMIT)
    }
}

impl GeocodeOrchestrator {
    pub fn new(result_limit: u32) -> Self {
        Self {
            candidates: Vec::new(),
            requests: RequestTracker::new(),
            result_limit: result_limit.max(1),
        }
    }

    pub fn candidates(&self) -> &[SearchCandidate] {
        &self.candidates
    }

    pub fn result_limit(&self) -> u32 {
        self.result_limit
    }

    /// Validate the query, drop the previous candidates and take a ticket.
    ///
    /// Blank queries never reach the service.
    pub fn begin_search<S: KeyValueStore>(
        &mut self,
        query: &str,
        store: &mut WaypointStore<S>,
    ) -> Result<PendingSearch> {
        let query = query.trim();
        if query.is_empty() {
            let err = PlannerError::EmptyQuery;
            store.report(&err);
            return Err(err);
        }

        self.candidates.clear();
        let ticket = self.requests.issue();
        debug!(
            "[GeocodeOrchestrator] Search #{} for '{}'",
            ticket.value(),
            query
        );

        Ok(PendingSearch {
            ticket,
            query: query.to_string(),
            limit: self.result_limit,
        })
    }

    /// Apply a geocoder outcome for a pending search.
    ///
    /// Outcomes for superseded searches are discarded without touching any
    /// state and return [`PlannerError::Superseded`].
    pub fn complete_search<S: KeyValueStore>(
        &mut self,
        pending: PendingSearch,
        outcome: Result<Vec<GeocodeHit>>,
        store: &mut WaypointStore<S>,
    ) -> Result<&[SearchCandidate]> {
        if let Err(e) = self.requests.check(pending.ticket) {
            debug!(
                "[GeocodeOrchestrator] Discarding stale result for '{}'",
                pending.query
            );
            return Err(e);
        }

        let hits = match outcome {
            Ok(hits) => hits,
            Err(e) => {
                warn!(
                    "[GeocodeOrchestrator] Search for '{}' failed: {}",
                    pending.query, e
                );
                self.candidates.clear();
                store.report(&e);
                return Err(e);
            }
        };

        if hits.is_empty() {
            info!("[GeocodeOrchestrator] No match for '{}'", pending.query);
            let err = PlannerError::NotFound {
                query: pending.query,
            };
            self.candidates.clear();
            store.report(&err);
            return Err(err);
        }

        self.candidates = hits
            .into_iter()
            .enumerate()
            .map(|(i, hit)| SearchCandidate::from_hit(i, hit))
            .collect();
        store.clear_status();
        info!(
            "[GeocodeOrchestrator] {} candidates for '{}'",
            self.candidates.len(),
            pending.query
        );

        Ok(&self.candidates)
    }

    /// Add the candidate at `index` as a waypoint named by its full address,
    /// then clear the candidate list.
    pub fn select_candidate<'s, S: KeyValueStore>(
        &mut self,
        index: usize,
        store: &'s mut WaypointStore<S>,
    ) -> Result<&'s [Waypoint]> {
        let Some(candidate) = self.candidates.get(index).cloned() else {
            let err = PlannerError::UnknownCandidate {
                index,
                available: self.candidates.len(),
            };
            store.report(&err);
            return Err(err);
        };

        let location = Location::new(candidate.full_location, candidate.lat, candidate.lng);
        if let Err(e) = store.add(location).map(|_| ()) {
            store.report(&e);
            return Err(e);
        }

        self.candidates.clear();
        store.clear_status();
        Ok(store.waypoints())
    }

    /// Drop the pending candidates.
    pub fn clear(&mut self) {
        self.candidates.clear();
    }
}
