//! # Planner Session
//!
//! One explicitly owned session object per user session. The presentation
//! shell forwards every user intent here, either by calling the methods
//! directly or by dispatching a [`Command`].
//!
//! The planner owns the waypoint store, both orchestrators, the selected
//! travel mode, the service clients and (optionally) the map renderer. After
//! every waypoint edit it refreshes the markers and keeps the "re-plan the
//! route" notice in step with [`Planner::is_route_stale`]. Routes are never
//! recomputed automatically.
//!
//! ## Requests in flight
//!
//! [`Planner::search`] and [`Planner::compute_route`] hold the session for
//! the whole request. A shell that must stay interactive while a request is
//! in flight uses the split form instead:
//!
//! 1. [`Planner::begin_search`] / [`Planner::begin_route`] validate and hand
//!    back a pending request
//! 2. the shell calls the service through its own handle (clients are cheap
//!    to clone, see [`Planner::geocoder`]) while the session keeps taking edits
//! 3. [`Planner::complete_search`] / [`Planner::complete_route`] apply the
//!    answer, unless a newer request was begun in the meantime

use log::info;
use serde::Deserialize;

use crate::geocode::{GeocodeHit, GeocodeOrchestrator, Geocoder, PendingSearch, SearchCandidate};
use crate::persistence::WaypointRepository;
use crate::routing::{
    MapRenderer, PendingRoute, Route, RouteCandidate, RouteOrchestrator, RoutingService,
};
use crate::status::{messages, StatusMessage};
use crate::storage::KeyValueStore;
use crate::store::{Waypoint, WaypointId, WaypointStore};
use crate::{Location, PlannerConfig, PlannerError, Result, TravelMode};

/// User intents the presentation shell can forward.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Add-by-search, step 1: look up candidates
    Search { query: String },
    /// Add-by-search, step 2: pick one candidate
    ChooseCandidate { index: usize },
    AddByMapClick {
        lat: f64,
        lng: f64,
        #[serde(default)]
        name: Option<String>,
    },
    RemoveSelected,
    ClearAll,
    ToggleSelection { id: u64 },
    Reorder { source: usize, destination: usize },
    SetTravelMode { mode: TravelMode },
    ComputeRoute,
}

/// A user session.
pub struct Planner<S, G, R> {
    store: WaypointStore<S>,
    geocoder: G,
    router: R,
    search: GeocodeOrchestrator,
    routes: RouteOrchestrator,
    renderer: Option<Box<dyn MapRenderer>>,
    mode: TravelMode,
}

impl<S, G, R> Planner<S, G, R>
where
    S: KeyValueStore,
    G: Geocoder,
    R: RoutingService,
{
    /// Start a session, loading the saved waypoints from `storage`.
    pub fn new(storage: S, geocoder: G, router: R, config: &PlannerConfig) -> Self {
        let repository = WaypointRepository::with_key(storage, config.storage_key.clone());
        let store = WaypointStore::open(repository);
        info!(
            "[Planner] Session started with {} saved waypoints",
            store.len()
        );

        Self {
            store,
            geocoder,
            router,
            search: GeocodeOrchestrator::new(config.result_limit),
            routes: RouteOrchestrator::new(),
            renderer: None,
            mode: TravelMode::default(),
        }
    }

    // ========================================================================
    // Renderer
    // ========================================================================

    /// Attach the map and draw the current markers on it.
    pub fn attach_renderer(&mut self, renderer: Box<dyn MapRenderer>) {
        self.renderer = Some(renderer);
        self.refresh_markers();
    }

    /// Detach the map, taking the live route off it first.
    pub fn detach_renderer(&mut self) -> Option<Box<dyn MapRenderer>> {
        self.routes.clear_route(self.renderer.as_deref_mut());
        self.renderer.take()
    }

    pub fn has_renderer(&self) -> bool {
        self.renderer.is_some()
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn store(&self) -> &WaypointStore<S> {
        &self.store
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        self.store.waypoints()
    }

    pub fn candidates(&self) -> &[SearchCandidate] {
        self.search.candidates()
    }

    pub fn active_route(&self) -> Option<&Route> {
        self.routes.active_route()
    }

    /// The geocoder client, for calling it outside the session.
    pub fn geocoder(&self) -> &G {
        &self.geocoder
    }

    /// The routing client, for calling it outside the session.
    pub fn router(&self) -> &R {
        &self.router
    }

    pub fn travel_mode(&self) -> TravelMode {
        self.mode
    }

    pub fn status(&self) -> Option<&StatusMessage> {
        self.store.status()
    }

    /// True when the route on the map was computed for a different
    /// sequence or travel mode than the current one.
    pub fn is_route_stale(&self) -> bool {
        self.routes.is_stale(&self.store)
            || self
                .routes
                .active_route()
                .is_some_and(|route| route.mode != self.mode)
    }

    /// End the session, returning the storage backend.
    pub fn into_storage(self) -> S {
        self.store.into_repository().into_storage()
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Look up candidates for `query`.
    pub async fn search(&mut self, query: &str) -> Result<&[SearchCandidate]> {
        let pending = self.begin_search(query)?;
        let outcome = self.geocoder.search(&pending.query, pending.limit).await;
        self.complete_search(pending, outcome)
    }

    /// Start a search; the previous candidates are dropped.
    pub fn begin_search(&mut self, query: &str) -> Result<PendingSearch> {
        self.search.begin_search(query, &mut self.store)
    }

    /// Apply the geocoder answer for `pending`.
    pub fn complete_search(
        &mut self,
        pending: PendingSearch,
        outcome: Result<Vec<GeocodeHit>>,
    ) -> Result<&[SearchCandidate]> {
        self.search.complete_search(pending, outcome, &mut self.store)?;
        self.sync_stale_notice();
        Ok(self.search.candidates())
    }

    /// Add the search candidate at `index` as a waypoint.
    pub fn choose_candidate(&mut self, index: usize) -> Result<()> {
        self.search.select_candidate(index, &mut self.store)?;
        self.after_edit();
        Ok(())
    }

    /// Add a waypoint where the map was clicked.
    pub fn add_by_map_click(&mut self, lat: f64, lng: f64, name: Option<String>) -> Result<()> {
        let location = Location::with_optional_name(name, lat, lng);
        if let Err(e) = self.store.add(location).map(|_| ()) {
            self.store.report(&e);
            return Err(e);
        }
        self.after_edit();
        Ok(())
    }

    pub fn remove_selected(&mut self) -> usize {
        let removed = self.store.remove_selected();
        self.after_edit();
        removed
    }

    pub fn clear_all(&mut self) {
        self.store.clear_all();
        self.after_edit();
    }

    pub fn toggle_selection(&mut self, id: WaypointId) -> Result<bool> {
        let result = self.store.toggle_selection(id);
        if let Err(e) = &result {
            self.store.report(e);
        }
        result
    }

    /// Drag-and-drop: move the row at `source` to `destination`.
    pub fn reorder(&mut self, source: usize, destination: usize) -> Result<()> {
        if let Err(e) = self.store.reorder(source, destination) {
            self.store.report(&e);
            return Err(e);
        }
        self.after_edit();
        Ok(())
    }

    /// Select the travel mode for the next route request.
    pub fn set_travel_mode(&mut self, mode: TravelMode) {
        if self.mode != mode {
            info!("[Planner] Travel mode {} -> {}", self.mode, mode);
            self.mode = mode;
            self.sync_stale_notice();
        }
    }

    /// Request a route through the current waypoints and draw it.
    pub async fn compute_route(&mut self) -> Result<&Route> {
        let pending = self.begin_route()?;
        let outcome = self.router.route(&pending.points, pending.mode).await;
        self.complete_route(pending, outcome)
    }

    /// Start a route request for the current sequence and travel mode.
    pub fn begin_route(&mut self) -> Result<PendingRoute> {
        let render_target_available = self.renderer.is_some();
        self.routes.begin_route(&mut self.store, self.mode, render_target_available)
    }

    /// Apply the routing answer for `pending` and draw it.
    ///
    /// If the waypoints or the travel mode changed while the request was in
    /// flight, the new route is drawn but immediately reported as stale.
    pub fn complete_route(
        &mut self,
        pending: PendingRoute,
        outcome: Result<Vec<RouteCandidate>>,
    ) -> Result<&Route> {
        self.routes.complete_route(
            pending,
            outcome,
            &mut self.store,
            self.renderer.as_deref_mut(),
        )?;
        self.sync_stale_notice();
        self.routes.active_route().ok_or(PlannerError::NoRoute)
    }

    /// Dispatch one shell command.
    pub async fn handle(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Search { query } => self.search(&query).await.map(|_| ()),
            Command::ChooseCandidate { index } => self.choose_candidate(index),
            Command::AddByMapClick { lat, lng, name } => self.add_by_map_click(lat, lng, name),
            Command::RemoveSelected => {
                self.remove_selected();
                Ok(())
            }
            Command::ClearAll => {
                self.clear_all();
                Ok(())
            }
            Command::ToggleSelection { id } => self.toggle_selection(WaypointId(id)).map(|_| ()),
            Command::Reorder {
                source,
                destination,
            } => self.reorder(source, destination),
            Command::SetTravelMode { mode } => {
                self.set_travel_mode(mode);
                Ok(())
            }
            Command::ComputeRoute => self.compute_route().await.map(|_| ()),
        }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn after_edit(&mut self) {
        self.refresh_markers();
        self.sync_stale_notice();
    }

    fn refresh_markers(&mut self) {
        if let Some(renderer) = self.renderer.as_deref_mut() {
            renderer.show_markers(self.store.waypoints());
        }
    }

    /// Post the re-plan notice while the route is stale; take it down once
    /// it is not. Other messages are left alone.
    fn sync_stale_notice(&mut self) {
        let showing = self
            .store
            .status()
            .is_some_and(|s| s.text == messages::ROUTE_STALE);

        if self.is_route_stale() {
            if !showing {
                self.store
                    .set_status(StatusMessage::notice(messages::ROUTE_STALE));
            }
        } else if showing {
            self.store.clear_status();
        }
    }
}
