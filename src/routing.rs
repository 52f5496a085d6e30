//! # Route Orchestrator
//!
//! Turns the current waypoint sequence plus a travel mode into one request to
//! a [`RoutingService`], decodes the returned polyline and keeps exactly one
//! route on the map.
//!
//! ## Rules
//!
//! - Fewer than two waypoints, or no render target: no request is made
//! - A new route retires the previous layer before its own layer is added
//! - A failed or empty answer leaves the previous route where it is
//! - Editing the waypoints does not recompute the route; [`RouteOrchestrator::is_stale`]
//!   reports when the live route no longer matches the sequence

use log::{debug, info, warn};
use serde::Serialize;

use crate::geo_utils::path_length;
use crate::request::{RequestTicket, RequestTracker};
use crate::status::{messages, StatusMessage};
use crate::storage::KeyValueStore;
use crate::store::{Waypoint, WaypointStore};
use crate::{Bounds, GpsPoint, PlannerError, Result, TravelMode};

/// Minimum number of waypoints a route request needs.
pub const MIN_ROUTE_WAYPOINTS: usize = 2;

/// Precision of OSRM `geometries=polyline` output.
pub const POLYLINE_PRECISION: u32 = 5;

/// Handle of a layer drawn by a [`MapRenderer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct LayerId(pub u64);

/// Map drawing surface.
pub trait MapRenderer {
    /// Draw a polyline and return its layer handle.
    fn add_route_layer(&mut self, points: &[GpsPoint]) -> LayerId;

    /// Remove a previously added layer.
    fn remove_layer(&mut self, layer: LayerId);

    /// Move the view so `bounds` is fully visible.
    fn fit_bounds(&mut self, bounds: &Bounds);

    /// Redraw waypoint markers.
    fn show_markers(&mut self, _waypoints: &[Waypoint]) {}
}

/// One route as returned by the service, geometry still encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteCandidate {
    pub geometry: String,
    /// Meters
    pub distance: Option<f64>,
    /// Seconds
    pub duration: Option<f64>,
}

/// Path computation service.
#[allow(async_fn_in_trait)]
pub trait RoutingService {
    /// Route through `points` in order. An empty list means no route exists.
    async fn route(&self, points: &[GpsPoint], mode: TravelMode) -> Result<Vec<RouteCandidate>>;
}

impl<T: RoutingService + ?Sized> RoutingService for &T {
    async fn route(&self, points: &[GpsPoint], mode: TravelMode) -> Result<Vec<RouteCandidate>> {
        (**self).route(points, mode).await
    }
}

/// Decode an encoded polyline into points.
pub fn decode_geometry(encoded: &str) -> Result<Vec<GpsPoint>> {
    let line = polyline::decode_polyline(encoded, POLYLINE_PRECISION).map_err(|e| {
        PlannerError::Decode {
            message: e.to_string(),
        }
    })?;

    Ok(line
        .0
        .into_iter()
        .map(|c| GpsPoint::new(c.y, c.x))
        .collect())
}

/// The computed route currently on the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    pub points: Vec<GpsPoint>,
    pub mode: TravelMode,
    pub bounds: Bounds,
    /// Meters (service-reported, else measured along the path)
    pub distance: f64,
    /// Seconds, when the service reports it
    pub duration: Option<f64>,
    /// Store revision the route was computed from
    pub revision: u64,
}

impl Route {
    /// Decode a service candidate into a route.
    pub fn from_candidate(
        candidate: RouteCandidate,
        mode: TravelMode,
        revision: u64,
    ) -> Result<Self> {
        let points = decode_geometry(&candidate.geometry)?;
        let bounds = Bounds::from_points(&points).ok_or_else(|| PlannerError::Decode {
            message: "route geometry has no points".to_string(),
        })?;
        let distance = candidate
            .distance
            .unwrap_or_else(|| path_length(&points));

        Ok(Self {
            points,
            mode,
            bounds,
            distance,
            duration: candidate.duration,
            revision,
        })
    }
}

/// A route request that has been issued but not yet applied.
#[derive(Debug, Clone)]
pub struct PendingRoute {
    pub ticket: RequestTicket,
    pub points: Vec<GpsPoint>,
    pub mode: TravelMode,
    pub revision: u64,
}

#[derive(Debug)]
struct ActiveRoute {
    layer: LayerId,
    route: Route,
}

/// Owns the single live route.
#[derive(Debug, Default)]
pub struct RouteOrchestrator {
    active: Option<ActiveRoute>,
    requests: RequestTracker,
}

fn failure_message(error: &PlannerError) -> &'static str {
    match error {
        PlannerError::NoRoute => messages::ROUTE_NOT_FOUND,
        PlannerError::Transport { .. } | PlannerError::Decode { .. } => {
            messages::ROUTE_REQUEST_FAILED
        }
        other => other.user_message(),
    }
}

impl RouteOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_route(&self) -> Option<&Route> {
        self.active.as_ref().map(|a| &a.route)
    }

    pub fn active_layer(&self) -> Option<LayerId> {
        self.active.as_ref().map(|a| a.layer)
    }

    /// True when a route is live but the waypoints changed since it was computed.
    pub fn is_stale<S: KeyValueStore>(&self, store: &WaypointStore<S>) -> bool {
        self.active
            .as_ref()
            .is_some_and(|a| a.route.revision != store.revision())
    }

    /// Check preconditions and take a ticket. No request is made on failure.
    pub fn begin_route<S: KeyValueStore>(
        &mut self,
        store: &mut WaypointStore<S>,
        mode: TravelMode,
        render_target_available: bool,
    ) -> Result<PendingRoute> {
        if store.len() < MIN_ROUTE_WAYPOINTS {
            let err = PlannerError::InsufficientWaypoints {
                waypoint_count: store.len(),
                minimum_required: MIN_ROUTE_WAYPOINTS,
            };
            store.report(&err);
            return Err(err);
        }

        if !render_target_available {
            let err = PlannerError::RenderTargetUnavailable;
            store.report(&err);
            return Err(err);
        }

        let ticket = self.requests.issue();
        debug!(
            "[RouteOrchestrator] Route #{} ({}) through {} waypoints",
            ticket.value(),
            mode,
            store.len()
        );

        Ok(PendingRoute {
            ticket,
            points: store.points(),
            mode,
            revision: store.revision(),
        })
    }

    /// Apply a routing outcome: decode, retire the old layer, draw, fit.
    ///
    /// Outcomes for superseded requests are discarded without touching any
    /// state and return [`PlannerError::Superseded`].
    pub fn complete_route<S: KeyValueStore, M: MapRenderer + ?Sized>(
        &mut self,
        pending: PendingRoute,
        outcome: Result<Vec<RouteCandidate>>,
        store: &mut WaypointStore<S>,
        renderer: Option<&mut M>,
    ) -> Result<&Route> {
        if let Err(e) = self.requests.check(pending.ticket) {
            debug!(
                "[RouteOrchestrator] Discarding stale route #{}",
                pending.ticket.value()
            );
            return Err(e);
        }

        let decoded = outcome.and_then(|candidates| {
            let first = candidates.into_iter().next().ok_or(PlannerError::NoRoute)?;
            Route::from_candidate(first, pending.mode, pending.revision)
        });

        let route = match decoded {
            Ok(route) => route,
            Err(e) => {
                warn!("[RouteOrchestrator] Route request failed: {}", e);
                store.set_status(StatusMessage::error(failure_message(&e)));
                return Err(e);
            }
        };

        let Some(renderer) = renderer else {
            let err = PlannerError::RenderTargetUnavailable;
            store.report(&err);
            return Err(err);
        };

        if let Some(previous) = self.active.take() {
            debug!("[RouteOrchestrator] Retiring layer {:?}", previous.layer);
            renderer.remove_layer(previous.layer);
        }

        let layer = renderer.add_route_layer(&route.points);
        renderer.fit_bounds(&route.bounds);
        store.clear_status();

        info!(
            "[RouteOrchestrator] Route ({}) with {} points, {:.0}m",
            route.mode,
            route.points.len(),
            route.distance
        );

        let active = self.active.insert(ActiveRoute { layer, route });
        Ok(&active.route)
    }

    /// Take the live route off the map.
    pub fn clear_route<M: MapRenderer + ?Sized>(&mut self, renderer: Option<&mut M>) {
        if let Some(previous) = self.active.take() {
            if let Some(renderer) = renderer {
                renderer.remove_layer(previous.layer);
            }
            debug!("[RouteOrchestrator] Cleared route");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::WaypointRepository;
    use crate::storage::MemoryStore;
    use crate::Location;

    const A_TO_B: &str = "otwwC_e}dVo}@_|B";
    const VIA_MID: &str = "otwwC_e}dVg^o}@g^o}@";

    #[derive(Default)]
    struct Canvas {
        next: u64,
        layers: Vec<LayerId>,
        fitted: Vec<Bounds>,
    }

    impl MapRenderer for Canvas {
        fn add_route_layer(&mut self, _points: &[GpsPoint]) -> LayerId {
            self.next += 1;
            let id = LayerId(self.next);
            self.layers.push(id);
            id
        }

        fn remove_layer(&mut self, layer: LayerId) {
            self.layers.retain(|l| *l != layer);
        }

        fn fit_bounds(&mut self, bounds: &Bounds) {
            self.fitted.push(*bounds);
        }
    }

    fn store_with_two() -> WaypointStore<MemoryStore> {
        let mut store = WaypointStore::open(WaypointRepository::new(MemoryStore::new()));
        store.add(Location::new("A", 25.03, 121.56)).unwrap();
        store.add(Location::new("B", 25.04, 121.58)).unwrap();
        store
    }

    fn candidate(geometry: &str) -> RouteCandidate {
        RouteCandidate {
            geometry: geometry.to_string(),
            distance: None,
            duration: None,
        }
    }

    #[test]
    fn test_decode_reference_polyline() {
        let points = decode_geometry("_p~iF~ps|U_ulLnnqC_mqNvxq`@").unwrap();
        let expected = [(38.5, -120.2), (40.7, -120.95), (43.252, -126.453)];
        assert_eq!(points.len(), expected.len());
        for (p, (lat, lng)) in points.iter().zip(expected) {
            assert!((p.latitude - lat).abs() < 1e-6);
            assert!((p.longitude - lng).abs() < 1e-6);
        }
    }

    #[test]
    fn test_route_from_candidate_measures_distance() {
        let route = Route::from_candidate(candidate(A_TO_B), TravelMode::Walking, 7).unwrap();
        assert_eq!(route.points.len(), 2);
        assert!(route.distance > 2000.0 && route.distance < 2500.0, "{}", route.distance);
        assert_eq!(route.revision, 7);
        assert!((route.bounds.min_lat - 25.03).abs() < 1e-6);
        assert!((route.bounds.max_lng - 121.58).abs() < 1e-6);
    }

    #[test]
    fn test_empty_geometry_is_decode_error() {
        assert!(matches!(
            Route::from_candidate(candidate(""), TravelMode::Driving, 0),
            Err(PlannerError::Decode { .. })
        ));
    }

    #[test]
    fn test_begin_requires_two_waypoints() {
        let mut routes = RouteOrchestrator::new();
        let mut store = WaypointStore::open(WaypointRepository::new(MemoryStore::new()));
        store.add(Location::new("A", 25.03, 121.56)).unwrap();

        let err = routes.begin_route(&mut store, TravelMode::Driving, true).unwrap_err();
        assert!(matches!(
            err,
            PlannerError::InsufficientWaypoints {
                waypoint_count: 1,
                minimum_required: 2
            }
        ));
        assert_eq!(store.status().unwrap().text, messages::NEED_TWO_WAYPOINTS);
    }

    #[test]
    fn test_begin_requires_render_target() {
        let mut routes = RouteOrchestrator::new();
        let mut store = store_with_two();
        assert!(matches!(
            routes.begin_route(&mut store, TravelMode::Driving, false),
            Err(PlannerError::RenderTargetUnavailable)
        ));
        assert_eq!(store.status().unwrap().text, messages::MAP_NOT_READY);
    }

    #[test]
    fn test_new_route_replaces_old_layer() {
        let mut routes = RouteOrchestrator::new();
        let mut store = store_with_two();
        let mut canvas = Canvas::default();

        let pending = routes.begin_route(&mut store, TravelMode::Driving, true).unwrap();
        routes
            .complete_route(pending, Ok(vec![candidate(A_TO_B)]), &mut store, Some(&mut canvas))
            .unwrap();
        assert_eq!(canvas.layers, vec![LayerId(1)]);

        let pending = routes.begin_route(&mut store, TravelMode::Cycling, true).unwrap();
        let route = routes
            .complete_route(pending, Ok(vec![candidate(VIA_MID)]), &mut store, Some(&mut canvas))
            .unwrap();
        assert_eq!(route.mode, TravelMode::Cycling);
        assert_eq!(route.points.len(), 3);
        assert_eq!(canvas.layers, vec![LayerId(2)]);
        assert_eq!(canvas.fitted.len(), 2);
        assert_eq!(routes.active_layer(), Some(LayerId(2)));
    }

    #[test]
    fn test_failure_keeps_previous_route() {
        let mut routes = RouteOrchestrator::new();
        let mut store = store_with_two();
        let mut canvas = Canvas::default();

        let pending = routes.begin_route(&mut store, TravelMode::Driving, true).unwrap();
        routes
            .complete_route(pending, Ok(vec![candidate(A_TO_B)]), &mut store, Some(&mut canvas))
            .unwrap();

        let pending = routes.begin_route(&mut store, TravelMode::Driving, true).unwrap();
        let err = routes
            .complete_route(pending, Ok(vec![]), &mut store, Some(&mut canvas))
            .unwrap_err();
        assert_eq!(err, PlannerError::NoRoute);
        assert_eq!(store.status().unwrap().text, messages::ROUTE_NOT_FOUND);

        let pending = routes.begin_route(&mut store, TravelMode::Driving, true).unwrap();
        routes
            .complete_route(
                pending,
                Err(PlannerError::Transport {
                    message: "timeout".to_string(),
                    status_code: None,
                }),
                &mut store,
                Some(&mut canvas),
            )
            .unwrap_err();
        assert_eq!(store.status().unwrap().text, messages::ROUTE_REQUEST_FAILED);

        assert_eq!(canvas.layers, vec![LayerId(1)]);
        assert_eq!(routes.active_layer(), Some(LayerId(1)));
    }

    #[test]
    fn test_stale_route_discarded() {
        let mut routes = RouteOrchestrator::new();
        let mut store = store_with_two();
        let mut canvas = Canvas::default();

        let older = routes.begin_route(&mut store, TravelMode::Driving, true).unwrap();
        let newer = routes.begin_route(&mut store, TravelMode::Walking, true).unwrap();

        routes
            .complete_route(newer, Ok(vec![candidate(A_TO_B)]), &mut store, Some(&mut canvas))
            .unwrap();
        let stale = routes.complete_route(
            older,
            Ok(vec![candidate(VIA_MID)]),
            &mut store,
            Some(&mut canvas),
        );

        assert!(matches!(stale, Err(PlannerError::Superseded { .. })));
        assert_eq!(canvas.layers.len(), 1);
        assert_eq!(routes.active_route().unwrap().mode, TravelMode::Walking);
    }

    #[test]
    fn test_edit_makes_route_stale() {
        let mut routes = RouteOrchestrator::new();
        let mut store = store_with_two();
        let mut canvas = Canvas::default();

        let pending = routes.begin_route(&mut store, TravelMode::Driving, true).unwrap();
        routes
            .complete_route(pending, Ok(vec![candidate(A_TO_B)]), &mut store, Some(&mut canvas))
            .unwrap();
        assert!(!routes.is_stale(&store));

        store.reorder(0, 1).unwrap();
        assert!(routes.is_stale(&store));
        // Not recomputed automatically
        assert_eq!(canvas.layers, vec![LayerId(1)]);

        routes.clear_route(Some(&mut canvas));
        assert!(canvas.layers.is_empty());
        assert!(routes.active_route().is_none());
        assert!(!routes.is_stale(&store));
    }
}
