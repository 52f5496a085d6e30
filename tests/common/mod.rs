//! Shared fakes for the planner integration tests.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use waypoint_planner::{
    Bounds, GeocodeHit, Geocoder, GpsPoint, LayerId, MapRenderer, PlannerError, Result,
    RouteCandidate, RoutingService, TravelMode, Waypoint,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Encoded polylines (precision 5) used as routing answers.
pub const A_TO_B: &str = "otwwC_e}dVo}@_|B"; // (25.03,121.56) -> (25.04,121.58)
pub const A_VIA_MID_TO_B: &str = "otwwC_e}dVg^o}@g^o}@"; // via (25.035,121.57)

fn transport_error() -> PlannerError {
    PlannerError::Transport {
        message: "connection reset".to_string(),
        status_code: None,
    }
}

// ============================================================================
// Geocoder
// ============================================================================

/// Geocoder returning canned hits and counting calls.
#[derive(Default)]
pub struct FakeGeocoder {
    pub hits: RefCell<Vec<GeocodeHit>>,
    pub fail: Cell<bool>,
    pub calls: Cell<u32>,
    pub last_limit: Cell<u32>,
}

impl FakeGeocoder {
    pub fn with_hits(hits: &[(&str, f64, f64)]) -> Self {
        let geocoder = Self::default();
        geocoder.set_hits(hits);
        geocoder
    }

    pub fn set_hits(&self, hits: &[(&str, f64, f64)]) {
        *self.hits.borrow_mut() = hits
            .iter()
            .map(|(name, lat, lng)| GeocodeHit {
                display_name: Some(name.to_string()),
                lat: *lat,
                lng: *lng,
            })
            .collect();
    }
}

impl Geocoder for FakeGeocoder {
    async fn search(&self, _query: &str, limit: u32) -> Result<Vec<GeocodeHit>> {
        self.calls.set(self.calls.get() + 1);
        self.last_limit.set(limit);
        if self.fail.get() {
            return Err(transport_error());
        }
        Ok(self
            .hits
            .borrow()
            .iter()
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

// ============================================================================
// Router
// ============================================================================

/// Router returning a canned geometry and recording requests.
#[derive(Default)]
pub struct FakeRouter {
    pub geometries: RefCell<Vec<String>>,
    pub fail: Cell<bool>,
    pub requests: RefCell<Vec<(Vec<GpsPoint>, TravelMode)>>,
}

impl FakeRouter {
    pub fn with_geometry(geometry: &str) -> Self {
        let router = Self::default();
        router.geometries.borrow_mut().push(geometry.to_string());
        router
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl RoutingService for FakeRouter {
    async fn route(&self, points: &[GpsPoint], mode: TravelMode) -> Result<Vec<RouteCandidate>> {
        self.requests.borrow_mut().push((points.to_vec(), mode));
        if self.fail.get() {
            return Err(transport_error());
        }
        Ok(self
            .geometries
            .borrow()
            .iter()
            .map(|g| RouteCandidate {
                geometry: g.clone(),
                distance: Some(2301.0),
                duration: Some(320.0),
            })
            .collect())
    }
}

// ============================================================================
// Renderer
// ============================================================================

/// What a [`RecordingRenderer`] has drawn.
#[derive(Debug, Default)]
pub struct Canvas {
    next_layer: u64,
    pub layers: Vec<(LayerId, Vec<GpsPoint>)>,
    pub removed: Vec<LayerId>,
    pub fitted: Vec<Bounds>,
    pub markers: Vec<String>,
}

/// Renderer whose drawing log stays inspectable after it is boxed.
#[derive(Clone, Default)]
pub struct RecordingRenderer {
    pub canvas: Rc<RefCell<Canvas>>,
}

impl MapRenderer for RecordingRenderer {
    fn add_route_layer(&mut self, points: &[GpsPoint]) -> LayerId {
        let mut canvas = self.canvas.borrow_mut();
        canvas.next_layer += 1;
        let id = LayerId(canvas.next_layer);
        canvas.layers.push((id, points.to_vec()));
        id
    }

    fn remove_layer(&mut self, layer: LayerId) {
        let mut canvas = self.canvas.borrow_mut();
        canvas.layers.retain(|(id, _)| *id != layer);
        canvas.removed.push(layer);
    }

    fn fit_bounds(&mut self, bounds: &Bounds) {
        self.canvas.borrow_mut().fitted.push(*bounds);
    }

    fn show_markers(&mut self, waypoints: &[Waypoint]) {
        self.canvas.borrow_mut().markers =
            waypoints.iter().map(|w| w.location.name.clone()).collect();
    }
}
