//! # Waypoint Planner
//!
//! Ordered waypoint collection with persistence, geocoding and route
//! orchestration.
//!
//! This library provides:
//! - An ordered waypoint store with selection, reorder and bulk removal
//! - Fail-soft persistence of the waypoint list to a key-value backend
//! - Geocoding of free-text queries into selectable candidates
//! - Route requests against an OSRM-style service with polyline decoding
//!
//! ## Features
//!
//! - **`http`** - Nominatim geocoder and OSRM router clients (reqwest)
//! - **`persistence`** - SQLite key-value storage backend
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use waypoint_planner::{Location, MemoryStore, WaypointRepository, WaypointStore};
//!
//! let repository = WaypointRepository::new(MemoryStore::new());
//! let mut store = WaypointStore::open(repository);
//!
//! store.add(Location::new("台北車站", 25.0478, 121.5170)).unwrap();
//! store.add(Location::new("台北101", 25.0340, 121.5645)).unwrap();
//! store.reorder(1, 0).unwrap();
//!
//! assert_eq!(store.waypoints()[0].location.name, "台北101");
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{OptionExt, PlannerError, Result};

// User-facing status line
pub mod status;
pub use status::{StatusKind, StatusMessage};

// Configuration
pub mod config;
pub use config::PlannerConfig;

// Geographic utilities (distance calculations)
pub mod geo_utils;

// Key-value storage backends
pub mod storage;
#[cfg(feature = "persistence")]
pub use storage::SqliteStore;
pub use storage::{KeyValueStore, MemoryStore};

// Persistence adapter for the waypoint list
pub mod persistence;
pub use persistence::{WaypointRepository, DEFAULT_STORAGE_KEY};

// Ordered waypoint collection (single source of truth)
pub mod store;
pub use store::{Waypoint, WaypointId, WaypointStore};

// Latest-request-wins sequencing for async service calls
pub mod request;
pub use request::{RequestTicket, RequestTracker};

// Service wire formats (Nominatim / OSRM JSON)
pub mod wire;

// Free-text search into candidates
pub mod geocode;
pub use geocode::{GeocodeHit, GeocodeOrchestrator, Geocoder, PendingSearch, SearchCandidate};

// Route requests, decoding and rendering
pub mod routing;
pub use routing::{
    decode_geometry, LayerId, MapRenderer, PendingRoute, Route, RouteCandidate, RouteOrchestrator,
    RoutingService,
};

// Session object the presentation shell talks to
pub mod planner;
pub use planner::{Command, Planner};

// HTTP clients for Nominatim and OSRM
#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "http")]
pub use http::{run_blocking, NominatimGeocoder, OsrmRouter};

// ============================================================================
// Core Types
// ============================================================================

/// Name given to locations created without one.
pub const DEFAULT_LOCATION_NAME: &str = "未知地點";

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use waypoint_planner::GpsPoint;
/// let point = GpsPoint::new(25.0330, 121.5654); // Taipei
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Bounding box for a route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from GPS points.
    pub fn from_points(points: &[GpsPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        let mut min_lng = f64::MAX;
        let mut max_lng = f64::MIN;

        for p in points {
            min_lat = min_lat.min(p.latitude);
            max_lat = max_lat.max(p.latitude);
            min_lng = min_lng.min(p.longitude);
            max_lng = max_lng.max(p.longitude);
        }

        Some(Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        })
    }

    /// Check whether a point lies inside (or on the edge of) the bounds.
    pub fn contains(&self, point: &GpsPoint) -> bool {
        point.latitude >= self.min_lat
            && point.latitude <= self.max_lat
            && point.longitude >= self.min_lng
            && point.longitude <= self.max_lng
    }
}

/// A named place as stored on disk: `{ "name", "lat", "lng" }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    /// Create a location. A blank name falls back to [`DEFAULT_LOCATION_NAME`].
    pub fn new(name: impl Into<String>, lat: f64, lng: f64) -> Self {
        let name = name.into();
        let name = if name.trim().is_empty() {
            DEFAULT_LOCATION_NAME.to_string()
        } else {
            name
        };
        Self { name, lat, lng }
    }

    /// Create a location from an optional name (e.g. a map click).
    pub fn with_optional_name(name: Option<String>, lat: f64, lng: f64) -> Self {
        Self::new(name.unwrap_or_default(), lat, lng)
    }

    pub fn point(&self) -> GpsPoint {
        GpsPoint::new(self.lat, self.lng)
    }

    /// Check if the coordinates are finite and in range.
    pub fn is_valid(&self) -> bool {
        self.point().is_valid()
    }
}

/// Travel mode, used as the routing-service profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    #[default]
    Driving,
    Cycling,
    Walking,
}

impl TravelMode {
    pub const ALL: [TravelMode; 3] = [
        TravelMode::Driving,
        TravelMode::Cycling,
        TravelMode::Walking,
    ];

    /// Profile segment for the routing URL.
    pub fn as_str(&self) -> &'static str {
        match self {
            TravelMode::Driving => "driving",
            TravelMode::Cycling => "cycling",
            TravelMode::Walking => "walking",
        }
    }
}

impl fmt::Display for TravelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TravelMode {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "driving" => Ok(TravelMode::Driving),
            "cycling" => Ok(TravelMode::Cycling),
            "walking" => Ok(TravelMode::Walking),
            other => Err(PlannerError::Config {
                message: format!("unknown travel mode '{}'", other),
            }),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
