//! Unified error handling for the waypoint planner.
//!
//! Every fallible operation returns [`Result`]. Errors that reach the user
//! are also rendered into the store's status line via
//! [`PlannerError::user_message`].

use thiserror::Error;

use crate::status::messages;

/// Unified error type for planner operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlannerError {
    /// Search was requested with an empty or whitespace-only query
    #[error("Search query is empty")]
    EmptyQuery,

    /// Routing needs more waypoints than are in the sequence
    #[error("Route needs at least {minimum_required} waypoints, have {waypoint_count}")]
    InsufficientWaypoints {
        waypoint_count: usize,
        minimum_required: usize,
    },

    /// No map renderer is attached to draw the route on
    #[error("No render target available")]
    RenderTargetUnavailable,

    /// Location has non-finite or out-of-range coordinates
    #[error("Location '{name}' has invalid coordinates ({lat}, {lng})")]
    InvalidCoordinates { name: String, lat: f64, lng: f64 },

    /// Reorder index outside the sequence
    #[error("Index {index} out of range for {len} waypoints")]
    IndexOutOfRange { index: usize, len: usize },

    /// Waypoint id not present in the store
    #[error("Unknown waypoint id {id}")]
    UnknownWaypoint { id: u64 },

    /// Candidate index outside the pending search results
    #[error("No search candidate at index {index} ({available} available)")]
    UnknownCandidate { index: usize, available: usize },

    /// Geocoder answered with zero matches
    #[error("No location found for '{query}'")]
    NotFound { query: String },

    /// Routing service answered with zero routes
    #[error("Routing service returned no route")]
    NoRoute,

    /// Network, DNS or service-side failure
    #[error("{}", transport_display(.message, .status_code))]
    Transport {
        message: String,
        status_code: Option<u16>,
    },

    /// Encoded route geometry could not be decoded
    #[error("Failed to decode route geometry: {message}")]
    Decode { message: String },

    /// A newer request was issued before this one completed
    #[error("Request {ticket} superseded by request {latest}")]
    Superseded { ticket: u64, latest: u64 },

    /// Storage backend failure
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config { message: String },
}

fn transport_display(message: &str, status_code: &Option<u16>) -> String {
    match status_code {
        Some(code) => format!("HTTP error ({}): {}", code, message),
        None => format!("HTTP error: {}", message),
    }
}

impl PlannerError {
    /// Text shown to the user in the status line.
    pub fn user_message(&self) -> &'static str {
        match self {
            PlannerError::EmptyQuery => messages::EMPTY_QUERY,
            PlannerError::InsufficientWaypoints { .. } => messages::NEED_TWO_WAYPOINTS,
            PlannerError::RenderTargetUnavailable => messages::MAP_NOT_READY,
            PlannerError::InvalidCoordinates { .. } => messages::INVALID_LOCATION,
            PlannerError::IndexOutOfRange { .. }
            | PlannerError::UnknownWaypoint { .. }
            | PlannerError::UnknownCandidate { .. } => messages::INVALID_SELECTION,
            PlannerError::NotFound { .. } => messages::PLACE_NOT_FOUND,
            PlannerError::NoRoute => messages::ROUTE_NOT_FOUND,
            PlannerError::Transport { .. } => messages::REQUEST_FAILED,
            PlannerError::Decode { .. } => messages::ROUTE_REQUEST_FAILED,
            PlannerError::Superseded { .. } => messages::REQUEST_FAILED,
            PlannerError::Storage { .. } | PlannerError::Config { .. } => messages::INTERNAL,
        }
    }

    /// Whether this error should be shown to the user at all.
    ///
    /// Superseded completions are dropped quietly.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, PlannerError::Superseded { .. })
    }
}

#[cfg(feature = "persistence")]
impl From<rusqlite::Error> for PlannerError {
    fn from(e: rusqlite::Error) -> Self {
        PlannerError::Storage {
            message: e.to_string(),
        }
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for PlannerError {
    fn from(e: reqwest::Error) -> Self {
        PlannerError::Transport {
            message: e.to_string(),
            status_code: e.status().map(|s| s.as_u16()),
        }
    }
}

/// Result type alias for planner operations.
pub type Result<T> = std::result::Result<T, PlannerError>;

/// Extension trait for converting Option to PlannerError.
pub trait OptionExt<T> {
    /// Convert Option to Result with an index-out-of-range error.
    fn ok_or_out_of_range(self, index: usize, len: usize) -> Result<T>;

    /// Convert Option to Result with an unknown-waypoint error.
    fn ok_or_unknown_waypoint(self, id: u64) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_out_of_range(self, index: usize, len: usize) -> Result<T> {
        self.ok_or(PlannerError::IndexOutOfRange { index, len })
    }

    fn ok_or_unknown_waypoint(self, id: u64) -> Result<T> {
        self.ok_or(PlannerError::UnknownWaypoint { id })
    }
}
