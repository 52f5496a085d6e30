//! Planner configuration.

use serde::Deserialize;

use crate::persistence::DEFAULT_STORAGE_KEY;
use crate::{PlannerError, Result};

/// Configuration for the planner and its service clients.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Base URL of the Nominatim-compatible geocoder.
    /// Default: https://nominatim.openstreetmap.org
    pub geocoder_base_url: String,

    /// Base URL of the OSRM-compatible routing service.
    /// Default: https://router.project-osrm.org
    pub routing_base_url: String,

    /// Maximum number of search candidates requested per query.
    /// Default: 5
    pub result_limit: u32,

    /// Storage key holding the serialized waypoint list.
    /// Default: "savedLocations"
    pub storage_key: String,

    /// User-Agent sent with every request (Nominatim requires one).
    pub user_agent: String,

    /// Request timeout in seconds. None = wait indefinitely.
    /// Default: None
    pub request_timeout_secs: Option<u64>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            geocoder_base_url: "https://nominatim.openstreetmap.org".to_string(),
            routing_base_url: "https://router.project-osrm.org".to_string(),
            result_limit: 5,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            user_agent: concat!("waypoint-planner/", env!("CARGO_PKG_VERSION")).to_string(),
            request_timeout_secs: None,
        }
    }
}

impl PlannerConfig {
    /// Parse a (possibly partial) JSON config; missing fields keep defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| PlannerError::Config {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the values are usable.
    pub fn validate(&self) -> Result<()> {
        if self.result_limit == 0 {
            return Err(PlannerError::Config {
                message: "result_limit must be at least 1".to_string(),
            });
        }
        if self.storage_key.trim().is_empty() {
            return Err(PlannerError::Config {
                message: "storage_key must not be empty".to_string(),
            });
        }
        for (field, url) in [
            ("geocoder_base_url", &self.geocoder_base_url),
            ("routing_base_url", &self.routing_base_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(PlannerError::Config {
                    message: format!("{} must be an http(s) URL, got '{}'", field, url),
                });
            }
        }
        Ok(())
    }
}
