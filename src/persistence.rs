//! # Waypoint Persistence
//!
//! Reads and writes the whole waypoint list as one JSON array under a single
//! storage key. Loading is fail-soft: a missing key, unparsable JSON or a
//! non-array root all yield an empty list, and individual malformed entries
//! are dropped while the rest are kept.

use log::{debug, warn};
use serde_json::Value;

use crate::storage::KeyValueStore;
use crate::Location;

/// Storage key used when none is configured.
pub const DEFAULT_STORAGE_KEY: &str = "savedLocations";

/// Persistence adapter over a [`KeyValueStore`].
#[derive(Debug)]
pub struct WaypointRepository<S> {
    storage: S,
    key: String,
}

impl<S: KeyValueStore> WaypointRepository<S> {
    /// Create a repository using [`DEFAULT_STORAGE_KEY`].
    pub fn new(storage: S) -> Self {
        Self::with_key(storage, DEFAULT_STORAGE_KEY)
    }

    pub fn with_key(storage: S, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Load the stored list. Never fails; problems are logged.
    pub fn load(&self) -> Vec<Location> {
        let raw = match self.storage.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("[WaypointRepository] No stored list under '{}'", self.key);
                return Vec::new();
            }
            Err(e) => {
                warn!("[WaypointRepository] Failed to read '{}': {}", self.key, e);
                return Vec::new();
            }
        };

        parse_locations(&raw)
    }

    /// Serialize and write the whole list.
    ///
    /// Storage failures are logged, not returned.
    pub fn save(&mut self, locations: &[Location]) {
        let json = match serde_json::to_string(locations) {
            Ok(json) => json,
            Err(e) => {
                warn!("[WaypointRepository] Failed to serialize list: {}", e);
                return;
            }
        };

        match self.storage.set(&self.key, &json) {
            Ok(()) => debug!(
                "[WaypointRepository] Saved {} locations to '{}'",
                locations.len(),
                self.key
            ),
            Err(e) => warn!("[WaypointRepository] Failed to write '{}': {}", self.key, e),
        }
    }

    /// Remove the stored key entirely.
    pub fn clear(&mut self) {
        match self.storage.remove(&self.key) {
            Ok(()) => debug!("[WaypointRepository] Removed '{}'", self.key),
            Err(e) => warn!("[WaypointRepository] Failed to remove '{}': {}", self.key, e),
        }
    }
}

/// Parse a stored payload into locations, keeping every well-formed entry.
///
/// An entry is kept when it is an object with `lat`, `lng` and `name`, the
/// coordinates are numbers in range and the name is a string. Blank names
/// load as [`DEFAULT_LOCATION_NAME`](crate::DEFAULT_LOCATION_NAME).
pub fn parse_locations(raw: &str) -> Vec<Location> {
    let root: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            warn!("[WaypointRepository] Stored list is not valid JSON: {}", e);
            return Vec::new();
        }
    };

    let Value::Array(entries) = root else {
        warn!("[WaypointRepository] Stored list is not an array, ignoring");
        return Vec::new();
    };

    let total = entries.len();
    let locations: Vec<Location> = entries
        .into_iter()
        .enumerate()
        .filter_map(|(i, entry)| {
            let location = parse_entry(entry);
            if location.is_none() {
                debug!("[WaypointRepository] Dropping malformed entry {}", i);
            }
            location
        })
        .collect();

    if locations.len() < total {
        warn!(
            "[WaypointRepository] Recovered {}/{} stored locations",
            locations.len(),
            total
        );
    }

    locations
}

fn parse_entry(entry: Value) -> Option<Location> {
    let obj = entry.as_object()?;
    if !(obj.contains_key("lat") && obj.contains_key("lng") && obj.contains_key("name")) {
        return None;
    }

    let stored: Location = serde_json::from_value(entry).ok()?;
    let location = Location::new(stored.name, stored.lat, stored.lng);
    location.is_valid().then_some(location)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn sample() -> Vec<Location> {
        vec![
            Location::new("台北車站", 25.0478, 121.5170),
            Location::new("台北101", 25.0340, 121.5645),
            Location::new("A", -33.8688, 151.2093),
        ]
    }

    #[test]
    fn test_round_trip() {
        let mut repo = WaypointRepository::new(MemoryStore::new());
        repo.save(&sample());
        assert_eq!(repo.load(), sample());
    }

    #[test]
    fn test_empty_list_round_trip_keeps_key() {
        let mut repo = WaypointRepository::new(MemoryStore::new());
        repo.save(&[]);
        assert!(repo.storage().contains_key(DEFAULT_STORAGE_KEY));
        assert!(repo.load().is_empty());
    }

    #[test]
    fn test_clear_removes_key() {
        let mut repo = WaypointRepository::new(MemoryStore::new());
        repo.save(&sample());
        repo.clear();
        assert!(!repo.storage().contains_key(DEFAULT_STORAGE_KEY));
        assert!(repo.load().is_empty());
    }

    #[test]
    fn test_missing_key_is_empty() {
        let repo = WaypointRepository::new(MemoryStore::new());
        assert!(repo.load().is_empty());
    }

    #[test]
    fn test_malformed_payloads_are_empty() {
        for raw in [
            "not json at all",
            r#"{"name": "A", "lat": 1.0, "lng": 2.0}"#,
            "null",
            "42",
            r#"[{"name": "A", "lng": 2.0}]"#,
        ] {
            let repo = WaypointRepository::new(MemoryStore::with_entry(DEFAULT_STORAGE_KEY, raw));
            assert!(repo.load().is_empty(), "payload {:?} should load empty", raw);
        }
    }

    #[test]
    fn test_partial_recovery() {
        let raw = r#"[
            {"name": "good", "lat": 25.03, "lng": 121.56},
            null,
            {"name": "no-lat", "lng": 121.56},
            "string",
            {"name": "bad-type", "lat": "25.03", "lng": 121.56},
            {"name": "out-of-range", "lat": 95.0, "lng": 121.56},
            {"name": "also good", "lat": 25.04, "lng": 121.58, "extra": true}
        ]"#;
        let locations = parse_locations(raw);
        let names: Vec<&str> = locations.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["good", "also good"]);
    }

    #[test]
    fn test_blank_stored_name_gets_default() {
        let raw = r#"[
            {"name": "", "lat": 25.03, "lng": 121.56},
            {"name": "  ", "lat": 25.04, "lng": 121.58}
        ]"#;
        let locations = parse_locations(raw);
        assert_eq!(locations.len(), 2);
        assert!(locations
            .iter()
            .all(|l| l.name == crate::DEFAULT_LOCATION_NAME));
    }

    #[test]
    fn test_custom_key() {
        let mut repo = WaypointRepository::with_key(MemoryStore::new(), "trip-1");
        repo.save(&sample());
        assert_eq!(repo.key(), "trip-1");
        assert!(repo.storage().contains_key("trip-1"));
        assert!(!repo.storage().contains_key(DEFAULT_STORAGE_KEY));
    }
}
