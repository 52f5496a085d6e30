//! Service wire formats.
//!
//! JSON shapes returned by the Nominatim geocoder and the OSRM router, and
//! the request paths/queries sent to them. Kept free of any HTTP client so
//! they can be parsed and tested on their own.

use log::debug;
use serde::Deserialize;

use crate::geocode::GeocodeHit;
use crate::routing::RouteCandidate;
use crate::{GpsPoint, PlannerError, Result, TravelMode};

// ============================================================================
// Nominatim
// ============================================================================

/// One record of a Nominatim `/search?format=json` response.
#[derive(Debug, Deserialize)]
struct NominatimPlace {
    display_name: Option<String>,
    /// Decimal string
    lat: String,
    /// Decimal string
    lon: String,
}

/// Query parameters for a Nominatim search.
pub fn nominatim_query(query: &str, limit: u32) -> Vec<(&'static str, String)> {
    vec![
        ("q", query.to_string()),
        ("limit", limit.to_string()),
        ("format", "json".to_string()),
        ("addressdetails", "1".to_string()),
    ]
}

/// Parse a Nominatim search response body, keeping service ranking order.
///
/// Records whose coordinates do not parse as numbers are skipped.
pub fn parse_nominatim_response(body: &str) -> Result<Vec<GeocodeHit>> {
    let places: Vec<NominatimPlace> =
        serde_json::from_str(body).map_err(|e| PlannerError::Transport {
            message: format!("Parse error: {}", e),
            status_code: None,
        })?;

    let hits = places
        .into_iter()
        .filter_map(|place| {
            let lat = place.lat.trim().parse::<f64>().ok();
            let lng = place.lon.trim().parse::<f64>().ok();
            match (lat, lng) {
                (Some(lat), Some(lng)) => Some(GeocodeHit {
                    display_name: place.display_name,
                    lat,
                    lng,
                }),
                _ => {
                    debug!(
                        "[Nominatim] Skipping record with bad coordinates ({:?}, {:?})",
                        place.lat, place.lon
                    );
                    None
                }
            }
        })
        .collect();

    Ok(hits)
}

// ============================================================================
// OSRM
// ============================================================================

/// Top-level OSRM `/route` response.
#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: Option<String>,
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    geometry: String,
    distance: Option<f64>,
    duration: Option<f64>,
}

/// OSRM codes meaning "valid request, no route between these points".
const NO_ROUTE_CODES: [&str; 2] = ["NoRoute", "NoSegment"];

/// Path for a route request: `route/v1/<mode>/<lng,lat;lng,lat;...>`.
///
/// Coordinates are written longitude first.
pub fn osrm_route_path(points: &[GpsPoint], mode: TravelMode) -> String {
    let coords: Vec<String> = points
        .iter()
        .map(|p| format!("{},{}", p.longitude, p.latitude))
        .collect();
    format!("route/v1/{}/{}", mode.as_str(), coords.join(";"))
}

/// Query parameters for a route request.
pub fn osrm_route_query() -> [(&'static str, &'static str); 2] {
    [("steps", "true"), ("geometries", "polyline")]
}

/// Parse an OSRM route response body.
///
/// `status` is the HTTP status code. A failed status whose body carries a
/// no-route code is an empty result, not a failure.
pub fn parse_osrm_response(status: u16, body: &str) -> Result<Vec<RouteCandidate>> {
    let success = (200..300).contains(&status);

    let response: OsrmResponse = match serde_json::from_str(body) {
        Ok(response) => response,
        Err(e) => {
            return Err(PlannerError::Transport {
                message: if success {
                    format!("Parse error: {}", e)
                } else {
                    format!("HTTP {}", status)
                },
                status_code: (!success).then_some(status),
            });
        }
    };

    let code = response.code.as_deref().unwrap_or("Ok");
    if NO_ROUTE_CODES.contains(&code) {
        debug!("[OSRM] No route: {}", code);
        return Ok(Vec::new());
    }

    if !success || code != "Ok" {
        return Err(PlannerError::Transport {
            message: response
                .message
                .unwrap_or_else(|| format!("routing service returned code {}", code)),
            status_code: (!success).then_some(status),
        });
    }

    Ok(response
        .routes
        .into_iter()
        .map(|r| RouteCandidate {
            geometry: r.geometry,
            distance: r.distance,
            duration: r.duration,
        })
        .collect())
}
