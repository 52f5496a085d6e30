//! HTTP clients for the geocoder and routing services.
//!
//! This module provides:
//! - [`NominatimGeocoder`]: `GET {base}/search?q=..&limit=..&format=json&addressdetails=1`
//! - [`OsrmRouter`]: `GET {base}/route/v1/<mode>/<lng,lat;...>?steps=true&geometries=polyline`
//! - [`run_blocking`] for shells without an async runtime
//!
//! No retries: every failure is returned to the caller once.

use std::future::Future;
use std::time::{Duration, Instant};

use log::{debug, warn};
use reqwest::Client;

use crate::geocode::{GeocodeHit, Geocoder};
use crate::routing::{RouteCandidate, RoutingService};
use crate::wire::{
    nominatim_query, osrm_route_path, osrm_route_query, parse_nominatim_response,
    parse_osrm_response,
};
use crate::{GpsPoint, PlannerConfig, PlannerError, Result, TravelMode};

fn build_client(config: &PlannerConfig) -> Result<Client> {
    let mut builder = Client::builder().user_agent(config.user_agent.clone());
    if let Some(secs) = config.request_timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder.build().map_err(|e| PlannerError::Config {
        message: format!("Failed to create HTTP client: {}", e),
    })
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path)
}

/// Nominatim address search client.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new(config: &PlannerConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
            base_url: config.geocoder_base_url.clone(),
        })
    }

    /// Share an existing client (connection pool) with another service.
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn search_url(&self) -> String {
        join_url(&self.base_url, "search")
    }
}

impl Geocoder for NominatimGeocoder {
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<GeocodeHit>> {
        let start = Instant::now();
        let response = self
            .client
            .get(self.search_url())
            .query(&nominatim_query(query, limit))
            .send()
            .await
            .map_err(|e| {
                warn!("[Nominatim] Request error: {}", e);
                PlannerError::from(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!("[Nominatim] HTTP {} for '{}'", status, query);
            return Err(PlannerError::Transport {
                message: format!("HTTP {}", status),
                status_code: Some(status.as_u16()),
            });
        }

        let body = response.text().await?;
        let hits = parse_nominatim_response(&body)?;
        debug!(
            "[Nominatim] {} hits for '{}' in {:?}",
            hits.len(),
            query,
            start.elapsed()
        );
        Ok(hits)
    }
}

/// OSRM route client.
#[derive(Debug, Clone)]
pub struct OsrmRouter {
    client: Client,
    base_url: String,
}

impl OsrmRouter {
    pub fn new(config: &PlannerConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
            base_url: config.routing_base_url.clone(),
        })
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn route_url(&self, points: &[GpsPoint], mode: TravelMode) -> String {
        join_url(&self.base_url, &osrm_route_path(points, mode))
    }
}

impl RoutingService for OsrmRouter {
    async fn route(&self, points: &[GpsPoint], mode: TravelMode) -> Result<Vec<RouteCandidate>> {
        let start = Instant::now();
        let response = self
            .client
            .get(self.route_url(points, mode))
            .query(&osrm_route_query())
            .send()
            .await
            .map_err(|e| {
                warn!("[OSRM] Request error: {}", e);
                PlannerError::from(e)
            })?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        let routes = parse_osrm_response(status, &body)?;
        debug!(
            "[OSRM] {} routes ({}) in {:?}",
            routes.len(),
            mode,
            start.elapsed()
        );
        Ok(routes)
    }
}

/// Run a future to completion on a fresh current-thread tokio runtime.
pub fn run_blocking<F: Future>(future: F) -> Result<F::Output> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| PlannerError::Config {
            message: format!("Failed to create tokio runtime: {}", e),
        })?;
    Ok(rt.block_on(future))
}
