//! Geocoding provider: OpenStreetMap Nominatim with boundary polygons.

use super::types::{GeocodeCandidate, GeocodeError, GeometryKind};
use crate::config::GeocoderConfig;
use serde::Deserialize;
use tracing::{debug, warn};

pub const TARGET_GEOCODE: &str = "geocode";

/// Anything that can turn a free-text place name into ranked candidates.
pub trait Geocoder: Send + Sync {
    /// One lookup, one attempt. Candidates keep provider order.
    fn search(&self, query: &str) -> Result<Vec<GeocodeCandidate>, GeocodeError>;

    /// Soft-failing lookup: errors are logged and reported, never raised.
    fn lookup(&self, query: &str) -> Lookup {
        match self.search(query) {
            Ok(candidates) => {
                debug!(target: TARGET_GEOCODE, mention = query, count = candidates.len(), "lookup done");
                Lookup::Found(candidates)
            }
            Err(e) => {
                warn!(target: TARGET_GEOCODE, mention = query, error = %e, "geocoding failed, continuing without candidates");
                Lookup::Unavailable(e)
            }
        }
    }
}

/// Result of a soft-failing lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Found(Vec<GeocodeCandidate>),
    Unavailable(GeocodeError),
}

impl Lookup {
    /// Candidates, or an empty slice when the provider was unavailable.
    pub fn candidates(&self) -> &[GeocodeCandidate] {
        match self {
            Self::Found(c) => c,
            Self::Unavailable(_) => &[],
        }
    }
}

// ─── Wire format ────────────────────────────────────────────────

#[derive(Deserialize, Debug, Clone)]
struct NominatimItem {
    #[serde(default)]
    lat: Option<String>,
    #[serde(default)]
    lon: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    geojson: Option<serde_json::Value>,
}

impl NominatimItem {
    fn into_candidate(self) -> GeocodeCandidate {
        let geometry_type = self
            .geojson
            .as_ref()
            .and_then(|g| g.get("type"))
            .and_then(|t| t.as_str())
            .map(GeometryKind::from_type_name)
            .unwrap_or(GeometryKind::Other);

        GeocodeCandidate {
            latitude: self.lat.as_deref().and_then(parse_coordinate),
            longitude: self.lon.as_deref().and_then(parse_coordinate),
            display_name: self.display_name,
            geometry_type,
            geometry_payload: self.geojson,
        }
    }
}

fn parse_coordinate(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a `format=jsonv2` search response body, keeping at most `cap` items.
pub fn parse_search_response(body: &str, cap: usize) -> Result<Vec<GeocodeCandidate>, GeocodeError> {
    let items: Vec<NominatimItem> =
        serde_json::from_str(body).map_err(|e| GeocodeError::InvalidResponse(e.to_string()))?;

    Ok(items.into_iter().take(cap).map(NominatimItem::into_candidate).collect())
}

// ─── HTTP client ────────────────────────────────────────────────

/// Blocking Nominatim client with a bounded per-request timeout.
pub struct NominatimClient {
    config: GeocoderConfig,
    agent: ureq::Agent,
}

impl NominatimClient {
    pub fn new(config: GeocoderConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(config.timeout())
            .user_agent(&config.user_agent)
            .build();
        Self { config, agent }
    }
}

impl Geocoder for NominatimClient {
    fn search(&self, query: &str) -> Result<Vec<GeocodeCandidate>, GeocodeError> {
        let limit = self.config.candidate_cap.to_string();

        let response = self
            .agent
            .get(&self.config.endpoint_url)
            .query("q", query)
            .query("accept-language", &self.config.language)
            .query("polygon_geojson", "1")
            .query("limit", &limit)
            .query("format", "jsonv2")
            .call()
            .map_err(map_ureq_error)?;

        let body = response
            .into_string()
            .map_err(|e| GeocodeError::InvalidResponse(e.to_string()))?;

        parse_search_response(&body, self.config.candidate_cap)
    }
}

fn map_ureq_error(err: ureq::Error) -> GeocodeError {
    match err {
        ureq::Error::Status(code, _) => GeocodeError::Status(code),
        ureq::Error::Transport(transport) => {
            if is_timeout(&transport) {
                GeocodeError::Timeout
            } else {
                GeocodeError::Transport(transport.to_string())
            }
        }
    }
}

fn is_timeout(transport: &ureq::Transport) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = std::error::Error::source(transport);
    while let Some(err) = source {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            return matches!(io.kind(), std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock);
        }
        source = err.source();
    }
    false
}
