//! Core types for the location subsystem.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One location reference split out of a model-emitted location list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationMention {
    /// Identifier of the text the mention came from.
    pub source_id: String,
    /// Trimmed mention text, e.g. "Paris, France". Never empty.
    pub raw_text: String,
    /// Position among the surviving mentions of its source.
    pub sequence_index: usize,
}

/// GeoJSON shape class of a provider result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometryKind {
    Point,
    Polygon,
    MultiPolygon,
    Other,
}

impl GeometryKind {
    /// Map a GeoJSON `type` member onto a kind. Unknown names are `Other`.
    pub fn from_type_name(name: &str) -> Self {
        match name {
            "Point" => Self::Point,
            "Polygon" => Self::Polygon,
            "MultiPolygon" => Self::MultiPolygon,
            _ => Self::Other,
        }
    }

    /// Polygon and MultiPolygon describe an affected area.
    pub fn is_area(self) -> bool {
        matches!(self, Self::Polygon | Self::MultiPolygon)
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Point => write!(f, "Point"),
            Self::Polygon => write!(f, "Polygon"),
            Self::MultiPolygon => write!(f, "MultiPolygon"),
            Self::Other => write!(f, "Other"),
        }
    }
}

/// One result item returned by the geocoding provider, in provider order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeCandidate {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default)]
    pub display_name: Option<String>,
    pub geometry_type: GeometryKind,
    /// Raw GeoJSON geometry object, parsed lazily by the selector.
    #[serde(default)]
    pub geometry_payload: Option<serde_json::Value>,
}

impl GeocodeCandidate {
    /// Latitude/longitude pair, if the provider supplied both.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

/// The geometry picked for a mention, already reduced to WKT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChosenGeometry {
    pub kind: GeometryKind,
    /// Index of the winning candidate in provider order.
    pub candidate_index: usize,
    pub wkt: String,
}

/// Outcome of resolving a single mention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    /// A geometry was chosen.
    Resolved,
    /// The provider answered with an empty list.
    NoCandidates,
    /// Candidates came back but none carried a usable Point/Polygon shape.
    NoUsableGeometry,
    /// Transport failure, timeout or non-success status.
    ProviderUnavailable { detail: String },
}

impl ResolutionStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::ProviderUnavailable { .. })
    }
}

/// A mention together with everything the provider said about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub mention: LocationMention,
    pub chosen_geometry: Option<ChosenGeometry>,
    pub all_candidates: Vec<GeocodeCandidate>,
    pub status: ResolutionStatus,
}

impl ResolvedLocation {
    /// Record for a mention whose lookup failed.
    pub fn unavailable(mention: LocationMention, detail: impl Into<String>) -> Self {
        Self {
            mention,
            chosen_geometry: None,
            all_candidates: Vec::new(),
            status: ResolutionStatus::ProviderUnavailable { detail: detail.into() },
        }
    }

    /// Flatten into the record shape handed to visualization and storage.
    pub fn to_record(&self) -> LocationRecord {
        let geo_locations = self
            .all_candidates
            .iter()
            .filter_map(GeocodeCandidate::coordinates)
            .map(|(lat, lon)| GeoPoint {
                location: self.mention.raw_text.clone(),
                latitude: lat,
                longitude: lon,
            })
            .collect();

        LocationRecord {
            source_id: self.mention.source_id.clone(),
            split_location: self.mention.raw_text.clone(),
            geo_locations,
            geometry: self.chosen_geometry.as_ref().map(|g| g.wkt.clone()),
            status: self.status.clone(),
        }
    }
}

/// Ordered pipeline output: source order, then mention order within a source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedBatch {
    pub locations: Vec<ResolvedLocation>,
}

impl ResolvedBatch {
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResolvedLocation> {
        self.locations.iter()
    }

    /// Mentions belonging to one source, in mention order.
    pub fn for_source<'a>(&'a self, source_id: &'a str) -> impl Iterator<Item = &'a ResolvedLocation> + 'a {
        self.locations.iter().filter(move |l| l.mention.source_id == source_id)
    }

    pub fn records(&self) -> Vec<LocationRecord> {
        self.locations.iter().map(ResolvedLocation::to_record).collect()
    }
}

/// A resolved coordinate pair, named after the mention it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "Latitude")]
    pub latitude: f64,
    #[serde(rename = "Longitude")]
    pub longitude: f64,
}

/// Plain-data record consumed by the map layer and persisted to disk.
///
/// `Split_location`, `Geo_Locations` and `Geometry` are the stable field
/// names other tooling reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    #[serde(rename = "Source")]
    pub source_id: String,
    #[serde(rename = "Split_location")]
    pub split_location: String,
    #[serde(rename = "Geo_Locations")]
    pub geo_locations: Vec<GeoPoint>,
    #[serde(rename = "Geometry")]
    pub geometry: Option<String>,
    pub status: ResolutionStatus,
}

/// Geocoding provider failures. All of them are recovered per mention.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeocodeError {
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("provider returned HTTP {0}")]
    Status(u16),
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

/// A candidate geometry that could not be turned into a shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeometryError {
    #[error("candidate has no geometry payload")]
    Missing,
    #[error("malformed geometry: {0}")]
    Malformed(String),
    #[error("declared {declared} but payload is {actual}")]
    KindMismatch { declared: GeometryKind, actual: GeometryKind },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mention(text: &str) -> LocationMention {
        LocationMention {
            source_id: "article-1".into(),
            raw_text: text.into(),
            sequence_index: 0,
        }
    }

    #[test]
    fn test_kind_from_type_name() {
        assert_eq!(GeometryKind::from_type_name("Point"), GeometryKind::Point);
        assert_eq!(GeometryKind::from_type_name("MultiPolygon"), GeometryKind::MultiPolygon);
        assert_eq!(GeometryKind::from_type_name("LineString"), GeometryKind::Other);
        assert!(GeometryKind::Polygon.is_area());
        assert!(!GeometryKind::Point.is_area());
    }

    #[test]
    fn test_record_skips_candidates_without_coordinates() {
        let resolved = ResolvedLocation {
            mention: mention("Tokyo, Japan"),
            chosen_geometry: None,
            all_candidates: vec![
                GeocodeCandidate {
                    latitude: Some(35.68),
                    longitude: Some(139.69),
                    display_name: None,
                    geometry_type: GeometryKind::Point,
                    geometry_payload: None,
                },
                GeocodeCandidate {
                    latitude: None,
                    longitude: Some(139.0),
                    display_name: None,
                    geometry_type: GeometryKind::Other,
                    geometry_payload: None,
                },
            ],
            status: ResolutionStatus::NoUsableGeometry,
        };

        let record = resolved.to_record();
        assert_eq!(record.split_location, "Tokyo, Japan");
        assert_eq!(record.geo_locations.len(), 1);
        assert_eq!(record.geo_locations[0].location, "Tokyo, Japan");
        assert!(record.geometry.is_none());
    }

    #[test]
    fn test_record_field_names() {
        let resolved = ResolvedLocation::unavailable(mention("Gaza"), "request timed out");
        let json = serde_json::to_value(resolved.to_record()).unwrap();
        assert_eq!(json["Split_location"], "Gaza");
        assert!(json["Geo_Locations"].as_array().unwrap().is_empty());
        assert!(json["Geometry"].is_null());
        assert_eq!(json["status"]["provider_unavailable"]["detail"], "request timed out");
    }
}
