//! Result persistence and map export.
//!
//! Records carry WKT; here it is parsed back into shapes and re-encoded as
//! GeoJSON for the Leaflet page. A record whose WKT is missing or unreadable
//! is left off the map; the rest still render.

use std::fs;
use std::path::{Path, PathBuf};

use geojson::{Feature, FeatureCollection, JsonObject};
use serde::Serialize;
use tracing::{info, warn};
use wkt::TryFromWkt;

use crate::location::LocationRecord;

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot serialize results: {0}")]
    Json(#[from] serde_json::Error),
}

/// Write `value` as pretty JSON to `dir/filename`, creating `dir`.
pub fn save_json<T: Serialize>(value: &T, dir: &Path, filename: &str) -> Result<PathBuf, OutputError> {
    let data = serde_json::to_string_pretty(value)?;
    write_artifact(dir, filename, &data)
}

/// Write the Leaflet map for `records` to `dir/filename`.
pub fn save_map(records: &[LocationRecord], dir: &Path, filename: &str) -> Result<PathBuf, OutputError> {
    let html = render_map_html(records)?;
    write_artifact(dir, filename, &html)
}

fn write_artifact(dir: &Path, filename: &str, data: &str) -> Result<PathBuf, OutputError> {
    fs::create_dir_all(dir).map_err(|source| OutputError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = dir.join(filename);
    fs::write(&path, data).map_err(|source| OutputError::Io {
        path: path.clone(),
        source,
    })?;
    info!(path = %path.display(), "artifact written");
    Ok(path)
}

/// First available coordinate across all records, as (lat, lon).
pub fn map_center(records: &[LocationRecord]) -> Option<(f64, f64)> {
    records
        .iter()
        .flat_map(|r| r.geo_locations.iter())
        .map(|p| (p.latitude, p.longitude))
        .next()
}

/// One feature per record that has a readable geometry.
pub fn to_feature_collection(records: &[LocationRecord]) -> FeatureCollection {
    let features = records
        .iter()
        .filter_map(|record| {
            let wkt = record.geometry.as_deref()?;
            let shape = match geo_types::Geometry::<f64>::try_from_wkt_str(wkt) {
                Ok(shape) => shape,
                Err(e) => {
                    warn!(location = %record.split_location, error = %e, "unreadable WKT, leaving it off the map");
                    return None;
                }
            };

            let mut properties = JsonObject::new();
            properties.insert("location".into(), record.split_location.clone().into());
            properties.insert("source".into(), record.source_id.clone().into());

            Some(Feature {
                bbox: None,
                geometry: Some(geojson::Geometry::new(geojson::Value::from(&shape))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            })
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

const MAP_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Event Atlas</title>
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<style>html, body, #map { height: 100%; margin: 0; }</style>
</head>
<body>
<div id="map"></div>
<script>
const map = L.map('map').setView([__LAT__, __LON__], __ZOOM__);
L.tileLayer('https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png', {
  attribution: '&copy; OpenStreetMap contributors'
}).addTo(map);
L.geoJSON(__FEATURES__, {
  style: () => ({ fillColor: 'orange', color: 'red', weight: 2, fillOpacity: 0.5 }),
  onEachFeature: (f, layer) => layer.bindPopup(f.properties.location)
}).addTo(map);
</script>
</body>
</html>
"#;

/// Standalone Leaflet page centered on the first coordinate.
pub fn render_map_html(records: &[LocationRecord]) -> Result<String, OutputError> {
    let (lat, lon, zoom) = match map_center(records) {
        Some((lat, lon)) => (lat, lon, 5),
        None => (20.0, 0.0, 2),
    };
    let features = serde_json::to_string(&to_feature_collection(records))?;

    Ok(MAP_TEMPLATE
        .replace("__LAT__", &lat.to_string())
        .replace("__LON__", &lon.to_string())
        .replace("__ZOOM__", &zoom.to_string())
        .replace("__FEATURES__", &features))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::{GeoPoint, ResolutionStatus};
    use tempfile::TempDir;

    fn record(name: &str, coords: Option<(f64, f64)>, geometry: Option<&str>) -> LocationRecord {
        LocationRecord {
            source_id: "input".into(),
            split_location: name.into(),
            geo_locations: coords
                .map(|(lat, lon)| {
                    vec![GeoPoint {
                        location: name.into(),
                        latitude: lat,
                        longitude: lon,
                    }]
                })
                .unwrap_or_default(),
            geometry: geometry.map(str::to_string),
            status: ResolutionStatus::Resolved,
        }
    }

    #[test]
    fn test_center_is_first_available_coordinate() {
        let records = vec![
            record("Atlantis", None, None),
            record("Tokyo", Some((35.68, 139.69)), Some("POINT(139.69 35.68)")),
            record("Paris", Some((48.85, 2.35)), None),
        ];
        assert_eq!(map_center(&records), Some((35.68, 139.69)));
        assert_eq!(map_center(&[]), None);
    }

    #[test]
    fn test_feature_collection_skips_missing_and_bad_geometry() {
        let records = vec![
            record("Paris", Some((48.85, 2.35)), Some("POLYGON((2.2 48.8,2.5 48.8,2.5 48.9,2.2 48.8))")),
            record("Nowhere", None, None),
            record("Broken", None, Some("POLYGON((oops")),
            record("Tokyo", Some((35.68, 139.69)), Some("POINT(139.69 35.68)")),
        ];
        let fc = to_feature_collection(&records);
        assert_eq!(fc.features.len(), 2);
        let first = &fc.features[0];
        assert!(matches!(first.geometry.as_ref().unwrap().value, geojson::Value::Polygon(_)));
        assert_eq!(first.properties.as_ref().unwrap()["location"], "Paris");
    }

    #[test]
    fn test_map_html_embeds_center_and_features() {
        let records = vec![record("Tokyo", Some((35.68, 139.69)), Some("POINT(139.69 35.68)"))];
        let html = render_map_html(&records).unwrap();
        assert!(html.contains("setView([35.68, 139.69], 5)"));
        assert!(html.contains("\"FeatureCollection\""));
        assert!(!html.contains("__FEATURES__"));
    }

    #[test]
    fn test_map_html_without_coordinates() {
        let html = render_map_html(&[]).unwrap();
        assert!(html.contains("setView([20, 0], 2)"));
    }

    #[test]
    fn test_save_json_creates_dir() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("artifacts");
        let records = vec![record("Tokyo", Some((35.68, 139.69)), None)];
        let path = save_json(&records, &target, "results.json").unwrap();

        let back: Vec<LocationRecord> = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(back, records);
    }
}
