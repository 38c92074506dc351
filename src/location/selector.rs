//! Picks one representative geometry per mention.
//!
//! Policy: the first Polygon/MultiPolygon in provider order wins; failing
//! that, the first Point; otherwise nothing. Candidates whose payload does
//! not parse into a valid shape are skipped as if absent.

use super::nominatim::TARGET_GEOCODE;
use super::types::{GeocodeCandidate, GeometryError, GeometryKind};
use geo_types::Geometry;
use tracing::warn;

/// The winning candidate and its parsed shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub candidate_index: usize,
    pub kind: GeometryKind,
    pub geometry: Geometry<f64>,
}

/// Select the best geometry for one mention. Never fails.
pub fn select_geometry(candidates: &[GeocodeCandidate]) -> Option<Selection> {
    first_valid(candidates, GeometryKind::is_area)
        .or_else(|| first_valid(candidates, |kind| kind == GeometryKind::Point))
}

fn first_valid(candidates: &[GeocodeCandidate], wanted: impl Fn(GeometryKind) -> bool) -> Option<Selection> {
    candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| wanted(c.geometry_type))
        .find_map(|(index, candidate)| match candidate_geometry(candidate) {
            Ok(geometry) => Some(Selection {
                candidate_index: index,
                kind: candidate.geometry_type,
                geometry,
            }),
            Err(e) => {
                warn!(
                    target: TARGET_GEOCODE,
                    candidate = index,
                    display_name = candidate.display_name.as_deref().unwrap_or(""),
                    error = %e,
                    "skipping candidate geometry"
                );
                None
            }
        })
}

/// Parse a candidate's payload, checking it matches the declared kind.
pub fn candidate_geometry(candidate: &GeocodeCandidate) -> Result<Geometry<f64>, GeometryError> {
    let payload = candidate.geometry_payload.as_ref().ok_or(GeometryError::Missing)?;
    let geometry = parse_geometry(payload)?;

    let actual = kind_of(&geometry);
    if actual != candidate.geometry_type {
        return Err(GeometryError::KindMismatch {
            declared: candidate.geometry_type,
            actual,
        });
    }
    Ok(geometry)
}

/// Parse a GeoJSON geometry object into a `geo_types` shape.
pub fn parse_geometry(payload: &serde_json::Value) -> Result<Geometry<f64>, GeometryError> {
    let geometry = geojson::Geometry::from_json_value(payload.clone())
        .map_err(|e| GeometryError::Malformed(e.to_string()))?;

    validate(&geometry.value)?;

    Geometry::<f64>::try_from(geometry.value).map_err(|e| GeometryError::Malformed(e.to_string()))
}

fn kind_of(geometry: &Geometry<f64>) -> GeometryKind {
    match geometry {
        Geometry::Point(_) => GeometryKind::Point,
        Geometry::Polygon(_) => GeometryKind::Polygon,
        Geometry::MultiPolygon(_) => GeometryKind::MultiPolygon,
        _ => GeometryKind::Other,
    }
}

// Structural checks geojson's own parser leaves to the consumer.
fn validate(value: &geojson::Value) -> Result<(), GeometryError> {
    match value {
        geojson::Value::Point(position) => check_position(position),
        geojson::Value::Polygon(rings) => check_polygon(rings),
        geojson::Value::MultiPolygon(polygons) => {
            if polygons.is_empty() {
                return Err(GeometryError::Malformed("multipolygon has no polygons".into()));
            }
            polygons.iter().try_for_each(|rings| check_polygon(rings))
        }
        geojson::Value::MultiPoint(points) | geojson::Value::LineString(points) => {
            points.iter().try_for_each(|p| check_position(p))
        }
        geojson::Value::MultiLineString(lines) => {
            lines.iter().flatten().try_for_each(|p| check_position(p))
        }
        geojson::Value::GeometryCollection(members) => {
            members.iter().try_for_each(|g| validate(&g.value))
        }
    }
}

fn check_polygon(rings: &[Vec<Vec<f64>>]) -> Result<(), GeometryError> {
    let exterior = rings
        .first()
        .ok_or_else(|| GeometryError::Malformed("polygon has no rings".into()))?;
    if exterior.len() < 4 {
        return Err(GeometryError::Malformed(format!(
            "exterior ring has {} positions, need at least 4",
            exterior.len()
        )));
    }
    rings.iter().flatten().try_for_each(|p| check_position(p))
}

fn check_position(position: &[f64]) -> Result<(), GeometryError> {
    if position.len() < 2 {
        return Err(GeometryError::Malformed(format!("position has {} ordinates", position.len())));
    }
    if !position.iter().all(|v| v.is_finite()) {
        return Err(GeometryError::Malformed("non-finite ordinate".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn candidate(kind: GeometryKind, payload: serde_json::Value) -> GeocodeCandidate {
        GeocodeCandidate {
            latitude: Some(0.0),
            longitude: Some(0.0),
            display_name: None,
            geometry_type: kind,
            geometry_payload: Some(payload),
        }
    }

    fn point(lon: f64, lat: f64) -> GeocodeCandidate {
        candidate(GeometryKind::Point, json!({"type": "Point", "coordinates": [lon, lat]}))
    }

    fn square(x: f64) -> GeocodeCandidate {
        candidate(
            GeometryKind::Polygon,
            json!({"type": "Polygon", "coordinates": [[[x, 0.0], [x + 1.0, 0.0], [x + 1.0, 1.0], [x, 1.0], [x, 0.0]]]}),
        )
    }

    fn multi_square(x: f64) -> GeocodeCandidate {
        candidate(
            GeometryKind::MultiPolygon,
            json!({"type": "MultiPolygon", "coordinates": [[[[x, 0.0], [x + 1.0, 0.0], [x + 1.0, 1.0], [x, 0.0]]]]}),
        )
    }

    #[test]
    fn test_polygon_beats_earlier_point() {
        let candidates = vec![point(1.0, 2.0), square(10.0), point(3.0, 4.0)];
        let chosen = select_geometry(&candidates).unwrap();
        assert_eq!(chosen.candidate_index, 1);
        assert_eq!(chosen.kind, GeometryKind::Polygon);
    }

    #[test]
    fn test_first_area_wins_in_provider_order() {
        let candidates = vec![point(0.0, 0.0), multi_square(5.0), square(20.0)];
        let chosen = select_geometry(&candidates).unwrap();
        assert_eq!(chosen.candidate_index, 1);
        assert_eq!(chosen.kind, GeometryKind::MultiPolygon);
        assert!(matches!(chosen.geometry, Geometry::MultiPolygon(_)));
    }

    #[test]
    fn test_first_point_when_no_area() {
        let candidates = vec![point(7.0, 8.0), point(9.0, 10.0)];
        let chosen = select_geometry(&candidates).unwrap();
        assert_eq!(chosen.candidate_index, 0);
        match chosen.geometry {
            Geometry::Point(p) => {
                assert_eq!(p.x(), 7.0);
                assert_eq!(p.y(), 8.0);
            }
            other => panic!("expected point, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_list_selects_nothing() {
        assert!(select_geometry(&[]).is_none());
    }

    #[test]
    fn test_unsupported_kinds_ignored() {
        let line = candidate(
            GeometryKind::Other,
            json!({"type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 1.0]]}),
        );
        assert!(select_geometry(&[line]).is_none());
    }

    #[test]
    fn test_malformed_polygon_falls_through_to_point() {
        let broken = candidate(GeometryKind::Polygon, json!({"type": "Polygon", "coordinates": "garbage"}));
        let candidates = vec![broken, point(2.0, 3.0)];
        let chosen = select_geometry(&candidates).unwrap();
        assert_eq!(chosen.candidate_index, 1);
        assert_eq!(chosen.kind, GeometryKind::Point);
    }

    #[test]
    fn test_all_malformed_selects_nothing() {
        let candidates = vec![
            candidate(GeometryKind::Polygon, json!({"type": "Polygon", "coordinates": []})),
            candidate(GeometryKind::MultiPolygon, json!({"type": "MultiPolygon", "coordinates": []})),
            candidate(GeometryKind::Point, json!({"type": "Point", "coordinates": []})),
            candidate(GeometryKind::Point, json!({"type": "Point"})),
            GeocodeCandidate {
                geometry_payload: None,
                ..point(0.0, 0.0)
            },
        ];
        assert!(select_geometry(&candidates).is_none());
    }

    #[test]
    fn test_declared_kind_must_match_payload() {
        let liar = candidate(GeometryKind::Polygon, json!({"type": "Point", "coordinates": [1.0, 1.0]}));
        assert!(matches!(
            candidate_geometry(&liar),
            Err(GeometryError::KindMismatch { .. })
        ));
        assert!(select_geometry(&[liar]).is_none());
    }

    #[test]
    fn test_parse_geometry_rejects_short_ring() {
        let payload = json!({"type": "Polygon", "coordinates": [[[0.0, 0.0], [1.0, 1.0]]]});
        assert!(parse_geometry(&payload).is_err());
    }
}
