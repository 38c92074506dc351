//! Location resolution pipeline.
//!
//! Flow per source: split → (per mention, concurrently) geocode → select → WKT.
//! Output order is source order, then mention order, regardless of which
//! lookup finishes first. One mention failing never affects its siblings.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use wkt::ToWkt;

use super::nominatim::{Geocoder, Lookup};
use super::selector::select_geometry;
use super::splitter::split_mentions;
use super::types::{ChosenGeometry, LocationMention, ResolutionStatus, ResolvedBatch, ResolvedLocation};
use crate::config::{ConfigError, PipelineConfig};

const TARGET_PIPELINE: &str = "pipeline";

/// Source id used when a caller resolves a single raw string.
pub const DEFAULT_SOURCE_ID: &str = "input";

/// A raw location list and the text it was extracted from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocations {
    pub source_id: String,
    pub raw_locations: String,
}

impl SourceLocations {
    pub fn new(source_id: impl Into<String>, raw_locations: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            raw_locations: raw_locations.into(),
        }
    }
}

/// The location pipeline with its geocoder and concurrency cap.
#[derive(Clone)]
pub struct LocationPipeline {
    geocoder: Arc<dyn Geocoder>,
    concurrency: usize,
}

impl LocationPipeline {
    pub fn new(geocoder: Arc<dyn Geocoder>, config: &PipelineConfig) -> Result<Self, ConfigError> {
        if config.concurrency == 0 {
            return Err(ConfigError::Invalid("pipeline concurrency must be at least 1".into()));
        }
        Ok(Self {
            geocoder,
            concurrency: config.concurrency,
        })
    }

    /// Resolve a single raw location string.
    pub async fn resolve_raw(&self, raw_locations: &str) -> ResolvedBatch {
        self.resolve(vec![SourceLocations::new(DEFAULT_SOURCE_ID, raw_locations)])
            .await
    }

    /// Resolve every mention of every source. Always returns a batch.
    pub async fn resolve(&self, sources: Vec<SourceLocations>) -> ResolvedBatch {
        let mentions: Vec<LocationMention> = sources
            .iter()
            .flat_map(|s| split_mentions(&s.source_id, &s.raw_locations))
            .collect();

        if mentions.is_empty() {
            debug!(target: TARGET_PIPELINE, sources = sources.len(), "no location mentions to resolve");
            return ResolvedBatch::default();
        }

        info!(
            target: TARGET_PIPELINE,
            sources = sources.len(),
            mentions = mentions.len(),
            concurrency = self.concurrency,
            "resolving locations"
        );

        let permits = Arc::new(Semaphore::new(self.concurrency));
        let handles: Vec<_> = mentions
            .iter()
            .cloned()
            .map(|mention| {
                let permits = Arc::clone(&permits);
                let geocoder = Arc::clone(&self.geocoder);
                tokio::spawn(async move {
                    let _permit = permits.acquire_owned().await.ok();
                    tokio::task::spawn_blocking(move || resolve_mention(geocoder.as_ref(), mention)).await
                })
            })
            .collect();

        // Slots are indexed by input position, not completion order.
        let mut slots: Vec<Option<ResolvedLocation>> = vec![None; mentions.len()];
        for (index, handle) in handles.into_iter().enumerate() {
            let resolved = match handle.await {
                Ok(Ok(resolved)) => resolved,
                Ok(Err(e)) | Err(e) => {
                    warn!(
                        target: TARGET_PIPELINE,
                        mention = %mentions[index].raw_text,
                        error = %e,
                        "resolution task failed"
                    );
                    ResolvedLocation::unavailable(mentions[index].clone(), format!("resolution task failed: {}", e))
                }
            };
            slots[index] = Some(resolved);
        }

        let locations: Vec<ResolvedLocation> = slots.into_iter().flatten().collect();
        let resolved = locations.iter().filter(|l| l.chosen_geometry.is_some()).count();
        info!(target: TARGET_PIPELINE, total = locations.len(), resolved, "locations resolved");

        ResolvedBatch { locations }
    }
}

/// Geocode one mention and pick its geometry. Blocking.
pub fn resolve_mention(geocoder: &dyn Geocoder, mention: LocationMention) -> ResolvedLocation {
    match geocoder.lookup(&mention.raw_text) {
        Lookup::Unavailable(e) => ResolvedLocation::unavailable(mention, e.to_string()),
        Lookup::Found(candidates) => {
            let chosen_geometry = select_geometry(&candidates).map(|selection| ChosenGeometry {
                kind: selection.kind,
                candidate_index: selection.candidate_index,
                wkt: selection.geometry.wkt_string(),
            });

            let status = if chosen_geometry.is_some() {
                ResolutionStatus::Resolved
            } else if candidates.is_empty() {
                ResolutionStatus::NoCandidates
            } else {
                ResolutionStatus::NoUsableGeometry
            };

            debug!(
                target: TARGET_PIPELINE,
                mention = %mention.raw_text,
                candidates = candidates.len(),
                ?status,
                "mention resolved"
            );

            ResolvedLocation {
                mention,
                chosen_geometry,
                all_candidates: candidates,
                status,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::types::{GeocodeCandidate, GeocodeError, GeometryKind};
    use serde_json::json;

    struct ScriptedGeocoder;

    impl Geocoder for ScriptedGeocoder {
        fn search(&self, query: &str) -> Result<Vec<GeocodeCandidate>, GeocodeError> {
            match query {
                "Nowhere" => Ok(Vec::new()),
                "Down" => Err(GeocodeError::Timeout),
                "Line" => Ok(vec![GeocodeCandidate {
                    latitude: Some(1.0),
                    longitude: Some(2.0),
                    display_name: None,
                    geometry_type: GeometryKind::Other,
                    geometry_payload: Some(json!({"type": "LineString", "coordinates": [[0, 0], [1, 1]]})),
                }]),
                _ => Ok(vec![GeocodeCandidate {
                    latitude: Some(10.0),
                    longitude: Some(20.0),
                    display_name: Some(query.to_string()),
                    geometry_type: GeometryKind::Point,
                    geometry_payload: Some(json!({"type": "Point", "coordinates": [20.0, 10.0]})),
                }]),
            }
        }
    }

    fn mention(text: &str) -> LocationMention {
        LocationMention {
            source_id: "s".into(),
            raw_text: text.into(),
            sequence_index: 0,
        }
    }

    #[test]
    fn test_resolve_mention_statuses() {
        let ok = resolve_mention(&ScriptedGeocoder, mention("Oslo"));
        assert_eq!(ok.status, ResolutionStatus::Resolved);
        let wkt = ok.chosen_geometry.unwrap().wkt;
        assert!(wkt.starts_with("POINT"), "{}", wkt);

        let empty = resolve_mention(&ScriptedGeocoder, mention("Nowhere"));
        assert_eq!(empty.status, ResolutionStatus::NoCandidates);
        assert!(empty.chosen_geometry.is_none());

        let unusable = resolve_mention(&ScriptedGeocoder, mention("Line"));
        assert_eq!(unusable.status, ResolutionStatus::NoUsableGeometry);
        assert_eq!(unusable.all_candidates.len(), 1);

        let down = resolve_mention(&ScriptedGeocoder, mention("Down"));
        assert!(down.status.is_failure());
        assert!(down.chosen_geometry.is_none());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let result = LocationPipeline::new(Arc::new(ScriptedGeocoder), &PipelineConfig { concurrency: 0 });
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_empty_input_gives_empty_batch() {
        let pipeline = LocationPipeline::new(Arc::new(ScriptedGeocoder), &PipelineConfig::default()).unwrap();
        assert!(pipeline.resolve_raw("").await.is_empty());
        assert!(pipeline.resolve_raw("No specific locations mentioned").await.is_empty());
        assert!(pipeline.resolve(Vec::new()).await.is_empty());
    }

    #[tokio::test]
    async fn test_sources_keep_their_order() {
        let pipeline = LocationPipeline::new(Arc::new(ScriptedGeocoder), &PipelineConfig { concurrency: 2 }).unwrap();
        let batch = pipeline
            .resolve(vec![
                SourceLocations::new("a", "[Oslo; Down]"),
                SourceLocations::new("b", ""),
                SourceLocations::new("c", "Nowhere; Bergen, Norway"),
            ])
            .await;

        let texts: Vec<&str> = batch.iter().map(|l| l.mention.raw_text.as_str()).collect();
        assert_eq!(texts, vec!["Oslo", "Down", "Nowhere", "Bergen, Norway"]);
        assert_eq!(batch.for_source("a").count(), 2);
        assert_eq!(batch.for_source("b").count(), 0);
        assert_eq!(batch.for_source("c").nth(1).unwrap().mention.sequence_index, 1);
    }
}
