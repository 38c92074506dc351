//! Location subsystem for Event Atlas.
//!
//! Turns a model-emitted location list into map-ready records:
//! mention splitting, Nominatim geocoding, shape selection and the
//! concurrent pipeline that ties them together.

pub mod nominatim;
pub mod pipeline;
pub mod selector;
pub mod splitter;
pub mod types;

pub use nominatim::{Geocoder, Lookup, NominatimClient};
pub use pipeline::{LocationPipeline, SourceLocations};
pub use selector::{select_geometry, Selection};
pub use splitter::{split_locations, split_mentions, NO_LOCATIONS_SENTINEL};
pub use types::{
    ChosenGeometry, GeoPoint, GeocodeCandidate, GeocodeError, GeometryKind, LocationMention, LocationRecord,
    ResolutionStatus, ResolvedBatch, ResolvedLocation,
};
