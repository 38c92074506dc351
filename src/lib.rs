//! Event Atlas: pulls event types, organisations, people and places out of
//! article text with a language model, then resolves every place to a
//! map-ready geometry through Nominatim.

pub mod config;
pub mod extract;
pub mod location;
pub mod logging;
pub mod output;
pub mod server;

pub use config::AtlasConfig;
pub use location::{LocationPipeline, ResolvedBatch};
