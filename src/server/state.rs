use crate::extract::EntityExplorer;
use crate::location::LocationPipeline;

pub struct AppState {
    pub pipeline: LocationPipeline,
    /// `None` when no LLM key is configured; location endpoints still work.
    pub explorer: Option<EntityExplorer>,
}
