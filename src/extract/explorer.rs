//! The entity explorer: article text in, categorised entities and
//! map-ready locations out.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::llm::ChatModel;
use super::parser;
use super::prompts::PromptKind;
use super::ExtractError;
use crate::config::LlmConfig;
use crate::location::{LocationPipeline, LocationRecord, SourceLocations};

/// Everything extracted from one article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub event_types: String,
    pub entities: String,
    pub names: String,
    /// One record per location mention, in mention order.
    #[serde(rename = "geojson_data")]
    pub locations: Vec<LocationRecord>,
    pub raw_text: String,
}

#[derive(Clone)]
pub struct EntityExplorer {
    model: Arc<dyn ChatModel>,
    llm: LlmConfig,
    pipeline: LocationPipeline,
}

impl EntityExplorer {
    pub fn new(model: Arc<dyn ChatModel>, llm: LlmConfig, pipeline: LocationPipeline) -> Self {
        Self { model, llm, pipeline }
    }

    fn model_for(&self, kind: PromptKind) -> &str {
        if kind.uses_llama_model() {
            &self.llm.llama_model
        } else {
            &self.llm.model
        }
    }

    /// Run one prompt and return the raw model reply.
    pub async fn complete(&self, kind: PromptKind, text: &str) -> Result<String, ExtractError> {
        let model = Arc::clone(&self.model);
        let model_name = self.model_for(kind).to_string();
        let prompt = kind.render(text);

        tokio::task::spawn_blocking(move || model.complete(&model_name, &prompt))
            .await
            .map_err(|e| ExtractError::Task(e.to_string()))?
            .map_err(ExtractError::from)
    }

    /// Run a prompt by task name and parse the reply into its field.
    pub async fn extract_named(&self, kind: &str, text: &str) -> Result<String, ExtractError> {
        let kind: PromptKind = kind.parse()?;
        if text.trim().is_empty() {
            return Err(ExtractError::EmptyInput);
        }
        let reply = self.complete(kind, text).await?;
        Ok(parse_reply(kind, &reply))
    }

    /// Full analysis of one article.
    pub async fn process_text(&self, text: &str) -> Result<AnalysisReport, ExtractError> {
        if text.trim().is_empty() {
            return Err(ExtractError::EmptyInput);
        }

        let (event_reply, entity_reply, name_reply, location_reply) = tokio::try_join!(
            self.complete(PromptKind::EventType, text),
            self.complete(PromptKind::Entities, text),
            self.complete(PromptKind::Names, text),
            self.complete(PromptKind::Locations, text),
        )
        .inspect_err(|e| error!(target: "llm", error = %e, "text processing failed"))?;

        let raw_locations = parser::extract_locations(&location_reply);
        info!(target: "pipeline", locations = %raw_locations, "extracted location list");

        let batch = self
            .pipeline
            .resolve(vec![SourceLocations::new("article", raw_locations)])
            .await;

        Ok(AnalysisReport {
            event_types: parser::extract_event_types(&event_reply),
            entities: parser::extract_entities(&entity_reply),
            names: parser::extract_names(&name_reply),
            locations: batch.records(),
            raw_text: text.to_string(),
        })
    }
}

/// Parse a model reply with the extractor matching its task.
pub fn parse_reply(kind: PromptKind, reply: &str) -> String {
    match kind {
        PromptKind::EventType => parser::extract_event_types(reply),
        PromptKind::Entities => parser::extract_entities(reply),
        PromptKind::Names => parser::extract_names(reply),
        PromptKind::Locations => parser::extract_locations(reply),
        PromptKind::PhoneNumbers => parser::extract_phone_numbers(reply),
    }
}
