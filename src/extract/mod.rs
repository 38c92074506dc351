//! LLM-backed extraction of event types, organisations, people and
//! location lists from article text.

pub mod explorer;
pub mod llm;
pub mod parser;
pub mod prompts;

pub use explorer::{AnalysisReport, EntityExplorer};
pub use llm::{ChatModel, LlmError, OpenAiCompatClient};
pub use prompts::PromptKind;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("input text cannot be empty")]
    EmptyInput,
    #[error("unknown prompt type: {0}")]
    UnknownPromptKind(String),
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("extraction task failed: {0}")]
    Task(String),
}
