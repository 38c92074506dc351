//! Runtime configuration at ~/.event_atlas/config.json.
//!
//! Every field has a default, so a partial (or missing) file is fine.
//! The LLM API key is never required in the file: when absent it is
//! read from the environment variable named by `llm.api_key_env`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Settings for the geocoding client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    pub endpoint_url: String,
    /// Nominatim's usage policy requires an identifying agent.
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Maximum candidates requested per mention.
    pub candidate_cap: usize,
    pub language: String,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            endpoint_url: "https://nominatim.openstreetmap.org/search".into(),
            user_agent: concat!("EventAtlas/", env!("CARGO_PKG_VERSION"), " (location-resolver)").into(),
            timeout_secs: 10,
            candidate_cap: 2,
            language: "en".into(),
        }
    }
}

impl GeocoderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Outbound geocoding requests in flight at once.
    pub concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { concurrency: 4 }
    }
}

/// Chat-completion backend used for extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub api_key_env: String,
    pub model: String,
    /// Model used for event types, organisations, names and phone numbers.
    pub llama_model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.deepinfra.com/v1/openai".into(),
            api_key: None,
            api_key_env: "DEEPINFRA_API_KEY".into(),
            model: "microsoft/WizardLM-2-8x22B".into(),
            llama_model: "meta-llama/Meta-Llama-3.1-70B-Instruct".into(),
            max_tokens: 256,
            temperature: 0.1,
            timeout_secs: 60,
        }
    }
}

impl LlmConfig {
    /// Explicit key first, then the environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(&self.api_key_env).ok().filter(|k| !k.trim().is_empty()))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasConfig {
    pub geocoder: GeocoderConfig,
    pub pipeline: PipelineConfig,
    pub llm: LlmConfig,
    /// Where `results.json` and `map.html` are written.
    pub artifacts_dir: PathBuf,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            geocoder: GeocoderConfig::default(),
            pipeline: PipelineConfig::default(),
            llm: LlmConfig::default(),
            artifacts_dir: PathBuf::from("artifacts"),
        }
    }
}

impl AtlasConfig {
    /// Load from the default path; a missing file yields defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_path())
    }

    /// Load from a specific path; a missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let data = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io { path: path.to_path_buf(), source });
            }
        };

        let config: Self = serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".event_atlas")
            .join("config.json")
    }

    /// Reject settings that would make the pipeline unable to do any work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.geocoder.candidate_cap == 0 {
            return Err(ConfigError::Invalid("geocoder.candidate_cap must be at least 1".into()));
        }
        if self.geocoder.timeout_secs == 0 {
            return Err(ConfigError::Invalid("geocoder.timeout_secs must be at least 1".into()));
        }
        if self.geocoder.endpoint_url.trim().is_empty() {
            return Err(ConfigError::Invalid("geocoder.endpoint_url is empty".into()));
        }
        if self.pipeline.concurrency == 0 {
            return Err(ConfigError::Invalid("pipeline.concurrency must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = AtlasConfig::load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, AtlasConfig::default());
        assert_eq!(config.geocoder.candidate_cap, 2);
        assert_eq!(config.geocoder.timeout_secs, 10);
    }

    #[test]
    fn test_partial_file_merges_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"pipeline": {"concurrency": 8}, "geocoder": {"language": "fr"}}"#).unwrap();

        let config = AtlasConfig::load_from(&path).unwrap();
        assert_eq!(config.pipeline.concurrency, 8);
        assert_eq!(config.geocoder.language, "fr");
        assert_eq!(config.geocoder.candidate_cap, 2);
        assert_eq!(config.llm.max_tokens, 256);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(AtlasConfig::load_from(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"pipeline": {"concurrency": 0}}"#).unwrap();
        assert!(matches!(AtlasConfig::load_from(&path), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_explicit_api_key_wins() {
        let llm = LlmConfig {
            api_key: Some("from-file".into()),
            api_key_env: "EVENT_ATLAS_TEST_UNSET_KEY".into(),
            ..LlmConfig::default()
        };
        assert_eq!(llm.resolve_api_key().as_deref(), Some("from-file"));

        let blank = LlmConfig {
            api_key: Some("  ".into()),
            api_key_env: "EVENT_ATLAS_TEST_UNSET_KEY".into(),
            ..LlmConfig::default()
        };
        assert_eq!(blank.resolve_api_key(), None);
    }
}
