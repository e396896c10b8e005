use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

const DEFAULT_FSM_KEYWORDS: [&str; 6] = ["fsm", "state", "count", "cnt", "step", "mode"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Settings threaded into every analysis entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Hierarchical scope to analyze; `None` walks every bound signal.
    pub top_module: Option<String>,
    /// Deepest expression nesting the extractor follows before giving up.
    pub max_depth: usize,
    /// Name fragments that mark a register as a state-machine candidate.
    pub fsm_keywords: Vec<String>,
    /// Extra name fragments searched in addition to `fsm_keywords`.
    pub search_targets: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            top_module: None,
            max_depth: 256,
            fsm_keywords: DEFAULT_FSM_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            search_targets: Vec::new(),
        }
    }
}

impl AnalysisConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn with_top_module(mut self, top: impl Into<String>) -> Self {
        self.top_module = Some(top.into());
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Lower-cased keywords used to spot state-machine registers.
    pub fn fsm_patterns(&self) -> Vec<String> {
        self.fsm_keywords
            .iter()
            .chain(&self.search_targets)
            .map(|s| s.to_lowercase())
            .collect()
    }
}
