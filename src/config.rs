//! Engine configuration.

use crate::openapi::{ConversionError, OpenAPIDocument, OpenAPIParseError};
use crate::resolver::StaticSchemaClient;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// The API server's default admission webhook timeout.
pub const DEFAULT_SCHEMA_TIMEOUT_MS: u64 = 10_000;

/// EngineConfig holds the settings of a mutation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Upper bound on schema resolution per request, in milliseconds.
    pub schema_timeout_ms: u64,

    /// OpenAPI v3 documents making up the static schema set.
    pub openapi_documents: Vec<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            schema_timeout_ms: DEFAULT_SCHEMA_TIMEOUT_MS,
            openapi_documents: Vec::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("{}: {source}", .path.display())]
    OpenAPI {
        path: PathBuf,
        #[source]
        source: OpenAPIParseError,
    },
}

impl EngineConfig {
    /// Reads a YAML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = read(path.as_ref())?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn schema_timeout(&self) -> Duration {
        Duration::from_millis(self.schema_timeout_ms)
    }

    /// Parses every configured OpenAPI document, JSON or YAML.
    pub fn load_documents(&self) -> Result<Vec<OpenAPIDocument>, ConfigError> {
        self.openapi_documents
            .iter()
            .map(|path| {
                let contents = read(path)?;
                let parsed = if path.extension().is_some_and(|ext| ext == "json") {
                    OpenAPIDocument::from_json(&contents)
                } else {
                    OpenAPIDocument::from_yaml(&contents)
                };
                parsed.map_err(|source| ConfigError::OpenAPI {
                    path: path.clone(),
                    source,
                })
            })
            .collect()
    }

    /// Builds the static schema client from the configured documents.
    pub fn static_client(&self) -> Result<(StaticSchemaClient, Vec<ConversionError>), ConfigError> {
        let docs = self.load_documents()?;
        Ok(StaticSchemaClient::from_openapi(&docs))
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
