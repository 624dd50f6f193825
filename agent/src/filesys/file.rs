//! JSON configuration files on disk

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tokio::fs;

use crate::errors::AgentError;

/// A JSON document read from a fixed path
#[derive(Debug, Clone)]
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse the document; `Ok(None)` when the file does not exist.
    ///
    /// Read and parse failures are reported as [`AgentError::ConfigError`]
    /// naming the path.
    pub async fn load<T: DeserializeOwned>(&self) -> Result<Option<T>, AgentError> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AgentError::ConfigError(format!(
                    "{}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| AgentError::ConfigError(format!("{}: {}", self.path.display(), e)))
    }
}
