//! services/web/src/adapters/definitions.rs
//!
//! File-backed implementation of the `DefinitionSource` port. Survey
//! definitions are JSON documents in the config directory, parsed and
//! validated once and cached for the process lifetime.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use survey_core::definition::SurveyDefinition;
use survey_core::ports::{DefinitionSource, PortError, PortResult};
use tokio::sync::RwLock;

/// A definition source reading JSON documents from a directory.
pub struct FileDefinitionSource {
    dir: PathBuf,
    cache: RwLock<HashMap<String, Arc<SurveyDefinition>>>,
}

impl FileDefinitionSource {
    /// Creates a new `FileDefinitionSource` rooted at `dir`.
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn resolve(&self, file: &str) -> PortResult<PathBuf> {
        // Definition references come from the survey catalog, but a
        // traversal outside the config directory is never legitimate.
        if file.contains("..") || file.contains('/') || file.contains('\\') {
            return Err(PortError::NotFound(format!("Invalid definition reference '{}'", file)));
        }
        Ok(self.dir.join(file))
    }
}

#[async_trait]
impl DefinitionSource for FileDefinitionSource {
    async fn load(&self, file: &str) -> PortResult<Arc<SurveyDefinition>> {
        if let Some(def) = self.cache.read().await.get(file) {
            return Ok(def.clone());
        }

        let path = self.resolve(file)?;
        let raw = tokio::fs::read_to_string(&path).await.map_err(|e| {
            PortError::NotFound(format!("Definition '{}' unreadable: {}", file, e))
        })?;

        let mut def: SurveyDefinition = serde_json::from_str(&raw).map_err(|e| {
            PortError::Unexpected(format!("Definition '{}' is not valid JSON: {}", file, e))
        })?;
        def.validate().map_err(|e| {
            PortError::Unexpected(format!("Definition '{}' failed validation: {}", file, e))
        })?;

        let def = Arc::new(def);
        self.cache
            .write()
            .await
            .insert(file.to_string(), def.clone());
        Ok(def)
    }
}
