//! Adapter for document records produced by external loaders and retrievers.
//!
//! Retrieval systems commonly hand back documents as `{page_content,
//! metadata}` records (the LangChain document shape). [`ExternalDocuments`]
//! wraps such a set and yields one [`DocumentSource`] per record, taking the
//! owner from a metadata key.

use super::{Source, SourceFuture};
use crate::PromptError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::debug;

/// Metadata key read for the owner identity unless overridden.
pub const DEFAULT_OWNER_KEY: &str = "owner_id";

/// A document record from an external loader.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Document {
    pub page_content: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Document {
    pub fn new(page_content: impl Into<String>) -> Self {
        Self {
            page_content: page_content.into(),
            metadata: Map::new(),
        }
    }

    /// Add a metadata entry (builder pattern).
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Read a metadata value as a string. Numbers and booleans are stringified;
    /// null, arrays, and objects yield `None`.
    pub fn metadata_str(&self, key: &str) -> Option<String> {
        match self.metadata.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

/// A set of externally supplied documents.
#[derive(Debug, Clone, Default)]
pub struct ExternalDocuments {
    documents: Vec<Document>,
    owner_key: String,
}

impl ExternalDocuments {
    pub fn new(documents: Vec<Document>) -> Self {
        Self {
            documents,
            owner_key: DEFAULT_OWNER_KEY.to_string(),
        }
    }

    /// Read ownership from a different metadata key.
    pub fn with_owner_key(mut self, key: impl Into<String>) -> Self {
        self.owner_key = key.into();
        self
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// One source per document, in document order.
    pub fn into_sources(self) -> Vec<DocumentSource> {
        let owner_key = self.owner_key;
        self.documents
            .into_iter()
            .enumerate()
            .map(|(i, doc)| {
                let owner_id = doc.metadata_str(&owner_key);
                let label = match doc.metadata_str("source") {
                    Some(origin) => format!("document {origin}"),
                    None => format!("document #{i}"),
                };
                DocumentSource {
                    content: doc.page_content,
                    owner_id,
                    label,
                }
            })
            .collect()
    }
}

impl From<Vec<Document>> for ExternalDocuments {
    fn from(documents: Vec<Document>) -> Self {
        Self::new(documents)
    }
}

/// A single document exposed as a [`Source`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSource {
    content: String,
    owner_id: Option<String>,
    label: String,
}

impl Source for DocumentSource {
    fn content(&self) -> SourceFuture<'_> {
        let content = self.content.clone();
        Box::pin(async move { Ok(content) })
    }

    fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }

    fn label(&self) -> String {
        self.label.clone()
    }
}

/// Load documents from a JSON array or a JSON Lines file.
///
/// The format is detected from the first non-whitespace character: `[`
/// means a JSON array, anything else is parsed one document per non-blank
/// line.
pub async fn load_documents(path: &Path) -> Result<ExternalDocuments, PromptError> {
    let label = format!("documents file {}", path.display());
    let resolution_error = |reason: String| PromptError::SourceResolution {
        source_label: label.clone(),
        reason,
    };

    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| resolution_error(e.to_string()))?;

    let documents = parse_documents(&text).map_err(resolution_error)?;
    debug!("Loaded {} document(s) from {}", documents.len(), path.display());
    Ok(ExternalDocuments::new(documents))
}

fn parse_documents(text: &str) -> Result<Vec<Document>, String> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).map_err(|e| format!("invalid JSON array: {e}"));
    }

    trimmed
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line).map_err(|e| format!("invalid document on line {}: {e}", n + 1))
        })
        .collect()
}
