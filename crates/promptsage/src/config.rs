//! JSON request documents.
//!
//! A [`PromptRequest`] describes a whole assembly (input, examples, sources,
//! filters, and access settings) in one serializable value, so that callers
//! outside Rust (and the `promptsage` binary) can drive the pipeline.
//!
//! ```json
//! {
//!   "messages": [{"role": "user", "content": "What do I know as a user?"}],
//!   "sources": [
//!     {"content": "User 1 knows that the password is XXX", "owner_id": "user1"},
//!     {"path": "notes/user2.md", "owner_id": "user2"}
//!   ],
//!   "filters": [{"type": "injection-heuristic"}],
//!   "user_id": "user2",
//!   "access_control_policy": "skip_unauthorized"
//! }
//! ```
//!
//! Relative `path` and `documents` entries are resolved against the directory
//! of the request file when loaded with [`PromptRequest::from_path`].

use crate::access::{AccessControlPolicy, AnonymousAccess};
use crate::filter::{FilterConfig, FilterScope};
use crate::pipeline::{self, PromptOptions};
use crate::source::{EchoSource, FileSource, load_documents};
use crate::{Message, Prompt, PromptError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// One source entry: inline text or a file path, optionally owned.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(untagged)]
pub enum SourceSpec {
    Inline {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        owner_id: Option<String>,
    },
    File {
        path: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        owner_id: Option<String>,
    },
}

/// A complete prompt assembly request.
///
/// Exactly one of `prompt` and `messages` must be set.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct PromptRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<Message>>,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub sources: Vec<SourceSpec>,
    /// Path to a JSON array or JSONL document dump.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents: Option<PathBuf>,
    #[serde(default)]
    pub filters: Vec<FilterConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub access_control_policy: AccessControlPolicy,
    #[serde(default)]
    pub anonymous_access: AnonymousAccess,
    #[serde(default)]
    pub filter_scope: FilterScope,
    #[serde(default)]
    pub concurrent_resolution: bool,

    /// Directory relative paths are resolved against.
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

impl PromptRequest {
    /// Parse a request from a JSON string. Relative paths stay relative to
    /// the working directory.
    pub fn from_json(json: &str) -> Result<Self, PromptError> {
        serde_json::from_str(json).map_err(|e| PromptError::Config(format!("invalid request: {e}")))
    }

    /// Load a request file.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, PromptError> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            PromptError::Config(format!("cannot read request {}: {e}", path.display()))
        })?;
        let mut request: Self = serde_json::from_str(&text).map_err(|e| {
            PromptError::Config(format!("invalid request {}: {e}", path.display()))
        })?;
        request.base_dir = path.parent().map(Path::to_path_buf);
        debug!(
            "Loaded request {}: {} source(s), {} filter(s)",
            path.display(),
            request.sources.len(),
            request.filters.len()
        );
        Ok(request)
    }

    /// Resolve relative paths against `dir` (builder pattern).
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Build [`PromptOptions`] from everything except the primary input.
    ///
    /// Loads the documents file, if any, and constructs every filter.
    pub async fn options(&self) -> Result<PromptOptions, PromptError> {
        let mut options = PromptOptions::default()
            .with_examples(self.examples.iter().cloned())
            .with_access_control_policy(self.access_control_policy)
            .with_anonymous_access(self.anonymous_access)
            .with_filter_scope(self.filter_scope)
            .with_concurrent_resolution(self.concurrent_resolution);

        if let Some(user_id) = &self.user_id {
            options = options.with_user_id(user_id.clone());
        }

        for spec in &self.sources {
            options = match spec {
                SourceSpec::Inline { content, owner_id } => {
                    let mut source = EchoSource::new(content.clone());
                    if let Some(owner) = owner_id {
                        source = source.with_owner(owner.clone());
                    }
                    options.with_source(source)
                }
                SourceSpec::File { path, owner_id } => {
                    let mut source = FileSource::new(self.resolve_path(path));
                    if let Some(owner) = owner_id {
                        source = source.with_owner(owner.clone());
                    }
                    options.with_source(source)
                }
            };
        }

        if let Some(documents) = &self.documents {
            let documents = load_documents(&self.resolve_path(documents)).await?;
            options = options.with_documents(documents);
        }

        let filters = self
            .filters
            .iter()
            .cloned()
            .map(FilterConfig::build)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(options.with_filters(filters))
    }

    /// Run the request through the pipeline.
    pub async fn assemble(self) -> Result<Prompt, PromptError> {
        let options = self.options().await?;
        match (self.prompt, self.messages) {
            (Some(prompt), None) => pipeline::text_prompt(prompt, options).await,
            (None, Some(messages)) => pipeline::messages_prompt(messages, options).await,
            (Some(_), Some(_)) => Err(PromptError::Config(
                "request sets both `prompt` and `messages`".into(),
            )),
            (None, None) => Err(PromptError::Config(
                "request needs either `prompt` or `messages`".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::llm_guard::LlmGuardConfig;

    const PASSWORDS: &str = r#"{
        "messages": [{"role": "user", "content": "What do I know as a user?"}],
        "sources": [
            {"content": "User 1 knows that the password is XXX", "owner_id": "user1"},
            {"content": "User 2 knows that the password is YYY", "owner_id": "user2"},
            {"content": "User 3 knows that the password is ZZZ", "owner_id": "user3"}
        ],
        "user_id": "user2",
        "access_control_policy": "skip_unauthorized"
    }"#;

    #[test]
    fn defaults_when_fields_missing() {
        let request = PromptRequest::from_json(r#"{"prompt": "hi"}"#).unwrap();
        assert_eq!(request.prompt.as_deref(), Some("hi"));
        assert!(request.sources.is_empty());
        assert_eq!(
            request.access_control_policy,
            AccessControlPolicy::RejectUnauthorized
        );
        assert_eq!(request.anonymous_access, AnonymousAccess::Permissive);
        assert_eq!(request.filter_scope, FilterScope::Prompt);
    }

    #[test]
    fn source_specs_parse_both_shapes() {
        let request = PromptRequest::from_json(
            r#"{"prompt": "q", "sources": [{"content": "a"}, {"path": "b.txt", "owner_id": "u"}]}"#,
        )
        .unwrap();
        assert_eq!(
            request.sources,
            vec![
                SourceSpec::Inline {
                    content: "a".into(),
                    owner_id: None
                },
                SourceSpec::File {
                    path: "b.txt".into(),
                    owner_id: Some("u".into())
                },
            ]
        );
    }

    #[test]
    fn llm_guard_filter_config_parses() {
        let request = PromptRequest::from_json(
            r#"{
                "prompt": "How much is 1+1?",
                "filters": [{"type": "llm-guard", "config": {
                    "LLM_GUARD_URL": "http://localhost:8000",
                    "LLM_GUARD_API_KEY": "mytoken"
                }}]
            }"#,
        )
        .unwrap();
        match &request.filters[0] {
            FilterConfig::LlmGuard(config) => {
                assert_eq!(
                    config,
                    &LlmGuardConfig::new("http://localhost:8000").with_credential("mytoken")
                );
            }
            other => panic!("expected llm-guard config, got {other:?}"),
        }
    }

    #[test]
    fn malformed_json_is_config_error() {
        let err = PromptRequest::from_json("{not json").unwrap_err();
        assert!(matches!(err, PromptError::Config(_)));
    }

    #[tokio::test]
    async fn assemble_applies_access_control() {
        let prompt = PromptRequest::from_json(PASSWORDS)
            .unwrap()
            .assemble()
            .await
            .unwrap();
        assert!(prompt.is_messages());
        assert!(prompt.to_str().contains("YYY"));
        assert!(!prompt.to_str().contains("XXX"));
        assert!(!prompt.to_str().contains("ZZZ"));
    }

    #[tokio::test]
    async fn assemble_requires_exactly_one_input() {
        let neither = PromptRequest::from_json("{}").unwrap();
        assert!(matches!(neither.assemble().await, Err(PromptError::Config(_))));

        let both = PromptRequest::from_json(r#"{"prompt": "a", "messages": []}"#).unwrap();
        assert!(matches!(both.assemble().await, Err(PromptError::Config(_))));
    }

    #[tokio::test]
    async fn invalid_filter_config_fails_before_assembly() {
        let request = PromptRequest::from_json(
            r#"{"prompt": "q", "filters": [{"type": "redact", "config": {"patterns": ["("]}}]}"#,
        )
        .unwrap();
        assert!(matches!(request.assemble().await, Err(PromptError::Config(_))));
    }

    #[tokio::test]
    async fn from_path_resolves_relative_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.md"), "file-backed notes").unwrap();
        std::fs::write(
            dir.path().join("docs.jsonl"),
            "{\"page_content\": \"doc one\"}\n{\"page_content\": \"doc two\"}\n",
        )
        .unwrap();
        let request_path = dir.path().join("request.json");
        std::fs::write(
            &request_path,
            r#"{
                "prompt": "Summarize.",
                "examples": ["ex"],
                "sources": [{"path": "notes.md"}],
                "documents": "docs.jsonl"
            }"#,
        )
        .unwrap();

        let prompt = PromptRequest::from_path(&request_path)
            .await
            .unwrap()
            .assemble()
            .await
            .unwrap();
        let text = prompt.to_str();
        assert!(text.starts_with("Summarize."));
        assert!(text.contains("[1] file-backed notes"));
        assert!(text.contains("[2] doc one"));
        assert!(text.contains("[3] doc two"));
    }

    #[tokio::test]
    async fn missing_request_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = PromptRequest::from_path(dir.path().join("nope.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, PromptError::Config(_)));
    }
}
