//! Reference content for prompts.
//!
//! A [`Source`] is a unit of reference content with optional ownership
//! metadata. The pipeline resolves every source to a [`ResolvedSource`]
//! before access control runs.
//!
//! | Source | Content |
//! |--------|---------|
//! | [`EchoSource`] | A static string |
//! | [`FileSource`] | A UTF-8 file read at resolution time |
//! | [`DocumentSource`](documents::DocumentSource) | One record from an [`ExternalDocuments`](documents::ExternalDocuments) set |

pub mod documents;

pub use documents::{Document, DocumentSource, ExternalDocuments, load_documents};

use crate::PromptError;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

/// Boxed future returned by [`Source::content`].
pub type SourceFuture<'a> = Pin<Box<dyn Future<Output = Result<String, PromptError>> + Send + 'a>>;

// ── Source trait ───────────────────────────────────────────────────

/// A unit of reference content with an optional owner.
///
/// Implementors provide the content (possibly by reading a file or calling a
/// store) and, when the content belongs to a specific user, that user's
/// identity. Content must be deterministic for a given instance. Failures
/// are reported as [`PromptError::SourceResolution`], never swallowed.
///
/// # Example
///
/// ```ignore
/// struct KvSource { key: String, store: Arc<Store> }
///
/// impl Source for KvSource {
///     fn content(&self) -> SourceFuture<'_> {
///         Box::pin(async move {
///             self.store.get(&self.key).await.map_err(|e| PromptError::SourceResolution {
///                 source_label: self.label(),
///                 reason: e.to_string(),
///             })
///         })
///     }
///
///     fn label(&self) -> String {
///         format!("kv {}", self.key)
///     }
/// }
/// ```
pub trait Source: Send + Sync {
    /// Resolve the source's text.
    ///
    /// Uses a boxed future so that the trait is dyn-compatible.
    fn content(&self) -> SourceFuture<'_>;

    /// The identity owning this content. `None` means visible to everyone.
    fn owner_id(&self) -> Option<&str> {
        None
    }

    /// Short human-readable description, used in error messages.
    fn label(&self) -> String {
        "source".to_string()
    }
}

impl<S: Source + ?Sized> Source for Box<S> {
    fn content(&self) -> SourceFuture<'_> {
        (**self).content()
    }

    fn owner_id(&self) -> Option<&str> {
        (**self).owner_id()
    }

    fn label(&self) -> String {
        (**self).label()
    }
}

// ── Resolved sources ───────────────────────────────────────────────

/// A source after resolution: its text plus the metadata access control
/// needs. `index` is the source's position in the caller's input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    pub index: usize,
    pub label: String,
    pub owner_id: Option<String>,
    pub content: String,
}

impl ResolvedSource {
    /// Label including the input position, e.g. `source #2 (file notes.md)`.
    pub fn display_label(&self) -> String {
        format!("source #{} ({})", self.index, self.label)
    }
}

// ── EchoSource ─────────────────────────────────────────────────────

/// A source wrapping a static string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoSource {
    text: String,
    owner_id: Option<String>,
}

impl EchoSource {
    /// Create an unowned source, visible to everyone.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            owner_id: None,
        }
    }

    /// Create a source owned by `owner_id`.
    pub fn owned(text: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self::new(text).with_owner(owner_id)
    }

    /// Set the owner (builder pattern).
    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    /// The wrapped text.
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl From<&str> for EchoSource {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for EchoSource {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl Source for EchoSource {
    fn content(&self) -> SourceFuture<'_> {
        let text = self.text.clone();
        Box::pin(async move { Ok(text) })
    }

    fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }

    fn label(&self) -> String {
        "echo".to_string()
    }
}

// ── FileSource ─────────────────────────────────────────────────────

/// A source backed by a UTF-8 text file, read each time it is resolved.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    owner_id: Option<String>,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            owner_id: None,
        }
    }

    /// Set the owner (builder pattern).
    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Source for FileSource {
    fn content(&self) -> SourceFuture<'_> {
        Box::pin(async move {
            tokio::fs::read_to_string(&self.path)
                .await
                .map_err(|e| PromptError::SourceResolution {
                    source_label: self.label(),
                    reason: e.to_string(),
                })
        })
    }

    fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }

    fn label(&self) -> String {
        format!("file {}", self.path.display())
    }
}
