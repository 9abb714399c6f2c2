//! Convenience re-exports for common `promptsage` types.
//!
//! Meant to be glob-imported when assembling prompts:
//!
//! ```ignore
//! use promptsage::prelude::*;
//! ```
//!
//! Covers the entry points, the built-in sources and filters, access-control
//! policies, and templates. The LLM Guard wire types and request documents
//! live in their own modules.

// ── Entry points ────────────────────────────────────────────────────
pub use crate::pipeline::{PromptOptions, messages_prompt, text_prompt};
pub use crate::{Message, Prompt, PromptError};

// ── Sources ─────────────────────────────────────────────────────────
pub use crate::source::{
    Document, EchoSource, ExternalDocuments, FileSource, Source, SourceFuture, load_documents,
};

// ── Access control ──────────────────────────────────────────────────
pub use crate::access::{AccessControlPolicy, AnonymousAccess};

// ── Filters ─────────────────────────────────────────────────────────
pub use crate::filter::llm_guard::{LlmGuardConfig, LlmGuardFilter};
pub use crate::filter::{
    Filter, FilterConfig, FilterFuture, FilterScope, FnFilter, InjectionHeuristicFilter,
    NoopFilter, RedactFilter,
};

// ── Templates ───────────────────────────────────────────────────────
pub use crate::template::{DefaultTemplate, FnTemplate, FormatTemplate, Template};
