//! Prompt assembly for LLM calls from messages, few-shot examples, and
//! retrieved sources, with per-source access control and content filters.
//!
//! `promptsage` builds the prompt string (or message list) that you hand to a
//! model. It does not call the model. Assembly runs as a fixed, linear
//! pipeline:
//!
//! 1. **Resolve sources.** Every [`Source`](source::Source) yields its content
//!    and an optional owner.
//! 2. **Apply access control.** Sources owned by someone other than the
//!    requesting `user_id` either abort the request or are silently skipped,
//!    depending on the [`AccessControlPolicy`](access::AccessControlPolicy).
//! 3. **Apply filters.** The primary text (and optionally sources and examples)
//!    runs through each [`Filter`](filter::Filter) in order. A filter may
//!    rewrite the text or reject it, e.g. on prompt injection.
//! 4. **Render.** A [`Template`](template::Template) combines the primary
//!    text, examples, and sources into the final prompt.
//!
//! Any stage failing ends the request with a [`PromptError`]; no partial
//! prompt is ever returned.
//!
//! # Getting started
//!
//! ```
//! use promptsage::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), PromptError> {
//! let prompt = text_prompt(
//!     "What is the refund window?",
//!     PromptOptions::default()
//!         .with_example("Q: Shipping time? A: 3-5 business days.")
//!         .with_source(EchoSource::new("Refunds are accepted within 30 days."))
//!         .with_filter(NoopFilter),
//! )
//! .await?;
//!
//! let text = prompt.to_str();
//! assert!(text.contains("What is the refund window?"));
//! assert!(text.contains("## Examples"));
//! assert!(text.contains("## Sources"));
//! # Ok(())
//! # }
//! ```
//!
//! # Where to find things
//!
//! - **Entry points:** [`text_prompt`](pipeline::text_prompt) and
//!   [`messages_prompt`](pipeline::messages_prompt), configured through
//!   [`PromptOptions`](pipeline::PromptOptions).
//! - **Reference content:** [`source`] for [`EchoSource`](source::EchoSource),
//!   [`FileSource`](source::FileSource), and the
//!   [`ExternalDocuments`](source::documents::ExternalDocuments) adapter.
//! - **Who may see what:** [`access`].
//! - **Content checks:** [`filter`], including the remote
//!   [`LlmGuardFilter`](filter::llm_guard::LlmGuardFilter).
//! - **Output format:** [`template`].
//! - **JSON request files:** [`config`].
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`pipeline`] | Entry points, [`PromptOptions`](pipeline::PromptOptions), stage functions |
//! | [`prompt`] | The assembled [`Prompt`](prompt::Prompt) and its string/message views |
//! | [`source`] | [`Source`](source::Source) trait, static, file, and document sources |
//! | [`access`] | [`AccessControlPolicy`](access::AccessControlPolicy), [`AccessControl`](access::AccessControl) |
//! | [`filter`] | [`Filter`](filter::Filter) trait, local filters, LLM Guard, [`FilterConfig`](filter::FilterConfig) |
//! | [`template`] | [`Template`](template::Template) trait, default/format/closure templates |
//! | [`config`] | [`PromptRequest`](config::PromptRequest) JSON request documents |
//! | [`error`] | [`PromptError`] |

pub mod access;
pub mod config;
pub mod error;
pub mod filter;
pub mod pipeline;
pub mod prelude;
pub mod prompt;
pub mod source;
pub mod template;

use serde::{Deserialize, Serialize};

pub use error::PromptError;
pub use pipeline::{PromptOptions, messages_prompt, text_prompt};
pub use prompt::Prompt;

// ── Constants ──────────────────────────────────────────────────────

/// Role name of the message that receives rendered content.
pub const USER_ROLE: &str = "user";

/// Literal marker heading the few-shot examples section.
pub const EXAMPLES_HEADING: &str = "Examples";

/// Literal marker heading the sources section.
pub const SOURCES_HEADING: &str = "Sources";

// ── Message types ──────────────────────────────────────────────────

/// A message in the conversation.
///
/// The role is free-form (`"system"`, `"user"`, `"assistant"`, or anything a
/// downstream API accepts); only `"user"` has meaning to the pipeline.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(USER_ROLE, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }

    /// Whether this message is a user turn.
    pub fn is_user(&self) -> bool {
        self.role == USER_ROLE
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.role, self.content)
    }
}
