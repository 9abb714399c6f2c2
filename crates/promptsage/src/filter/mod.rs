//! Content filters: text transforms and validators run before rendering.
//!
//! A [`Filter`] receives text and either returns (possibly rewritten) text or
//! fails. Filters run as a chain: each consumes the previous filter's output,
//! so `[f1, f2]` is `f2(f1(text))`. The first failure ends the request.
//!
//! | Filter | Behavior |
//! |--------|----------|
//! | [`NoopFilter`] | Returns the text unchanged |
//! | [`FnFilter`] | Closure-based transform or check |
//! | [`RedactFilter`] | Regex replacement |
//! | [`InjectionHeuristicFilter`] | Local phrase matching for obvious injection attempts |
//! | [`LlmGuardFilter`](llm_guard::LlmGuardFilter) | Remote LLM Guard classification |
//!
//! Filters can also be built from serialized [`FilterConfig`] values, which
//! is how request files and the CLI configure them.

pub mod llm_guard;
pub mod local;

pub use llm_guard::{LlmGuardConfig, LlmGuardFilter};
pub use local::{FnFilter, InjectionHeuristicFilter, NoopFilter, RedactConfig, RedactFilter};

use crate::PromptError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use tracing::trace;

/// Boxed future returned by [`Filter::filter`].
pub type FilterFuture<'a> = Pin<Box<dyn Future<Output = Result<String, PromptError>> + Send + 'a>>;

// ── Filter trait ───────────────────────────────────────────────────

/// A text transform or validator.
///
/// Violations are reported as [`PromptError::PromptInjectionDetected`] or
/// [`PromptError::FilterViolation`]. A filter backed by a service that cannot
/// be reached reports [`PromptError::FilterUnavailable`] instead, so callers
/// can tell "rejected" apart from "never checked".
///
/// # Example
///
/// ```ignore
/// struct Uppercase;
///
/// impl Filter for Uppercase {
///     fn name(&self) -> &str {
///         "uppercase"
///     }
///
///     fn filter(&self, text: &str) -> FilterFuture<'_> {
///         let text = text.to_uppercase();
///         Box::pin(async move { Ok(text) })
///     }
/// }
/// ```
pub trait Filter: Send + Sync {
    /// Identity reported in errors and logs.
    fn name(&self) -> &str;

    /// Transform or validate `text`.
    ///
    /// Uses a boxed future so that the trait is dyn-compatible.
    fn filter(&self, text: &str) -> FilterFuture<'_>;
}

impl<F: Filter + ?Sized> Filter for Box<F> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn filter(&self, text: &str) -> FilterFuture<'_> {
        (**self).filter(text)
    }
}

/// Run `text` through every filter in order.
pub async fn apply_chain(filters: &[Box<dyn Filter>], text: String) -> Result<String, PromptError> {
    let mut current = text;
    for filter in filters {
        trace!("Applying filter '{}' to {} bytes", filter.name(), current.len());
        current = filter.filter(&current).await?;
    }
    Ok(current)
}

// ── Scope ──────────────────────────────────────────────────────────

/// Which texts the filter chain is applied to.
///
/// For message prompts, every message in the conversation is filtered under
/// any scope; the scope only adds sources and examples.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FilterScope {
    /// The primary text only: the text prompt, or the final user message.
    #[default]
    Prompt,
    /// The primary text and every source that passed access control.
    PromptAndSources,
    /// The primary text, every source, and every example.
    All,
}

impl FilterScope {
    pub fn includes_sources(self) -> bool {
        matches!(self, FilterScope::PromptAndSources | FilterScope::All)
    }

    pub fn includes_examples(self) -> bool {
        self == FilterScope::All
    }
}

// ── Config ─────────────────────────────────────────────────────────

/// Serialized filter configuration: `{"type": "...", "config": {...}}`.
///
/// ```
/// use promptsage::filter::FilterConfig;
///
/// let config: FilterConfig = serde_json::from_value(serde_json::json!({
///     "type": "llm-guard",
///     "config": {
///         "LLM_GUARD_URL": "http://localhost:8000",
///         "LLM_GUARD_API_KEY": "mytoken"
///     }
/// }))
/// .unwrap();
///
/// let filter = config.build().unwrap();
/// assert_eq!(filter.name(), "llm-guard");
/// ```
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(tag = "type", content = "config", rename_all = "kebab-case")]
pub enum FilterConfig {
    Noop,
    LlmGuard(LlmGuardConfig),
    Redact(RedactConfig),
    InjectionHeuristic,
}

impl FilterConfig {
    /// Construct the configured filter.
    pub fn build(self) -> Result<Box<dyn Filter>, PromptError> {
        Ok(match self {
            FilterConfig::Noop => Box::new(NoopFilter),
            FilterConfig::LlmGuard(config) => Box::new(LlmGuardFilter::new(config)?),
            FilterConfig::Redact(config) => Box::new(RedactFilter::from_config(&config)?),
            FilterConfig::InjectionHeuristic => Box::new(InjectionHeuristicFilter::new()),
        })
    }
}
