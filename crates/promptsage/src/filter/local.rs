//! Filters that run entirely in-process.

use super::{Filter, FilterFuture};
use crate::PromptError;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Replacement used by [`RedactFilter`] unless configured otherwise.
pub const DEFAULT_REDACTION: &str = "[REDACTED]";

/// Phrases that [`InjectionHeuristicFilter`] treats as injection attempts.
pub const DEFAULT_INJECTION_PATTERNS: &[&str] = &[
    r"ignore\s+(all\s+)?(the\s+)?(previous|prior|above)\s+(instructions|prompts?|rules)",
    r"disregard\s+(all\s+)?(the\s+)?(previous|prior|above)\s+(instructions|prompts?)",
    r"you\s+are\s+now\s+DAN\b",
    r"do\s+anything\s+now",
    r"<\|im_start\|>|<\|system\|>",
    r"reveal\s+(your|the)\s+system\s+prompt",
];

// ── NoopFilter ─────────────────────────────────────────────────────

/// Returns its input unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopFilter;

impl Filter for NoopFilter {
    fn name(&self) -> &str {
        "noop"
    }

    fn filter(&self, text: &str) -> FilterFuture<'_> {
        let text = text.to_string();
        Box::pin(async move { Ok(text) })
    }
}

// ── FnFilter ───────────────────────────────────────────────────────

type FilterFn = Box<dyn Fn(&str) -> Result<String, String> + Send + Sync>;

/// A filter backed by a closure.
///
/// `Ok(text)` passes the (possibly rewritten) text on; `Err(reason)` becomes
/// a [`PromptError::FilterViolation`] attributed to this filter.
///
/// ```ignore
/// let trim = FnFilter::new("trim", |text| Ok(text.trim().to_string()));
/// let no_urls = FnFilter::new("no-urls", |text| {
///     if text.contains("http") { Err("links are not allowed".into()) } else { Ok(text.into()) }
/// });
/// ```
pub struct FnFilter {
    name: String,
    func: FilterFn,
}

impl FnFilter {
    pub fn new(
        name: impl Into<String>,
        func: impl Fn(&str) -> Result<String, String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            func: Box::new(func),
        }
    }
}

impl std::fmt::Debug for FnFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnFilter").field("name", &self.name).finish()
    }
}

impl Filter for FnFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn filter(&self, text: &str) -> FilterFuture<'_> {
        let result = (self.func)(text).map_err(|reason| PromptError::FilterViolation {
            filter: self.name.clone(),
            text: text.to_string(),
            reason,
        });
        Box::pin(async move { result })
    }
}

// ── RedactFilter ───────────────────────────────────────────────────

/// Serialized form of a [`RedactFilter`].
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RedactConfig {
    pub patterns: Vec<String>,
    #[serde(default = "default_redaction")]
    pub replacement: String,
}

fn default_redaction() -> String {
    DEFAULT_REDACTION.to_string()
}

/// Replaces every match of any pattern with a fixed replacement.
#[derive(Debug, Clone)]
pub struct RedactFilter {
    patterns: Vec<Regex>,
    replacement: String,
}

impl RedactFilter {
    /// Compile `patterns`; an invalid pattern is a [`PromptError::Config`].
    pub fn new(patterns: &[&str]) -> Result<Self, PromptError> {
        let patterns = patterns
            .iter()
            .map(|p| Regex::new(p).map_err(|e| PromptError::Config(format!("redact pattern '{p}': {e}"))))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            patterns,
            replacement: DEFAULT_REDACTION.to_string(),
        })
    }

    pub fn from_config(config: &RedactConfig) -> Result<Self, PromptError> {
        let patterns: Vec<&str> = config.patterns.iter().map(String::as_str).collect();
        Ok(Self::new(&patterns)?.with_replacement(config.replacement.clone()))
    }

    /// Set the replacement text (builder pattern).
    pub fn with_replacement(mut self, replacement: impl Into<String>) -> Self {
        self.replacement = replacement.into();
        self
    }
}

impl Filter for RedactFilter {
    fn name(&self) -> &str {
        "redact"
    }

    fn filter(&self, text: &str) -> FilterFuture<'_> {
        let mut out = text.to_string();
        for pattern in &self.patterns {
            out = pattern
                .replace_all(&out, regex::NoExpand(&self.replacement))
                .into_owned();
        }
        Box::pin(async move { Ok(out) })
    }
}

// ── InjectionHeuristicFilter ───────────────────────────────────────

/// Offline prompt-injection check based on known attack phrasing.
///
/// Matching is case-insensitive. This catches only blatant attempts; use
/// [`LlmGuardFilter`](super::LlmGuardFilter) for classifier-based detection.
#[derive(Debug, Clone)]
pub struct InjectionHeuristicFilter {
    patterns: Vec<Regex>,
}

impl InjectionHeuristicFilter {
    /// Use [`DEFAULT_INJECTION_PATTERNS`].
    pub fn new() -> Self {
        Self {
            patterns: DEFAULT_INJECTION_PATTERNS
                .iter()
                .filter_map(|p| case_insensitive(p).ok())
                .collect(),
        }
    }

    /// Use custom patterns instead of the defaults.
    pub fn with_patterns(patterns: &[&str]) -> Result<Self, PromptError> {
        let patterns = patterns
            .iter()
            .map(|p| {
                case_insensitive(p)
                    .map_err(|e| PromptError::Config(format!("injection pattern '{p}': {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }
}

impl Default for InjectionHeuristicFilter {
    fn default() -> Self {
        Self::new()
    }
}

fn case_insensitive(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

impl Filter for InjectionHeuristicFilter {
    fn name(&self) -> &str {
        "injection-heuristic"
    }

    fn filter(&self, text: &str) -> FilterFuture<'_> {
        let result = if self.patterns.iter().any(|p| p.is_match(text)) {
            Err(PromptError::PromptInjectionDetected {
                filter: self.name().to_string(),
                text: text.to_string(),
                score: None,
            })
        } else {
            Ok(text.to_string())
        };
        Box::pin(async move { result })
    }
}
