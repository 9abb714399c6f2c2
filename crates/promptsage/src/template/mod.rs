//! Rendering the final prompt text.
//!
//! A [`Template`] combines the primary text (the user prompt, or the final
//! user message's content), the few-shot examples, and the resolved sources
//! into one string. The pipeline never formats text itself, so swapping the
//! template changes the output format without touching anything else.

pub mod builder;

pub use builder::SectionBuilder;

use crate::{EXAMPLES_HEADING, SOURCES_HEADING};

/// Renders primary text, examples, and sources into a prompt string.
pub trait Template: Send + Sync {
    fn render(&self, primary: &str, examples: &[String], sources: &[String]) -> String;
}

impl<T: Template + ?Sized> Template for Box<T> {
    fn render(&self, primary: &str, examples: &[String], sources: &[String]) -> String {
        (**self).render(primary, examples, sources)
    }
}

/// Number entries as `[1] first`, `[2] second`, one blank line apart.
pub fn numbered(items: &[String]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("[{}] {item}", i + 1))
        .collect::<Vec<_>>()
        .join("\n\n")
}

// ── DefaultTemplate ────────────────────────────────────────────────

/// The primary text, then `## Examples` and `## Sources` sections.
///
/// Each section is present iff its list is non-empty; entries are numbered
/// in input order.
///
/// ```
/// use promptsage::template::{DefaultTemplate, Template};
///
/// let text = DefaultTemplate::new().render("prompt", &["ex".into()], &[]);
/// assert_eq!(text, "prompt\n\n## Examples\n\n[1] ex");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct DefaultTemplate {
    heading_level: u8,
}

impl DefaultTemplate {
    pub fn new() -> Self {
        Self { heading_level: 2 }
    }

    /// Set the markdown heading level for the section markers.
    pub fn with_heading_level(mut self, level: u8) -> Self {
        self.heading_level = level;
        self
    }
}

impl Default for DefaultTemplate {
    fn default() -> Self {
        Self::new()
    }
}

impl Template for DefaultTemplate {
    fn render(&self, primary: &str, examples: &[String], sources: &[String]) -> String {
        SectionBuilder::new(primary)
            .heading_level(self.heading_level)
            .section_if(!examples.is_empty(), EXAMPLES_HEADING, || numbered(examples))
            .section_if(!sources.is_empty(), SOURCES_HEADING, || numbered(sources))
            .build()
    }
}

// ── FormatTemplate ─────────────────────────────────────────────────

/// A template string with `{{prompt}}`, `{{examples}}`, and `{{sources}}`
/// placeholders.
///
/// Lists are substituted in [`numbered`] form. Unknown placeholders are
/// removed. Substitution is a single pass, so placeholder syntax inside the
/// substituted text is left alone.
///
/// ```
/// use promptsage::template::{FormatTemplate, Template};
///
/// let t = FormatTemplate::new("Context:\n{{sources}}\n\nQuestion: {{prompt}}{{unused}}");
/// let text = t.render("Why?", &[], &["Because.".into()]);
/// assert_eq!(text, "Context:\n[1] Because.\n\nQuestion: Why?");
/// ```
#[derive(Debug, Clone)]
pub struct FormatTemplate {
    template: String,
}

impl FormatTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }
}

impl Template for FormatTemplate {
    fn render(&self, primary: &str, examples: &[String], sources: &[String]) -> String {
        let mut out = String::with_capacity(self.template.len() + primary.len());
        let mut rest = self.template.as_str();

        while let Some((before, after)) = rest.split_once("{{") {
            out.push_str(before);
            let Some((key, tail)) = after.split_once("}}") else {
                // Unterminated placeholder: keep the text verbatim.
                out.push_str("{{");
                rest = after;
                break;
            };
            match key.trim() {
                "prompt" => out.push_str(primary),
                "examples" => out.push_str(&numbered(examples)),
                "sources" => out.push_str(&numbered(sources)),
                _ => {}
            }
            rest = tail;
        }
        out.push_str(rest);
        out
    }
}

// ── FnTemplate ─────────────────────────────────────────────────────

type RenderFn = Box<dyn Fn(&str, &[String], &[String]) -> String + Send + Sync>;

/// A template backed by a closure.
pub struct FnTemplate {
    func: RenderFn,
}

impl FnTemplate {
    pub fn new(
        func: impl Fn(&str, &[String], &[String]) -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            func: Box::new(func),
        }
    }
}

impl std::fmt::Debug for FnTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnTemplate").finish_non_exhaustive()
    }
}

impl Template for FnTemplate {
    fn render(&self, primary: &str, examples: &[String], sources: &[String]) -> String {
        (self.func)(primary, examples, sources)
    }
}
