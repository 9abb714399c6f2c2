//! Markdown section assembly used by [`DefaultTemplate`](super::DefaultTemplate).
//!
//! [`SectionBuilder`] collects a leading block followed by `## Heading`
//! sections and joins them with blank lines. Empty blocks are dropped, so
//! callers never have to special-case missing content.

/// Builder for multi-section prompt text.
///
/// # Example
///
/// ```
/// use promptsage::template::builder::SectionBuilder;
///
/// let text = SectionBuilder::new("Answer the question.")
///     .section("Examples", "[1] Q: 2+2? A: 4")
///     .section_if(false, "Sources", || "never built".into())
///     .build();
///
/// assert_eq!(text, "Answer the question.\n\n## Examples\n\n[1] Q: 2+2? A: 4");
/// ```
#[derive(Debug, Clone)]
pub struct SectionBuilder {
    blocks: Vec<String>,
    heading_prefix: String,
}

impl SectionBuilder {
    /// Start with a leading block that gets no heading. An empty lead is
    /// omitted.
    pub fn new(lead: impl Into<String>) -> Self {
        let lead = lead.into();
        Self {
            blocks: if lead.is_empty() { Vec::new() } else { vec![lead] },
            heading_prefix: "##".to_string(),
        }
    }

    /// Set the heading level for subsequent `section()` calls.
    ///
    /// Level 2 produces `## Heading`, level 3 produces `### Heading`. Levels
    /// below 1 are raised to 1.
    pub fn heading_level(mut self, level: u8) -> Self {
        self.heading_prefix = "#".repeat(level.max(1) as usize);
        self
    }

    /// Append a headed section. Skipped if `content` is empty.
    pub fn section(mut self, heading: &str, content: impl Into<String>) -> Self {
        let content = content.into();
        if !content.is_empty() {
            self.blocks
                .push(format!("{} {heading}\n\n{content}", self.heading_prefix));
        }
        self
    }

    /// Conditionally append a section.
    ///
    /// `content_fn` is only called when `condition` is true.
    pub fn section_if(
        self,
        condition: bool,
        heading: &str,
        content_fn: impl FnOnce() -> String,
    ) -> Self {
        if condition {
            self.section(heading, content_fn())
        } else {
            self
        }
    }

    /// Join all blocks with blank lines.
    pub fn build(self) -> String {
        self.blocks.join("\n\n")
    }
}
