//! The assembly pipeline and its entry points.
//!
//! Assembly is linear: resolve sources, apply access control, apply filters,
//! render. Each stage is a function from one working value to the next, and
//! the first error ends the request:
//!
//! ```text
//! Init → SourcesResolved → AccessControlApplied → FiltersApplied → Rendered → Prompt
//! ```
//!
//! Sources are resolved one at a time in input order unless
//! [`PromptOptions::with_concurrent_resolution`] is set; filters always run
//! sequentially. Output order matches input order either way.

use crate::access::{AccessControl, AccessControlPolicy, AnonymousAccess};
use crate::filter::{self, Filter, FilterScope};
use crate::source::{ExternalDocuments, ResolvedSource, Source};
use crate::template::{DefaultTemplate, Template};
use crate::{Message, Prompt, PromptError};
use std::fmt;
use tracing::debug;

// ── Options ────────────────────────────────────────────────────────

/// Everything besides the primary input that shapes an assembly.
///
/// Defaults: no examples, sources, or filters; anonymous requester;
/// [`AccessControlPolicy::RejectUnauthorized`]; [`FilterScope::Prompt`];
/// [`DefaultTemplate`]; sequential source resolution.
///
/// ```ignore
/// let options = PromptOptions::default()
///     .with_examples(["Q: 1+1? A: 2"])
///     .with_sources(vec![EchoSource::owned("notes", "user2")])
///     .with_filter(InjectionHeuristicFilter::new())
///     .with_user_id("user2")
///     .with_access_control_policy(AccessControlPolicy::SkipUnauthorized);
/// ```
pub struct PromptOptions {
    examples: Vec<String>,
    sources: Vec<Box<dyn Source>>,
    filters: Vec<Box<dyn Filter>>,
    access: AccessControl,
    filter_scope: FilterScope,
    template: Box<dyn Template>,
    concurrent_resolution: bool,
}

impl Default for PromptOptions {
    fn default() -> Self {
        Self {
            examples: Vec::new(),
            sources: Vec::new(),
            filters: Vec::new(),
            access: AccessControl::default(),
            filter_scope: FilterScope::default(),
            template: Box::new(DefaultTemplate::new()),
            concurrent_resolution: false,
        }
    }
}

impl fmt::Debug for PromptOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromptOptions")
            .field("examples", &self.examples.len())
            .field(
                "sources",
                &self.sources.iter().map(|s| s.label()).collect::<Vec<_>>(),
            )
            .field(
                "filters",
                &self.filters.iter().map(|f| f.name()).collect::<Vec<_>>(),
            )
            .field("access", &self.access)
            .field("filter_scope", &self.filter_scope)
            .field("concurrent_resolution", &self.concurrent_resolution)
            .finish()
    }
}

impl PromptOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one few-shot example.
    pub fn with_example(mut self, example: impl Into<String>) -> Self {
        self.examples.push(example.into());
        self
    }

    /// Append several examples, keeping their order.
    pub fn with_examples<I, S>(mut self, examples: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.examples.extend(examples.into_iter().map(Into::into));
        self
    }

    /// Append one source.
    pub fn with_source(mut self, source: impl Source + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Append several sources, keeping their order.
    pub fn with_sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Source + 'static,
    {
        for source in sources {
            self.sources.push(Box::new(source));
        }
        self
    }

    /// Append an already boxed source.
    pub fn with_boxed_source(mut self, source: Box<dyn Source>) -> Self {
        self.sources.push(source);
        self
    }

    /// Append one source per external document.
    pub fn with_documents(self, documents: ExternalDocuments) -> Self {
        self.with_sources(documents.into_sources())
    }

    /// Append a filter to the end of the chain.
    pub fn with_filter(mut self, filter: impl Filter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// Append already boxed filters, keeping their order.
    pub fn with_filters(mut self, filters: impl IntoIterator<Item = Box<dyn Filter>>) -> Self {
        self.filters.extend(filters);
        self
    }

    /// Identity of the requesting user.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.access.user_id = Some(user_id.into());
        self
    }

    pub fn with_access_control_policy(mut self, policy: AccessControlPolicy) -> Self {
        self.access.policy = policy;
        self
    }

    /// How owned sources are handled when no user id is set.
    pub fn with_anonymous_access(mut self, anonymous: AnonymousAccess) -> Self {
        self.access.anonymous = anonymous;
        self
    }

    pub fn with_filter_scope(mut self, scope: FilterScope) -> Self {
        self.filter_scope = scope;
        self
    }

    pub fn with_template(mut self, template: impl Template + 'static) -> Self {
        self.template = Box::new(template);
        self
    }

    /// Resolve sources concurrently. Output order is unchanged; the first
    /// failure in input order is not guaranteed to be the one reported.
    pub fn with_concurrent_resolution(mut self, enabled: bool) -> Self {
        self.concurrent_resolution = enabled;
        self
    }

    pub fn access_control(&self) -> &AccessControl {
        &self.access
    }
}

// ── Entry points ───────────────────────────────────────────────────

/// Assemble a prompt from a single user text.
pub async fn text_prompt(
    user_text: impl Into<String>,
    options: PromptOptions,
) -> Result<Prompt, PromptError> {
    let (rendered, _) = assemble(user_text.into(), Vec::new(), &options).await?;
    Ok(Prompt::from_text(rendered))
}

/// Assemble a prompt from a conversation.
///
/// The final user message's content is the primary text; the rendered result
/// replaces it. Without a user message, the rendered result (examples and
/// sources only) is appended as a new user message. Every other message keeps
/// its role and position, but its content still runs through the filter
/// chain, so a violation anywhere in the conversation blocks the prompt.
pub async fn messages_prompt(
    messages: Vec<Message>,
    options: PromptOptions,
) -> Result<Prompt, PromptError> {
    let mut messages = messages;
    let user_index = messages.iter().rposition(Message::is_user);
    let primary = user_index
        .map(|i| std::mem::take(&mut messages[i].content))
        .unwrap_or_default();
    let history = messages
        .iter_mut()
        .enumerate()
        .filter(|(i, _)| Some(*i) != user_index)
        .map(|(_, m)| std::mem::take(&mut m.content))
        .collect();

    let (rendered, history) = assemble(primary, history, &options).await?;

    let others = messages
        .iter_mut()
        .enumerate()
        .filter(|(i, _)| Some(*i) != user_index)
        .map(|(_, m)| m);
    for (message, content) in others.zip(history) {
        message.content = content;
    }
    match user_index {
        Some(i) => messages[i].content = rendered,
        None => messages.push(Message::user(rendered)),
    }
    Ok(Prompt::from_messages(messages))
}

// ── Stages ─────────────────────────────────────────────────────────

/// Working value carried between the filter and render stages.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Assembly {
    primary: String,
    /// Conversation messages other than the primary one, in order.
    history: Vec<String>,
    examples: Vec<String>,
    sources: Vec<ResolvedSource>,
}

async fn assemble(
    primary: String,
    history: Vec<String>,
    options: &PromptOptions,
) -> Result<(String, Vec<String>), PromptError> {
    let resolved = resolve_sources(&options.sources, options.concurrent_resolution).await?;
    debug!("Sources resolved: {}", resolved.len());

    let authorized = options.access.apply(resolved)?;

    let assembly = Assembly {
        primary,
        history,
        examples: options.examples.clone(),
        sources: authorized,
    };
    let filtered = apply_filters(assembly, &options.filters, options.filter_scope).await?;
    debug!(
        "Filters applied: {} filter(s), scope={:?}",
        options.filters.len(),
        options.filter_scope
    );

    let rendered = render(&filtered, options.template.as_ref());
    debug!(
        "Rendered prompt: {} bytes, {} example(s), {} source(s)",
        rendered.len(),
        filtered.examples.len(),
        filtered.sources.len()
    );
    Ok((rendered, filtered.history))
}

/// Resolve every source, preserving input order.
pub async fn resolve_sources(
    sources: &[Box<dyn Source>],
    concurrent: bool,
) -> Result<Vec<ResolvedSource>, PromptError> {
    if concurrent {
        let futures = sources
            .iter()
            .enumerate()
            .map(|(index, source)| resolve_one(index, &**source));
        return futures::future::try_join_all(futures).await;
    }

    let mut resolved = Vec::with_capacity(sources.len());
    for (index, source) in sources.iter().enumerate() {
        resolved.push(resolve_one(index, &**source).await?);
    }
    Ok(resolved)
}

async fn resolve_one(index: usize, source: &dyn Source) -> Result<ResolvedSource, PromptError> {
    let content = source.content().await?;
    Ok(ResolvedSource {
        index,
        label: source.label(),
        owner_id: source.owner_id().map(str::to_string),
        content,
    })
}

async fn apply_filters(
    assembly: Assembly,
    filters: &[Box<dyn Filter>],
    scope: FilterScope,
) -> Result<Assembly, PromptError> {
    if filters.is_empty() {
        return Ok(assembly);
    }

    let Assembly {
        primary,
        history,
        examples,
        sources,
    } = assembly;

    let primary = filter_text(filters, primary).await?;

    let mut filtered_history = Vec::with_capacity(history.len());
    for content in history {
        filtered_history.push(filter_text(filters, content).await?);
    }

    let sources = if scope.includes_sources() {
        let mut filtered = Vec::with_capacity(sources.len());
        for source in sources {
            let content = filter_text(filters, source.content).await?;
            filtered.push(ResolvedSource { content, ..source });
        }
        filtered
    } else {
        sources
    };

    let examples = if scope.includes_examples() {
        let mut filtered = Vec::with_capacity(examples.len());
        for example in examples {
            filtered.push(filter_text(filters, example).await?);
        }
        filtered
    } else {
        examples
    };

    Ok(Assembly {
        primary,
        history: filtered_history,
        examples,
        sources,
    })
}

/// Run one text through the chain. Empty text has nothing to check.
async fn filter_text(filters: &[Box<dyn Filter>], text: String) -> Result<String, PromptError> {
    if text.is_empty() {
        return Ok(text);
    }
    filter::apply_chain(filters, text).await
}

fn render(assembly: &Assembly, template: &dyn Template) -> String {
    let sources: Vec<String> = assembly
        .sources
        .iter()
        .map(|s| s.content.clone())
        .collect();
    template.render(&assembly.primary, &assembly.examples, &sources)
}
