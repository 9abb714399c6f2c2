//! Assemble a prompt from the command line and print it.
//!
//! # Examples
//!
//! ```sh
//! # Prompt with inline sources and examples
//! promptsage --prompt "What is the refund window?" \
//!   --example "Q: Shipping time? A: 3-5 business days." \
//!   --source "Refunds are accepted within 30 days."
//!
//! # Owned sources: only user2's content survives
//! promptsage --prompt "What do I know?" --user-id user2 --skip-unauthorized \
//!   --source-file user1=notes/user1.md --source-file user2=notes/user2.md
//!
//! # Screen the prompt with LLM Guard (token from LLM_GUARD_API_KEY)
//! cat question.txt | promptsage --stdin --llm-guard-url http://localhost:8000
//!
//! # Run a JSON request document and emit messages as JSON
//! promptsage --request request.json --json
//! ```

use clap::Parser;
use promptsage::access::AccessControlPolicy;
use promptsage::config::PromptRequest;
use promptsage::filter::llm_guard::{LLM_GUARD_API_KEY_ENV, LlmGuardConfig, LlmGuardFilter};
use promptsage::source::{EchoSource, FileSource, load_documents};
use promptsage::{Prompt, PromptError, PromptOptions, text_prompt};
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Assemble a prompt from a user text, examples, and sources.
///
/// Sources owned by other users are rejected (or skipped with
/// --skip-unauthorized) when --user-id is given.
#[derive(Parser)]
#[command(name = "promptsage", version)]
struct Cli {
    // ── Input ──────────────────────────────────────────────────
    /// JSON request document; other input flags are ignored when set
    #[arg(long, conflicts_with_all = ["prompt", "stdin"])]
    request: Option<PathBuf>,

    /// User prompt text
    #[arg(long)]
    prompt: Option<String>,

    /// Read the user prompt from stdin (appended after --prompt)
    #[arg(long)]
    stdin: bool,

    // ── Context ────────────────────────────────────────────────
    /// Few-shot example (repeatable)
    #[arg(long = "example")]
    examples: Vec<String>,

    /// Inline source text, optionally `owner=text` (repeatable)
    #[arg(long = "source")]
    sources: Vec<String>,

    /// Source file path, optionally `owner=path` (repeatable)
    #[arg(long = "source-file")]
    source_files: Vec<String>,

    /// JSON array or JSONL file of documents
    #[arg(long)]
    documents: Option<PathBuf>,

    // ── Access control ─────────────────────────────────────────
    /// Identity of the requesting user
    #[arg(long)]
    user_id: Option<String>,

    /// Drop unauthorized sources instead of failing
    #[arg(long)]
    skip_unauthorized: bool,

    // ── Filters ────────────────────────────────────────────────
    /// LLM Guard server URL; enables prompt-injection screening
    #[arg(long)]
    llm_guard_url: Option<String>,

    // ── Output ─────────────────────────────────────────────────
    /// Print the prompt as a JSON message list
    #[arg(long)]
    json: bool,

    /// Log pipeline stages to stderr
    #[arg(short, long)]
    verbose: bool,
}

// ── Helpers ────────────────────────────────────────────────────────

/// Split `owner=value` into its parts. A value without `=` is unowned.
///
/// Only a prefix without whitespace counts as an owner, so plain text
/// containing `=` is left alone.
fn split_owner(spec: &str) -> (Option<&str>, &str) {
    match spec.split_once('=') {
        Some((owner, value)) if !owner.is_empty() && !owner.contains(char::is_whitespace) => {
            (Some(owner), value)
        }
        _ => (None, spec),
    }
}

fn read_stdin_content() -> Result<String, PromptError> {
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .map_err(|e| PromptError::Config(format!("failed to read stdin: {e}")))?;
    Ok(buf)
}

fn build_user_text(cli: &Cli) -> Result<String, PromptError> {
    let stdin_text = if cli.stdin {
        Some(read_stdin_content()?)
    } else {
        None
    };

    match (&cli.prompt, stdin_text) {
        (Some(text), Some(piped)) => Ok(format!("{text}\n\n{piped}")),
        (Some(text), None) => Ok(text.clone()),
        (None, Some(piped)) => Ok(piped),
        (None, None) => Err(PromptError::Config(
            "provide --request, --prompt, --stdin, or both of the last two".into(),
        )),
    }
}

async fn build_options(cli: &Cli) -> Result<PromptOptions, PromptError> {
    let policy = if cli.skip_unauthorized {
        AccessControlPolicy::SkipUnauthorized
    } else {
        AccessControlPolicy::RejectUnauthorized
    };
    let mut options = PromptOptions::default()
        .with_examples(cli.examples.iter().cloned())
        .with_access_control_policy(policy);

    if let Some(user_id) = &cli.user_id {
        options = options.with_user_id(user_id.clone());
    }

    for spec in &cli.sources {
        let (owner, text) = split_owner(spec);
        let mut source = EchoSource::new(text);
        if let Some(owner) = owner {
            source = source.with_owner(owner);
        }
        options = options.with_source(source);
    }

    for spec in &cli.source_files {
        let (owner, path) = split_owner(spec);
        let mut source = FileSource::new(path);
        if let Some(owner) = owner {
            source = source.with_owner(owner);
        }
        options = options.with_source(source);
    }

    if let Some(path) = &cli.documents {
        options = options.with_documents(load_documents(path).await?);
    }

    if let Some(url) = &cli.llm_guard_url {
        let mut config = LlmGuardConfig::new(url.clone());
        if let Ok(token) = std::env::var(LLM_GUARD_API_KEY_ENV) {
            config = config.with_credential(token);
        }
        options = options.with_filter(LlmGuardFilter::new(config)?);
    }

    Ok(options)
}

async fn run(cli: &Cli) -> Result<Prompt, PromptError> {
    if let Some(path) = &cli.request {
        return PromptRequest::from_path(path).await?.assemble().await;
    }
    let user_text = build_user_text(cli)?;
    let options = build_options(cli).await?;
    text_prompt(user_text, options).await
}

fn render_output(prompt: Prompt, json: bool) -> Result<String, PromptError> {
    if json {
        serde_json::to_string_pretty(&prompt.into_messages())
            .map_err(|e| PromptError::Config(format!("failed to encode messages: {e}")))
    } else {
        Ok(prompt.into_string())
    }
}

// ── Main ───────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let result = match run(&cli).await {
        Ok(prompt) => render_output(prompt, cli.json),
        Err(e) => Err(e),
    };

    match result {
        Ok(output) => println!("{output}"),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_prefix_is_split() {
        assert_eq!(split_owner("user1=secret"), (Some("user1"), "secret"));
        assert_eq!(split_owner("notes/a.md"), (None, "notes/a.md"));
    }

    #[test]
    fn text_with_spaces_before_equals_is_unowned() {
        assert_eq!(split_owner("1 + 1 = 2"), (None, "1 + 1 = 2"));
        assert_eq!(split_owner("=x"), (None, "=x"));
    }

    #[test]
    fn cli_parses_repeated_flags() {
        let cli = Cli::parse_from([
            "promptsage",
            "--prompt",
            "q",
            "--example",
            "e1",
            "--example",
            "e2",
            "--source",
            "user1=a",
            "--user-id",
            "user1",
            "--skip-unauthorized",
            "-v",
        ]);
        assert_eq!(cli.examples, vec!["e1", "e2"]);
        assert_eq!(cli.sources, vec!["user1=a"]);
        assert!(cli.skip_unauthorized);
        assert!(cli.verbose);
    }

    #[test]
    fn request_conflicts_with_prompt() {
        let parsed = Cli::try_parse_from(["promptsage", "--request", "r.json", "--prompt", "q"]);
        assert!(parsed.is_err());
    }

    #[tokio::test]
    async fn run_assembles_text_prompt() {
        let cli = Cli::parse_from([
            "promptsage",
            "--prompt",
            "What do I know?",
            "--source",
            "user1=XXX",
            "--source",
            "user2=YYY",
            "--user-id",
            "user2",
            "--skip-unauthorized",
        ]);
        let prompt = run(&cli).await.unwrap();
        assert!(prompt.to_str().contains("YYY"));
        assert!(!prompt.to_str().contains("XXX"));
    }

    #[tokio::test]
    async fn run_without_input_fails() {
        let cli = Cli::parse_from(["promptsage"]);
        assert!(matches!(run(&cli).await, Err(PromptError::Config(_))));
    }

    #[tokio::test]
    async fn json_output_is_message_list() {
        let prompt = text_prompt("hi", PromptOptions::default()).await.unwrap();
        let out = render_output(prompt, true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value[0]["role"], "user");
        assert_eq!(value[0]["content"], "hi");
    }
}
