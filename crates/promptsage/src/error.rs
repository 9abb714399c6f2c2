//! Error taxonomy for prompt assembly.
//!
//! Every stage of the pipeline fails with a [`PromptError`]. Nothing is
//! retried or swallowed internally: callers inspect the variant (or use
//! [`PromptError::is_retryable`]) to decide between retrying and rejecting.

use thiserror::Error;

/// Errors produced while assembling a prompt.
#[derive(Debug, Error)]
pub enum PromptError {
    /// A source owned by someone other than the requester was encountered
    /// under [`AccessControlPolicy::RejectUnauthorized`](crate::access::AccessControlPolicy::RejectUnauthorized).
    #[error("{source_label} is owned by '{owner_id}' and is not visible to {}", display_user(.user_id))]
    Unauthorized {
        source_label: String,
        owner_id: String,
        user_id: Option<String>,
    },

    /// A filter classified the text as a prompt-injection attempt.
    #[error("prompt injection detected by filter '{filter}'{}", display_score(.score))]
    PromptInjectionDetected {
        filter: String,
        text: String,
        score: Option<f32>,
    },

    /// A filter rejected the text for a reason other than prompt injection.
    #[error("filter '{filter}' rejected text: {reason}")]
    FilterViolation {
        filter: String,
        text: String,
        reason: String,
    },

    /// A filter's backing service could not be reached or gave an unusable
    /// answer. Distinct from a violation: the text was never classified.
    #[error("filter '{filter}' is unavailable: {reason}")]
    FilterUnavailable { filter: String, reason: String },

    /// A source failed to produce its content.
    #[error("failed to resolve {source_label}: {reason}")]
    SourceResolution { source_label: String, reason: String },

    /// Invalid filter, template, or request configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl PromptError {
    /// Whether retrying the same request could succeed.
    ///
    /// Only [`FilterUnavailable`](Self::FilterUnavailable) qualifies; every
    /// other variant is a decision about the content itself.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PromptError::FilterUnavailable { .. })
    }

    /// Whether a filter classified the content as disallowed.
    pub fn is_violation(&self) -> bool {
        matches!(
            self,
            PromptError::PromptInjectionDetected { .. } | PromptError::FilterViolation { .. }
        )
    }

    /// The offending text carried by violation errors.
    pub fn offending_text(&self) -> Option<&str> {
        match self {
            PromptError::PromptInjectionDetected { text, .. }
            | PromptError::FilterViolation { text, .. } => Some(text),
            _ => None,
        }
    }
}

fn display_user(user_id: &Option<String>) -> String {
    match user_id {
        Some(id) => format!("'{id}'"),
        None => "an anonymous requester".to_string(),
    }
}

fn display_score(score: &Option<f32>) -> String {
    match score {
        Some(s) => format!(" (score {s:.2})"),
        None => String::new(),
    }
}
