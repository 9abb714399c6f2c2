//! The assembled prompt.

use crate::Message;
use std::fmt;

/// Result of a successful assembly. Immutable.
///
/// A prompt built by [`text_prompt`](crate::text_prompt) holds the rendered
/// string. One built by [`messages_prompt`](crate::messages_prompt) also keeps
/// the message list, with the rendered content placed in the final user turn;
/// its string view lists every message as `role: content`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    text: String,
    messages: Option<Vec<Message>>,
}

impl Prompt {
    pub(crate) fn from_text(text: String) -> Self {
        Self {
            text,
            messages: None,
        }
    }

    pub(crate) fn from_messages(messages: Vec<Message>) -> Self {
        let text = messages
            .iter()
            .map(Message::to_string)
            .collect::<Vec<_>>()
            .join("\n\n");
        Self {
            text,
            messages: Some(messages),
        }
    }

    /// The human-readable prompt string.
    pub fn to_str(&self) -> &str {
        &self.text
    }

    /// The structured messages, for prompts built from messages.
    pub fn messages(&self) -> Option<&[Message]> {
        self.messages.as_deref()
    }

    pub fn is_messages(&self) -> bool {
        self.messages.is_some()
    }

    /// Messages ready to send; a text prompt becomes a single user message.
    pub fn into_messages(self) -> Vec<Message> {
        match self.messages {
            Some(messages) => messages,
            None => vec![Message::user(self.text)],
        }
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl AsRef<str> for Prompt {
    fn as_ref(&self) -> &str {
        &self.text
    }
}
