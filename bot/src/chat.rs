//! Outbound chat interface
//!
//! The narrow surface the core uses to talk back to the user. Message
//! formatting, keyboards and platform plumbing live behind this trait; the
//! state machine only knows about text, choice prompts and a "working on
//! it" status signal. Chat failures are logged by callers, never fatal.

use async_trait::async_trait;
use thiserror::Error;

use crate::event::UserId;

/// Identity of a message the bot sent, used as an edit breadcrumb
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId(pub i64);

/// One pressable choice attached to a prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    /// Text shown on the button
    pub label: String,
    /// Opaque payload delivered back as a `Callback` event
    pub data: String,
}

impl Choice {
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
        }
    }
}

/// Errors from the chat platform
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Chat API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response from chat platform: {0}")]
    InvalidResponse(String),
}

/// Outbound messages to one chat user
#[async_trait]
pub trait ChatPort: Send + Sync {
    /// Send plain text; the returned id can serve as an edit breadcrumb
    async fn send_text(&self, user: UserId, text: &str) -> Result<MessageId, ChatError>;

    /// Send text with attached choice buttons
    async fn send_choices(&self, user: UserId, text: &str, choices: &[Choice]) -> Result<MessageId, ChatError>;

    /// Signal that the bot is busy on a long operation (typing indicator)
    async fn send_status(&self, user: UserId) -> Result<(), ChatError>;
}

#[cfg(test)]
pub mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicI64, Ordering};

    use super::*;

    /// Chat sink that drops everything
    pub struct NullChat;

    #[async_trait]
    impl ChatPort for NullChat {
        async fn send_text(&self, _user: UserId, _text: &str) -> Result<MessageId, ChatError> {
            Ok(MessageId(0))
        }

        async fn send_choices(&self, _user: UserId, _text: &str, _choices: &[Choice]) -> Result<MessageId, ChatError> {
            Ok(MessageId(0))
        }

        async fn send_status(&self, _user: UserId) -> Result<(), ChatError> {
            Ok(())
        }
    }

    /// Chat sink that records every outbound message
    #[derive(Default)]
    pub struct RecordingChat {
        next_id: AtomicI64,
        texts: Mutex<Vec<String>>,
        keyboards: Mutex<Vec<(String, Vec<Choice>)>>,
    }

    impl RecordingChat {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn texts(&self) -> Vec<String> {
            self.texts.lock().unwrap().clone()
        }

        pub fn keyboards(&self) -> Vec<(String, Vec<Choice>)> {
            self.keyboards.lock().unwrap().clone()
        }

        fn next(&self) -> MessageId {
            MessageId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
        }
    }

    #[async_trait]
    impl ChatPort for RecordingChat {
        async fn send_text(&self, _user: UserId, text: &str) -> Result<MessageId, ChatError> {
            self.texts.lock().unwrap().push(text.to_string());
            Ok(self.next())
        }

        async fn send_choices(&self, _user: UserId, text: &str, choices: &[Choice]) -> Result<MessageId, ChatError> {
            self.keyboards.lock().unwrap().push((text.to_string(), choices.to_vec()));
            Ok(self.next())
        }

        async fn send_status(&self, _user: UserId) -> Result<(), ChatError> {
            Ok(())
        }
    }
}
