//! Append-only conversation log.

use crate::models::Message;

pub const UPLOAD_SUCCEEDED: &str =
    "File uploaded and processed successfully. You can now ask questions about its content.";
pub const UPLOAD_FAILED: &str = "Sorry, there was an error uploading the file. Please try again.";
pub const INDEX_CREATION_FAILED: &str =
    "Sorry, there was an error creating the index. Please try again.";

/// Ordered log of every message exchanged in a session.
///
/// Messages are only ever pushed; the orchestrator appends in the order the
/// producing operations complete.
#[derive(Debug, Clone, Default)]
pub struct ConversationStore {
    messages: Vec<Message>,
}

impl ConversationStore {
    /// A store that opens with a bot greeting. An empty greeting opens with
    /// nothing.
    pub fn with_greeting(greeting: &str) -> Self {
        let mut store = Self::default();
        if !greeting.is_empty() {
            store.append(Message::bot(greeting));
        }
        store
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
