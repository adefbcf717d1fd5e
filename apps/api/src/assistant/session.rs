use crate::assistant::prompts::ASSISTANT_SYSTEM;
use crate::llm_client::ChatMessage;
use crate::models::profile::ParsedDocument;

/// Message history for one parsed document. Starts with a system message that
/// embeds the document; after that it only grows.
#[derive(Debug, Clone)]
pub struct ConversationSession {
    document: ParsedDocument,
    messages: Vec<ChatMessage>,
}

impl ConversationSession {
    pub fn new(document: ParsedDocument) -> Self {
        let embedded = serde_json::to_string_pretty(&document).unwrap_or_default();
        let system = ASSISTANT_SYSTEM
            .replace("{kind}", document.kind().as_str())
            .replace("{document}", &embedded);
        Self {
            document,
            messages: vec![ChatMessage::system(system)],
        }
    }

    pub fn document(&self) -> &ParsedDocument {
        &self.document
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub(crate) fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }
}
