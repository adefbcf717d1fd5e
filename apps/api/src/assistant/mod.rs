//! Conversational Grounding Layer: follow-up questions about a parsed document.
//!
//! The remote chat model gets the whole history (its first message carries the
//! document). When it fails or times out, a keyword-matched local template answers
//! instead, so `ask` only errors on bad input or a concurrent call.

pub mod handlers;
pub mod intents;
pub mod prompts;
pub mod session;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::assistant::session::ConversationSession;
use crate::errors::AppError;
use crate::extraction::input::ValidationError;
use crate::llm_client::{ChatBackend, ChatMessage};

#[derive(Clone)]
pub struct Assistant {
    backend: Arc<dyn ChatBackend>,
    timeout: Duration,
}

impl Assistant {
    pub fn new(backend: Arc<dyn ChatBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// Appends `message` and the reply to the session and returns the reply.
    /// A second call while one is in flight on the same session is rejected.
    pub async fn ask(
        &self,
        session: &Mutex<ConversationSession>,
        message: &str,
    ) -> Result<String, AppError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AppError::Validation(ValidationError::Empty));
        }

        let mut session = session.try_lock().map_err(|_| {
            AppError::SessionConflict(
                "A reply is still being prepared for this conversation".to_string(),
            )
        })?;

        // The exchange lands in the session only once it has a reply, so a
        // cancelled call leaves the history as it was.
        let mut outbound = session.messages().to_vec();
        outbound.push(ChatMessage::user(message));

        let reply = match tokio::time::timeout(self.timeout, self.backend.complete(&outbound)).await
        {
            Ok(Ok(text)) if !text.trim().is_empty() => {
                debug!("Assistant answered remotely");
                text.trim().to_string()
            }
            Ok(Ok(_)) => {
                warn!("Assistant backend returned an empty reply; answering locally");
                Self::local_reply(&session, message)
            }
            Ok(Err(e)) => {
                warn!("Assistant backend failed: {e}; answering locally");
                Self::local_reply(&session, message)
            }
            Err(_) => {
                warn!(
                    "Assistant backend timed out after {}s; answering locally",
                    self.timeout.as_secs()
                );
                Self::local_reply(&session, message)
            }
        };

        session.push(ChatMessage::user(message));
        session.push(ChatMessage::assistant(reply.clone()));
        Ok(reply)
    }

    fn local_reply(session: &ConversationSession, message: &str) -> String {
        let intent = intents::detect(message);
        debug!("Local assistant intent: {intent:?}");
        intents::local_reply(intent, session.document())
    }
}
