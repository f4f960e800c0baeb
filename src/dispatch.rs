use teloxide::utils::command::BotCommands;
use tracing::info;

use crate::platform::{Command, IncomingMessage, MessageKind};
use crate::responder::{Responder, ReplyOutcome};

pub const GREETING: &str = "Hello! I'm your AI assistant. Send me any message and I'll do my best to answer.\n\n\
     Type /help to see what I can do.";

pub fn help_text() -> String {
    format!(
        "Just send me a message and I'll reply with an answer from the language model.\n\n{}",
        Command::descriptions()
    )
}

/// Routes each inbound message to exactly one handler and returns the reply text.
pub struct MessageDispatcher {
    responder: Responder,
}

impl MessageDispatcher {
    pub fn new(responder: Responder) -> Self {
        Self { responder }
    }

    /// Never fails; completion errors are already turned into text by the responder.
    pub async fn reply_for(&self, incoming: &IncomingMessage) -> String {
        match &incoming.kind {
            MessageKind::Command(Command::Start) => GREETING.to_string(),
            MessageKind::Command(Command::Help) => help_text(),
            MessageKind::Text => {
                let reply = self.responder.reply(&incoming.text).await;
                if reply.outcome != ReplyOutcome::Completed {
                    info!(
                        "Sending fallback reply to chat {} ({:?})",
                        incoming.chat_id, reply.outcome
                    );
                }
                reply.text
            }
        }
    }
}
