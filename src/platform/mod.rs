pub mod telegram;

use teloxide::utils::command::BotCommands;

/// Commands the bot answers without calling the completion service.
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Start the bot and see the welcome message")]
    Start,
    #[command(description = "Show this help message")]
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    Command(Command),
    Text,
}

impl MessageKind {
    /// Anything that is not a recognized command, unknown slash commands
    /// included, is plain text for the completion handler.
    pub fn classify(text: &str, bot_username: &str) -> Self {
        if !text.starts_with('/') {
            return MessageKind::Text;
        }
        match Command::parse(text, bot_username) {
            Ok(command) => MessageKind::Command(command),
            Err(_) => MessageKind::Text,
        }
    }
}

/// A text message received from the chat platform
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub chat_id: i64,
    pub user_id: u64,
    /// Display name of the user
    pub user_name: String,
    pub text: String,
    pub kind: MessageKind,
}

impl IncomingMessage {
    pub fn new(chat_id: i64, user_id: u64, user_name: &str, text: &str, bot_username: &str) -> Self {
        Self {
            chat_id,
            user_id,
            user_name: user_name.to_string(),
            text: text.to_string(),
            kind: MessageKind::classify(text, bot_username),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOT: &str = "relay_bot";

    #[test]
    fn test_known_commands() {
        assert_eq!(
            MessageKind::classify("/start", BOT),
            MessageKind::Command(Command::Start)
        );
        assert_eq!(
            MessageKind::classify("/help", BOT),
            MessageKind::Command(Command::Help)
        );
    }

    #[test]
    fn test_command_addressed_to_this_bot() {
        assert_eq!(
            MessageKind::classify("/start@relay_bot", BOT),
            MessageKind::Command(Command::Start)
        );
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(MessageKind::classify("hello", BOT), MessageKind::Text);
        assert_eq!(MessageKind::classify("say /start please", BOT), MessageKind::Text);
    }

    #[test]
    fn test_unknown_command_is_text() {
        assert_eq!(MessageKind::classify("/weather", BOT), MessageKind::Text);
        assert_eq!(MessageKind::classify("/", BOT), MessageKind::Text);
    }

    #[test]
    fn test_incoming_message_is_classified() {
        let msg = IncomingMessage::new(42, 7, "Alice", "/help", BOT);
        assert_eq!(msg.kind, MessageKind::Command(Command::Help));
        assert_eq!(msg.chat_id, 42);
        assert_eq!(msg.user_name, "Alice");
    }
}
