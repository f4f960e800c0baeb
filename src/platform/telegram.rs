use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, Me};
use teloxide::utils::command::BotCommands;
use tracing::{debug, info, warn};

use crate::dispatch::MessageDispatcher;
use crate::platform::{Command, IncomingMessage, MessageKind};

/// Telegram rejects messages longer than this
const TELEGRAM_MAX_LEN: usize = 4096;

/// Cut `text` to at most `max_len` bytes on a char boundary, so a reply always
/// goes out as a single message.
fn fit_message(text: &str, max_len: usize) -> &str {
    if text.len() <= max_len {
        return text;
    }
    let mut end = max_len;
    // Walk back to a valid UTF-8 char boundary so slicing doesn't panic
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].trim_end()
}

/// Run the Telegram long-polling loop until the process exits
pub async fn run(bot: Bot, dispatcher: Arc<MessageDispatcher>) -> Result<()> {
    info!("Starting Telegram platform...");

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("Failed to register bot commands: {}", e);
    }

    let handler = Update::filter_message().endpoint(handle_message);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![dispatcher])
        .default_handler(|upd| async move {
            debug!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("telegram"))
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_message(
    bot: Bot,
    msg: Message,
    me: Me,
    dispatcher: Arc<MessageDispatcher>,
) -> ResponseResult<()> {
    let text = match msg.text() {
        Some(t) => t,
        None => {
            debug!("Ignoring non-text message in chat {}", msg.chat.id.0);
            return Ok(());
        }
    };

    let (user_id, user_name) = match msg.from.as_ref() {
        Some(user) => (user.id.0, user.first_name.clone()),
        None => (0, String::new()),
    };

    let incoming = IncomingMessage::new(msg.chat.id.0, user_id, &user_name, text, me.username());

    info!(
        "Telegram message from {} ({}) in chat {}: {:?}",
        incoming.user_name, incoming.user_id, incoming.chat_id, incoming.kind
    );

    if incoming.kind == MessageKind::Text {
        // Send "typing" indicator
        bot.send_chat_action(msg.chat.id, ChatAction::Typing)
            .await
            .ok();
    }

    let reply = dispatcher.reply_for(&incoming).await;
    bot.send_message(msg.chat.id, fit_message(&reply, TELEGRAM_MAX_LEN))
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_message_untouched() {
        assert_eq!(fit_message("hello", TELEGRAM_MAX_LEN), "hello");
    }

    #[test]
    fn test_long_message_truncated() {
        let text = "a".repeat(5000);
        assert_eq!(fit_message(&text, TELEGRAM_MAX_LEN).len(), TELEGRAM_MAX_LEN);
    }

    #[test]
    fn test_truncation_respects_char_boundary() {
        // 'é' is two bytes, so byte 5 falls inside a char
        let text = "ééééé";
        assert_eq!(fit_message(text, 5), "éé");
    }

    #[test]
    fn test_truncation_drops_trailing_whitespace() {
        assert_eq!(fit_message("abc   defgh", 6), "abc");
    }
}
