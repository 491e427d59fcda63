//! Trigger evaluation: decide, with no side effects, whether an inbound
//! message deserves an automated reply.

use crate::telegram::Message;

/// Keyword prefix that engages the bot.
pub const TRIGGER_WORD: &str = "terminator";

/// Rules, in order: private chats are never auto-answered (the greeting path
/// handles them); empty text is ignored; a lowercased `terminator` prefix
/// triggers; a reply aimed at this bot's own numeric id triggers.
pub fn should_respond(message: &Message, bot_id: i64) -> bool {
    if message.is_private() {
        return false;
    }

    let Some(text) = message.text_or_caption() else {
        return false;
    };

    if text.to_lowercase().starts_with(TRIGGER_WORD) {
        return true;
    }

    message
        .reply_to_message
        .as_deref()
        .and_then(|replied| replied.from.as_ref())
        .is_some_and(|sender| sender.id == bot_id)
}
