//! Transcript shaping for the stateful chat model.
//!
//! Gemini rejects two consecutive turns of the same role, so stored history
//! is folded into a strictly alternating sequence: a record matching the
//! previous role is merged into it with a blank-line separator.

use crate::db::ConversationTurn;
use crate::llm::{ChatTurn, TurnRole};

/// Separator used when merging consecutive same-role turns.
const MERGE_SEPARATOR: &str = "\n\n";

/// Fold ascending history plus the new inbound text into an alternating
/// transcript. The new text always lands under role `user` — merged into the
/// final entry when that entry is already a user turn.
pub fn build_transcript(history: &[ConversationTurn], new_text: &str) -> Vec<ChatTurn> {
    let mut turns: Vec<ChatTurn> = Vec::with_capacity(history.len() + 1);

    for record in history {
        push_merged(&mut turns, record.role, &record.content);
    }
    push_merged(&mut turns, TurnRole::User, new_text);

    turns
}

fn push_merged(turns: &mut Vec<ChatTurn>, role: TurnRole, text: &str) {
    if let Some(last) = turns.last_mut()
        && last.role == role
    {
        last.text.push_str(MERGE_SEPARATOR);
        last.text.push_str(text);
        return;
    }

    turns.push(ChatTurn {
        role,
        text: text.to_string(),
    });
}
