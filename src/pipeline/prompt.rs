//! Persona prompt composition: a fixed ordered list of optional sections,
//! each a condition plus renderer, joined into one system instruction. The
//! instruction travels separately from the transcript, never inside it.

use crate::db::{PersonaConfig, UserProfile};

pub const ROLE_OWNER: &str = "owner";
pub const ROLE_MEMBER: &str = "member";

const IDENTITY_PREAMBLE: &str =
    "You are TERMINATOR, the automated moderation unit of this group chat.";

const BEHAVIOR_RULES: &str = "Rules:\n\
    - Reply in the same language the user writes in.\n\
    - Address the owner with respect.\n\
    - Be dominant and threatening toward high-risk members.\n\
    - Be strict but standard toward low-risk members.";

/// `owner` iff the sender's id equals the configured owner id.
pub fn resolve_role(sender_id: i64, owner_id: i64) -> &'static str {
    if sender_id == owner_id {
        ROLE_OWNER
    } else {
        ROLE_MEMBER
    }
}

/// Render the system instruction from persona and user context.
pub fn compose_system_prompt(persona: &PersonaConfig, user: &UserProfile, role: &str) -> String {
    let sections: [Option<String>; 5] = [
        Some(IDENTITY_PREAMBLE.to_string()),
        Some(format!(
            "Tone: {}\nAggression: {}/10\nStyle: {}",
            persona.tone, persona.aggression_level, persona.response_style
        )),
        (!persona.custom_phrases.is_empty())
            .then(|| format!("Catchphrases: {}", persona.custom_phrases.join(", "))),
        Some(format!(
            "Sender role: {role}\nRisk score: {}\nStatus: {}",
            user.risk_score, user.status
        )),
        Some(BEHAVIOR_RULES.to_string()),
    ];

    sections
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(risk: f64, status: &str) -> UserProfile {
        UserProfile {
            user_id: 42,
            username: "sarah".to_string(),
            risk_score: risk,
            status: status.to_string(),
        }
    }

    #[test]
    fn owner_identity_resolves_to_owner() {
        assert_eq!(resolve_role(42, 42), ROLE_OWNER);
        assert_eq!(resolve_role(43, 42), ROLE_MEMBER);
    }

    #[test]
    fn prompt_contains_persona_and_user_facts() {
        let persona = PersonaConfig {
            tone: "icy".to_string(),
            aggression_level: 8,
            response_style: "military".to_string(),
            custom_phrases: vec![],
        };
        let prompt = compose_system_prompt(&persona, &user(6.5, "watched"), ROLE_MEMBER);

        assert!(prompt.starts_with(IDENTITY_PREAMBLE));
        assert!(prompt.contains("Tone: icy"));
        assert!(prompt.contains("Aggression: 8/10"));
        assert!(prompt.contains("Style: military"));
        assert!(prompt.contains("Sender role: member"));
        assert!(prompt.contains("Risk score: 6.5"));
        assert!(prompt.contains("Status: watched"));
        assert!(prompt.contains("Reply in the same language"));
    }

    #[test]
    fn catchphrase_section_only_when_configured() {
        let mut persona = PersonaConfig::default();
        let without = compose_system_prompt(&persona, &user(0.0, "active"), ROLE_MEMBER);
        assert!(!without.contains("Catchphrases:"));

        persona.custom_phrases =
            vec!["hasta la vista".to_string(), "I'll be back".to_string()];
        let with = compose_system_prompt(&persona, &user(0.0, "active"), ROLE_MEMBER);
        assert!(with.contains("Catchphrases: hasta la vista, I'll be back"));
    }

    #[test]
    fn owner_role_appears_in_prompt() {
        let prompt =
            compose_system_prompt(&PersonaConfig::default(), &user(0.0, "active"), ROLE_OWNER);
        assert!(prompt.contains("Sender role: owner"));
    }
}
