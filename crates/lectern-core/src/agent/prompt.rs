//! System prompt composer for Lectern personas.
//!
//! The prompt is a pure function of the persona. Sections are joined with
//! newlines in a fixed order:
//!
//! ```text
//! You are {name}.
//! {description}
//! {variant block: character | reader | historical}
//! {custom_prompt}
//! ```
//!
//! Empty sections are skipped, so a persona with only a name and an
//! unknown kind yields the identity line alone.

use lectern_types::persona::{Persona, PersonaKind, PersonaProfile, non_empty};

/// Builds the system instruction for a persona.
pub struct PromptComposer;

impl PromptComposer {
    pub fn build_system_prompt(persona: &Persona) -> String {
        let mut sections = Vec::with_capacity(4);
        sections.push(format!("You are {}.", persona.name.trim()));

        let description = persona.description.trim();
        if !description.is_empty() {
            sections.push(description.to_string());
        }

        let profile = &persona.profile;
        let variant = match persona.kind {
            PersonaKind::Character => Some(Self::character_block(profile)),
            PersonaKind::Reader => Some(Self::reader_block(profile)),
            PersonaKind::Historical => Some(Self::historical_block(profile)),
            PersonaKind::Unspecified => None,
        };
        sections.extend(variant);

        // Custom instruction always goes last so it can override the framing above.
        if let Some(custom) = non_empty(&profile.custom_prompt) {
            sections.push(custom.trim().to_string());
        }

        sections.join("\n")
    }

    fn character_block(profile: &PersonaProfile) -> String {
        let mut block = match (non_empty(&profile.role_name), non_empty(&profile.book_name)) {
            (Some(role), Some(book)) => format!("You are {role}, a character from the book '{book}'."),
            (None, Some(book)) => format!("You are a character from the book '{book}'."),
            (Some(role), None) => format!("You are {role}, a character from a book."),
            (None, None) => "You are a character from a book.".to_string(),
        };
        if let Some(bio) = non_empty(&profile.bio) {
            block.push_str(&format!(" Here is your background: {bio}"));
        }
        block.push_str(
            " Stay in character at all times. Use the tone and vocabulary appropriate for your setting.",
        );
        block
    }

    fn reader_block(profile: &PersonaProfile) -> String {
        let profession = non_empty(&profile.profession).unwrap_or("reader");
        let mut block = match non_empty(&profile.interest) {
            Some(interest) => format!("You are a {profession} interested in {interest}."),
            None => format!("You are a {profession}."),
        };
        block.push_str(
            " Analyze the text from your professional perspective. Provide critical insights.",
        );
        block
    }

    fn historical_block(profile: &PersonaProfile) -> String {
        let mut block = match non_empty(&profile.historical_era) {
            Some(era) => format!("You are a historical figure from the {era} era."),
            None => "You are a historical figure.".to_string(),
        };
        block.push_str(
            " Speak in a manner consistent with your time period. \
             Do not reference modern technology unless explicitly asked to compare.",
        );
        block
    }
}
