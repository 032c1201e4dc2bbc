//! Persona CLI commands: create, list, show, delete.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use lectern_types::persona::{Persona, PersonaConfig, PersonaDraft, PersonaId, PersonaKind, PersonaProfile};

use crate::state::AppState;

/// Fields collected from `lectern persona create`.
pub struct CreateArgs {
    pub name: String,
    pub kind: String,
    pub description: String,
    pub search: bool,
    pub model: Option<String>,
    pub profile: PersonaProfile,
}

pub async fn create_persona(state: &AppState, args: CreateArgs, json: bool) -> Result<()> {
    let kind = args.kind.parse::<PersonaKind>().map_err(|e| anyhow::anyhow!(e))?;
    let draft = PersonaDraft {
        name: args.name,
        kind,
        description: args.description,
        config: PersonaConfig {
            enable_search: args.search,
            model: args.model,
            ..Default::default()
        },
        profile: args.profile,
    };
    let persona = state.persona_service.create(draft).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&persona)?);
        return Ok(());
    }

    println!();
    println!("  {} Persona created!", style("✓").green().bold());
    println!();
    println!("  {}  {}", style("Name:").bold(), style(&persona.name).cyan());
    println!("  {}  {}", style("Kind:").bold(), persona.kind);
    println!("  {}    {}", style("ID:").bold(), style(persona.id.to_string()).dim());
    println!();
    println!(
        "  Chat with it: {}",
        style(format!("lectern chat {} \"Hello\"", persona.id)).yellow()
    );
    println!();
    Ok(())
}

pub async fn list_personas(state: &AppState, kind: Option<String>, json: bool) -> Result<()> {
    let kind = kind
        .map(|k| k.parse::<PersonaKind>())
        .transpose()
        .map_err(|e| anyhow::anyhow!(e))?;
    let personas = state.persona_service.list(kind).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&personas)?);
        return Ok(());
    }

    if personas.is_empty() {
        println!();
        println!(
            "  {} No personas found. Create one with: {}",
            style("i").blue().bold(),
            style("lectern persona create --name <NAME>").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Name").fg(Color::White),
        Cell::new("Kind").fg(Color::White),
        Cell::new("Search").fg(Color::White),
        Cell::new("ID").fg(Color::White),
    ]);

    for persona in &personas {
        let search = if persona.config.enable_search {
            Cell::new("on").fg(Color::Green)
        } else {
            Cell::new("off").fg(Color::DarkGrey)
        };
        table.add_row(vec![
            Cell::new(&persona.name).fg(Color::Cyan),
            Cell::new(persona.kind.to_string()),
            search,
            Cell::new(persona.id.to_string()).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} persona{}",
        style(personas.len()).bold(),
        if personas.len() == 1 { "" } else { "s" }
    );
    println!();
    Ok(())
}

pub async fn show_persona(state: &AppState, id: &str, json: bool) -> Result<()> {
    let persona = state.persona_service.get(&parse_id(id)?).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&persona)?);
        return Ok(());
    }

    println!();
    println!("  {}", style(&persona.name).cyan().bold());
    if !persona.description.is_empty() {
        println!("  {}", style(&persona.description).dim());
    }
    println!();
    println!("  {}", style("── Details ──").dim());
    println!("  {}     {}", style("Kind:").bold(), persona.kind);
    println!(
        "  {}   {}",
        style("Search:").bold(),
        if persona.config.enable_search { "on" } else { "off" }
    );
    if let Some(model) = &persona.config.model {
        println!("  {}    {}", style("Model:").bold(), model);
    }
    for (label, value) in profile_lines(&persona) {
        println!("  {:<9} {}", style(format!("{label}:")).bold(), value);
    }
    println!();
    println!(
        "  {}  {}",
        style("Created:").bold(),
        persona.created_at.format("%Y-%m-%d %H:%M UTC")
    );
    println!("  {}       {}", style("ID:").bold(), style(persona.id.to_string()).dim());
    println!();
    Ok(())
}

pub async fn delete_persona(state: &AppState, id: &str, json: bool) -> Result<()> {
    let id = parse_id(id)?;
    let persona = state.persona_service.get(&id).await?;
    state.persona_service.delete(&id).await?;

    if json {
        println!("{}", serde_json::json!({"deleted": true, "id": id.to_string()}));
    } else {
        println!("  {} Persona '{}' deleted.", style("✓").red().bold(), persona.name);
    }
    Ok(())
}

pub(crate) fn parse_id(raw: &str) -> Result<PersonaId> {
    raw.parse::<PersonaId>()
        .map_err(|_| anyhow::anyhow!("'{raw}' is not a persona ID"))
}

fn profile_lines(persona: &Persona) -> Vec<(&'static str, &str)> {
    let p = &persona.profile;
    [
        ("Book", &p.book_name),
        ("Role", &p.role_name),
        ("Profession", &p.profession),
        ("Interest", &p.interest),
        ("Era", &p.historical_era),
        ("Language", &p.language),
        ("Bio", &p.bio),
        ("Prompt", &p.custom_prompt),
    ]
    .into_iter()
    .filter_map(|(label, value)| {
        value
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .map(|v| (label, v))
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_lines_skip_blank() {
        let now = chrono::Utc::now();
        let persona = Persona {
            id: PersonaId::new(),
            name: "Elizabeth".to_string(),
            kind: PersonaKind::Character,
            description: String::new(),
            config: PersonaConfig::default(),
            profile: PersonaProfile {
                book_name: Some("Pride and Prejudice".to_string()),
                role_name: Some("  ".to_string()),
                ..Default::default()
            },
            created_at: now,
            updated_at: now,
        };
        assert_eq!(profile_lines(&persona), vec![("Book", "Pride and Prejudice")]);
    }

    #[test]
    fn test_parse_id_rejects_garbage() {
        assert!(parse_id("nope").is_err());
        assert!(parse_id("0190f5a0-0000-7000-8000-000000000000").is_ok());
    }
}
