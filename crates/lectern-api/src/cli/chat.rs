//! One-shot chat from the terminal.

use std::io::Write;

use anyhow::Result;
use console::style;
use tracing::debug;

use crate::cli::persona::parse_id;
use crate::state::AppState;

/// Send `message` to a persona and print the reply as it streams in.
///
/// With `json` the fragments are collected and printed once as
/// `{"session_key", "reply"}`.
pub async fn chat(
    state: &AppState,
    persona_id: &str,
    message: &str,
    session: Option<&str>,
    json: bool,
) -> Result<()> {
    if message.trim().is_empty() {
        anyhow::bail!("message must not be empty");
    }
    let id = parse_id(persona_id)?;
    let cancel = state.shutdown.child_token();

    let mut bridge = state
        .engine
        .converse_persona(state.persona_service.repo(), &id, session, message, cancel)
        .await?;
    debug!(session_key = %bridge.session_key(), "chat started");

    let mut reply = String::new();
    let mut stdout = std::io::stdout();
    let mut failure = None;
    while let Some(item) = bridge.recv().await {
        match item {
            Ok(fragment) => {
                if !json {
                    print!("{fragment}");
                    stdout.flush()?;
                }
                reply.push_str(&fragment);
            }
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }
    bridge.settle().await;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "session_key": bridge.session_key().to_string(),
                "reply": reply,
            })
        );
    } else {
        println!();
    }

    if let Some(e) = failure {
        eprintln!("  {} {}", style("✗").red().bold(), e);
        return Err(e.into());
    }
    Ok(())
}
